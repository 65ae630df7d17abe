use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// A key combination that can trigger a binding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyBinding {
    pub key: Key,
    pub modifiers: Modifiers,
}

/// Key identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Key {
    Char(char),
    F(u8),
    Enter,
    Escape,
    Backspace,
    Tab,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Delete,
    Space,
}

/// Key modifiers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
}

/// Something the popup can do in response to a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PopupAction {
    /// Copy the highlighted entry, close, paste.
    Select,
    /// Copy the entry at a 1-based position, close, paste.
    Pick(usize),
    Up,
    Down,
    Top,
    Bottom,
    /// Remove the highlighted entry.
    Delete,
    /// Remove every entry and close.
    ClearAll,
    Close,
}

impl FromStr for PopupAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let action = match parts.next().unwrap_or("") {
            "select" => PopupAction::Select,
            "pick" => {
                let n: usize = parts
                    .next()
                    .ok_or_else(|| "pick needs a position".to_string())?
                    .parse()
                    .map_err(|e| format!("{}", e))?;
                if n == 0 {
                    return Err("pick positions start at 1".to_string());
                }
                PopupAction::Pick(n)
            }
            "up" => PopupAction::Up,
            "down" => PopupAction::Down,
            "top" => PopupAction::Top,
            "bottom" => PopupAction::Bottom,
            "delete" => PopupAction::Delete,
            "clear-all" => PopupAction::ClearAll,
            "close" => PopupAction::Close,
            other => return Err(format!("Unknown popup action: {}", other)),
        };
        Ok(action)
    }
}

/// A table of key bindings mapping keys to popup actions.
pub struct KeyTable {
    pub bindings: HashMap<KeyBinding, PopupAction>,
}

impl KeyTable {
    pub fn new() -> Self {
        KeyTable {
            bindings: HashMap::new(),
        }
    }

    /// Create the default popup key bindings.
    pub fn default_popup_bindings() -> Self {
        let mut table = KeyTable::new();
        let none = Modifiers::default();
        let ctrl = Modifiers {
            ctrl: true,
            ..Default::default()
        };

        table.bind(Key::Enter, none, PopupAction::Select);
        table.bind(Key::Space, none, PopupAction::Select);

        table.bind(Key::Up, none, PopupAction::Up);
        table.bind(Key::Char('k'), none, PopupAction::Up);
        table.bind(Key::Char('p'), ctrl, PopupAction::Up);
        table.bind(Key::Down, none, PopupAction::Down);
        table.bind(Key::Tab, none, PopupAction::Down);
        table.bind(Key::Char('j'), none, PopupAction::Down);
        table.bind(Key::Char('n'), ctrl, PopupAction::Down);
        table.bind(Key::Home, none, PopupAction::Top);
        table.bind(Key::Char('g'), none, PopupAction::Top);
        table.bind(Key::End, none, PopupAction::Bottom);
        table.bind(Key::Char('G'), none, PopupAction::Bottom);

        table.bind(Key::Delete, none, PopupAction::Delete);
        table.bind(Key::Char('d'), none, PopupAction::Delete);
        table.bind(Key::Char('C'), none, PopupAction::ClearAll);

        table.bind(Key::Escape, none, PopupAction::Close);
        table.bind(Key::Char('q'), none, PopupAction::Close);
        table.bind(Key::Char('c'), ctrl, PopupAction::Close);

        // Quick pick by position
        for i in 1..=9 {
            if let Some(ch) = std::char::from_digit(i, 10) {
                table.bind(Key::Char(ch), none, PopupAction::Pick(i as usize));
            }
        }

        table
    }

    /// Add a binding.
    pub fn bind(&mut self, key: Key, modifiers: Modifiers, action: PopupAction) {
        self.bindings.insert(KeyBinding { key, modifiers }, action);
    }

    /// Remove a binding.
    pub fn unbind(&mut self, key: Key, modifiers: Modifiers) {
        self.bindings.remove(&KeyBinding { key, modifiers });
    }

    /// Look up the action for a key binding.
    pub fn lookup(&self, binding: &KeyBinding) -> Option<PopupAction> {
        self.bindings.get(binding).copied()
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::default_popup_bindings()
    }
}

/// Parse a key string like "C-n", "M-a", "Up", "F1" into a KeyBinding.
pub fn parse_key(s: &str) -> Option<KeyBinding> {
    let mut modifiers = Modifiers::default();
    let mut remaining = s;

    // Parse modifiers
    loop {
        if let Some(rest) = remaining.strip_prefix("C-") {
            modifiers.ctrl = true;
            remaining = rest;
        } else if let Some(rest) = remaining.strip_prefix("M-") {
            modifiers.alt = true;
            remaining = rest;
        } else {
            break;
        }
    }

    let key = match remaining {
        "Enter" | "enter" => Key::Enter,
        "Escape" | "escape" | "Esc" | "esc" => Key::Escape,
        "Space" | "space" => Key::Space,
        "Backspace" | "BSpace" | "bspace" => Key::Backspace,
        "Tab" | "tab" => Key::Tab,
        "Up" | "up" => Key::Up,
        "Down" | "down" => Key::Down,
        "Home" | "home" => Key::Home,
        "End" | "end" => Key::End,
        "PageUp" | "PgUp" | "pgup" => Key::PageUp,
        "PageDown" | "PgDn" | "pgdn" => Key::PageDown,
        "Delete" | "delete" | "DC" | "dc" => Key::Delete,
        s if s.len() > 1 && (s.starts_with('F') || s.starts_with('f')) => {
            s[1..].parse::<u8>().ok().map(Key::F)?
        }
        s => {
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Key::Char(ch),
                _ => return None,
            }
        }
    };

    Some(KeyBinding { key, modifiers })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_with_modifiers() {
        let b = parse_key("C-n").unwrap();
        assert_eq!(b.key, Key::Char('n'));
        assert!(b.modifiers.ctrl);
        assert!(!b.modifiers.alt);

        assert_eq!(parse_key("F5").unwrap().key, Key::F(5));
        assert_eq!(parse_key("f").unwrap().key, Key::Char('f'));
        assert_eq!(parse_key("Esc").unwrap().key, Key::Escape);
        assert!(parse_key("NotAKey").is_none());
    }

    #[test]
    fn test_parse_action() {
        assert_eq!("clear-all".parse::<PopupAction>(), Ok(PopupAction::ClearAll));
        assert_eq!("pick 3".parse::<PopupAction>(), Ok(PopupAction::Pick(3)));
        assert!("pick 0".parse::<PopupAction>().is_err());
        assert!("explode".parse::<PopupAction>().is_err());
    }

    #[test]
    fn test_default_bindings() {
        let table = KeyTable::default_popup_bindings();
        let esc = KeyBinding {
            key: Key::Escape,
            modifiers: Modifiers::default(),
        };
        assert_eq!(table.lookup(&esc), Some(PopupAction::Close));
        let two = KeyBinding {
            key: Key::Char('2'),
            modifiers: Modifiers::default(),
        };
        assert_eq!(table.lookup(&two), Some(PopupAction::Pick(2)));
    }
}
