use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use clipstack_config::keybindings::{Key, KeyBinding, KeyTable, Modifiers, PopupAction};

/// Maps terminal key events to popup actions through the configured table.
pub struct InputHandler {
    key_table: KeyTable,
}

impl InputHandler {
    pub fn new(key_table: KeyTable) -> Self {
        InputHandler { key_table }
    }

    pub fn handle_key(&self, event: KeyEvent) -> Option<PopupAction> {
        let binding = crossterm_to_binding(event)?;
        self.key_table.lookup(&binding)
    }
}

/// Convert a crossterm KeyEvent to our KeyBinding type. Shift is folded into
/// the character itself.
fn crossterm_to_binding(event: KeyEvent) -> Option<KeyBinding> {
    let modifiers = Modifiers {
        ctrl: event.modifiers.contains(KeyModifiers::CONTROL),
        alt: event.modifiers.contains(KeyModifiers::ALT),
    };

    let key = match event.code {
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::F(n) => Key::F(n),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Escape,
        KeyCode::Backspace => Key::Backspace,
        KeyCode::Tab => Key::Tab,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Home => Key::Home,
        KeyCode::End => Key::End,
        KeyCode::PageUp => Key::PageUp,
        KeyCode::PageDown => Key::PageDown,
        KeyCode::Delete => Key::Delete,
        _ => return None,
    };

    Some(KeyBinding { key, modifiers })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handler() -> InputHandler {
        InputHandler::new(KeyTable::default_popup_bindings())
    }

    #[test]
    fn test_shifted_char_maps_to_uppercase_binding() {
        let event = KeyEvent::new(KeyCode::Char('C'), KeyModifiers::SHIFT);
        assert_eq!(handler().handle_key(event), Some(PopupAction::ClearAll));
    }

    #[test]
    fn test_ctrl_binding() {
        let event = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL);
        assert_eq!(handler().handle_key(event), Some(PopupAction::Down));
    }

    #[test]
    fn test_unbound_key() {
        let event = KeyEvent::new(KeyCode::Char('z'), KeyModifiers::NONE);
        assert_eq!(handler().handle_key(event), None);
    }
}
