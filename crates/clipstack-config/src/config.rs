use crate::keybindings::KeyTable;
use crate::options::Options;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Top-level configuration.
pub struct Config {
    pub options: Options,
    pub key_table: KeyTable,
    /// Files currently being sourced, outermost first.
    sourcing: Vec<PathBuf>,
}

impl Config {
    /// Create a default configuration.
    pub fn default_config() -> Self {
        Config {
            options: Options::default(),
            key_table: KeyTable::default_popup_bindings(),
            sourcing: Vec::new(),
        }
    }

    /// Load configuration from the config file (`~/.clipstack.conf`, or
    /// `CLIPSTACK_CONFIG`). A missing file yields the defaults.
    pub fn load() -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(path) = Self::config_path() {
            if path.exists() {
                debug!("Loading config from: {}", path.display());
                config.apply_config_file(&path)?;
            } else {
                debug!("No config file found at: {}", path.display());
            }
        }

        Ok(config)
    }

    /// Get the config file path.
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("CLIPSTACK_CONFIG") {
            return Some(PathBuf::from(path));
        }
        dirs::home_dir().map(|home| home.join(".clipstack.conf"))
    }

    /// Apply a config file. A file that is already being sourced further up
    /// is refused, so `source` cycles end at the repeated file.
    pub fn apply_config_file(&mut self, path: &Path) -> Result<()> {
        let key = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        if self.sourcing.contains(&key) {
            anyhow::bail!("Recursive source of {}", path.display());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        self.sourcing.push(key);
        let result = self.apply_config_string(&content);
        self.sourcing.pop();
        result
    }

    /// Apply configuration from a string. Bad lines are logged and skipped.
    pub fn apply_config_string(&mut self, content: &str) -> Result<()> {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Err(e) = self.apply_config_line(line) {
                warn!("Config error: {} (line: {})", e, line);
            }
        }
        Ok(())
    }

    fn apply_config_line(&mut self, line: &str) -> Result<()> {
        let (command, args) = match line.split_once(' ') {
            Some((c, a)) => (c, a),
            None => anyhow::bail!("Missing arguments"),
        };

        match command {
            "set-option" | "set" => {
                crate::parser::parse_set_option(&mut self.options, args)?;
            }
            "bind-key" | "bind" => {
                crate::parser::parse_bind_key(&mut self.key_table, args)?;
            }
            "unbind-key" | "unbind" => {
                crate::parser::parse_unbind_key(&mut self.key_table, args)?;
            }
            "source-file" | "source" => {
                let path = PathBuf::from(args.trim());
                self.apply_config_file(&path)?;
            }
            _ => {
                warn!("Unknown config command: {}", command);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keybindings::{Key, KeyBinding, Modifiers, PopupAction};

    #[test]
    fn test_config_string_applies_options_and_bindings() {
        let mut config = Config::default_config();
        config
            .apply_config_string(
                "# comment\n\
                 set -g max-history 5\n\
                 set refresh-interval 250\n\
                 bind x clear-all\n\
                 unbind q\n\
                 set bogus 1\n\
                 frobnicate\n",
            )
            .unwrap();

        assert_eq!(config.options.max_history, 5);
        assert_eq!(config.options.refresh_interval, 250);
        let x = KeyBinding {
            key: Key::Char('x'),
            modifiers: Modifiers::default(),
        };
        assert_eq!(config.key_table.lookup(&x), Some(PopupAction::ClearAll));
        let q = KeyBinding {
            key: Key::Char('q'),
            modifiers: Modifiers::default(),
        };
        assert_eq!(config.key_table.lookup(&q), None);
    }

    #[test]
    fn test_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let extra = dir.path().join("extra.conf");
        std::fs::write(&extra, "set truncate-length 30\n").unwrap();

        let mut config = Config::default_config();
        config
            .apply_config_string(&format!("source {}\n", extra.display()))
            .unwrap();
        assert_eq!(config.options.truncate_length, 30);
    }

    #[test]
    fn test_source_cycle_stops() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.conf");
        let second = dir.path().join("second.conf");
        std::fs::write(
            &first,
            format!("set truncate-length 30\nsource {}\n", first.display()),
        )
        .unwrap();
        std::fs::write(
            &second,
            format!("source {}\nset max-history 7\n", first.display()),
        )
        .unwrap();

        let mut config = Config::default_config();
        config.apply_config_file(&first).unwrap();
        assert_eq!(config.options.truncate_length, 30);

        // A cycle through another file, and the stack unwinds afterwards.
        config
            .apply_config_string(&format!("source {}\n", second.display()))
            .unwrap();
        assert_eq!(config.options.max_history, 7);
        assert!(config.sourcing.is_empty());
        config.apply_config_file(&first).unwrap();
    }
}
