use std::path::PathBuf;
use std::time::Duration;

/// Tunables shared by the server and the popup.
#[derive(Debug, Clone)]
pub struct Options {
    // History
    pub max_history: usize,
    pub data_dir: PathBuf,

    // Polling (milliseconds)
    pub poll_interval: u64,
    pub refresh_interval: u64,
    pub backoff_interval: u64,

    // Popup
    pub truncate_length: usize,
    pub auto_paste: bool,
    pub paste_delay: u64,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_history: 20,
            data_dir: default_data_dir(),

            poll_interval: 500,
            refresh_interval: 1000,
            backoff_interval: 2000,

            truncate_length: 65,
            auto_paste: true,
            paste_delay: 50,
        }
    }
}

impl Options {
    /// Set an option by name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), String> {
        match name {
            "max-history" => {
                let max: usize = value.parse().map_err(|e| format!("{}", e))?;
                if max == 0 {
                    return Err("max-history must be at least 1".to_string());
                }
                self.max_history = max;
            }
            "data-dir" => self.data_dir = expand_home(&unquote(value)),
            "poll-interval" => self.poll_interval = parse_millis(value)?,
            "refresh-interval" => self.refresh_interval = parse_millis(value)?,
            "backoff-interval" => self.backoff_interval = parse_millis(value)?,
            "truncate-length" => {
                let n: usize = value.parse().map_err(|e| format!("{}", e))?;
                if n < 4 {
                    return Err("truncate-length must be at least 4".to_string());
                }
                self.truncate_length = n;
            }
            "auto-paste" => self.auto_paste = parse_bool(value)?,
            "paste-delay" => self.paste_delay = value.parse().map_err(|e| format!("{}", e))?,
            _ => return Err(format!("Unknown option: {}", name)),
        }
        Ok(())
    }

    /// Get an option value by name (as string).
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "max-history" => Some(self.max_history.to_string()),
            "data-dir" => Some(self.data_dir.display().to_string()),
            "poll-interval" => Some(self.poll_interval.to_string()),
            "refresh-interval" => Some(self.refresh_interval.to_string()),
            "backoff-interval" => Some(self.backoff_interval.to_string()),
            "truncate-length" => Some(self.truncate_length.to_string()),
            "auto-paste" => Some(if self.auto_paste { "on" } else { "off" }.to_string()),
            "paste-delay" => Some(self.paste_delay.to_string()),
            _ => None,
        }
    }

    /// The persisted history file.
    pub fn history_file(&self) -> PathBuf {
        self.data_dir.join("history.json")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval)
    }

    pub fn backoff_interval(&self) -> Duration {
        Duration::from_millis(self.backoff_interval)
    }

    pub fn paste_delay(&self) -> Duration {
        Duration::from_millis(self.paste_delay)
    }
}

fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CLIPSTACK_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir)
        .join("clipstack")
}

fn parse_millis(s: &str) -> Result<u64, String> {
    let ms: u64 = s.trim().parse().map_err(|e| format!("{}", e))?;
    if ms == 0 {
        return Err("interval must be positive".to_string());
    }
    Ok(ms)
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        _ => Err(format!("Invalid boolean value: {}", s)),
    }
}

fn unquote(s: &str) -> String {
    let s = s.trim();
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        s[1..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

fn expand_home(s: &str) -> PathBuf {
    match s.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|h| h.join(rest))
            .unwrap_or_else(|| PathBuf::from(s)),
        None => PathBuf::from(s),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_polling_model() {
        let opts = Options::default();
        assert_eq!(opts.max_history, 20);
        assert_eq!(opts.poll_interval(), Duration::from_millis(500));
        assert_eq!(opts.refresh_interval(), Duration::from_millis(1000));
        assert!(opts.history_file().ends_with("history.json"));
    }

    #[test]
    fn test_set_and_get() {
        let mut opts = Options::default();
        opts.set("max-history", "50").unwrap();
        opts.set("auto-paste", "off").unwrap();
        opts.set("data-dir", "\"/var/tmp/clips\"").unwrap();
        assert_eq!(opts.get("max-history").as_deref(), Some("50"));
        assert_eq!(opts.get("auto-paste").as_deref(), Some("off"));
        assert_eq!(opts.history_file(), PathBuf::from("/var/tmp/clips/history.json"));
    }

    #[test]
    fn test_rejects_invalid_values() {
        let mut opts = Options::default();
        assert!(opts.set("max-history", "0").is_err());
        assert!(opts.set("poll-interval", "0").is_err());
        assert!(opts.set("poll-interval", "fast").is_err());
        assert!(opts.set("auto-paste", "maybe").is_err());
        assert!(opts.set("no-such-option", "1").is_err());
        assert_eq!(opts.max_history, 20);
    }
}
