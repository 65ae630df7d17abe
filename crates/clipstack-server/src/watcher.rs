use clipstack_platform::{ClipboardError, ClipboardPort};

/// Detects clipboard changes by comparing each read with the last value seen.
pub struct ClipboardWatcher<C> {
    clipboard: C,
    last_seen: String,
}

impl<C: ClipboardPort> ClipboardWatcher<C> {
    /// `last_seen` starts empty, so whatever is on the clipboard at start-up
    /// counts as a change.
    pub fn new(clipboard: C) -> Self {
        ClipboardWatcher {
            clipboard,
            last_seen: String::new(),
        }
    }

    /// Read the clipboard once. Returns the new value if it differs from the
    /// last one seen. A failed read leaves `last_seen` untouched.
    pub fn poll_once(&mut self) -> Result<Option<String>, ClipboardError> {
        let current = self.clipboard.read()?;
        if current == self.last_seen {
            return Ok(None);
        }
        self.last_seen.clone_from(&current);
        Ok(Some(current))
    }
}
