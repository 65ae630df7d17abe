use serde::{Deserialize, Serialize};

/// Result of pushing a clipboard value onto a [`History`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pushed {
    /// Empty or whitespace-only text, nothing stored.
    Rejected,
    /// The text already is the most recent entry.
    Unchanged,
    /// The text is now at the head (new, or moved up from an older position).
    Inserted,
}

impl Pushed {
    pub fn changed(self) -> bool {
        matches!(self, Pushed::Inserted)
    }
}

/// Clipboard history, most recent first.
///
/// Entries are unique and never blank. The persisted form is a plain JSON
/// array of strings, so the type serializes transparently.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        History {
            entries: Vec::new(),
        }
    }

    /// Build a history from raw entries in most-recent-first order.
    ///
    /// Blank entries are dropped, later duplicates are dropped in favour of
    /// the earlier (more recent) occurrence, and the result is cut to `max`.
    pub fn from_entries<I>(entries: I, max: usize) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut history = History::new();
        for entry in entries {
            if history.entries.len() >= max {
                break;
            }
            if is_blank(&entry) || history.entries.contains(&entry) {
                continue;
            }
            history.entries.push(entry);
        }
        history
    }

    /// Record a clipboard value.
    ///
    /// A repeat of the current head is a no-op. Otherwise every equal entry
    /// is removed, the text goes to the front, and the oldest entries beyond
    /// `max` are evicted.
    pub fn push(&mut self, text: &str, max: usize) -> Pushed {
        if is_blank(text) {
            return Pushed::Rejected;
        }
        if self.top() == Some(text) {
            return Pushed::Unchanged;
        }

        self.entries.retain(|entry| entry != text);
        self.entries.insert(0, text.to_string());
        self.truncate(max);
        Pushed::Inserted
    }

    /// Remove an entry by value. Returns whether anything was removed.
    pub fn remove(&mut self, text: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry != text);
        self.entries.len() != before
    }

    /// Drop everything past the first `max` entries.
    pub fn truncate(&mut self, max: usize) {
        self.entries.truncate(max);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Most recent entry.
    pub fn top(&self) -> Option<&str> {
        self.entries.first().map(|s| s.as_str())
    }

    /// Get an entry by index (0 = most recent).
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.as_str())
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }
}

fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}
