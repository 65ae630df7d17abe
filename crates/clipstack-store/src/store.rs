use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace, warn};

use crate::error::StoreError;
use crate::history::{History, Pushed};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// The persisted clipboard history.
///
/// The file is the only source of truth: every operation reads it fresh.
/// Mutations run as read-modify-write cycles under an exclusive advisory lock
/// on a sidecar `<file>.lock`, so writers in different processes are applied
/// one after another in lock order. Writes go to a temporary file that is
/// renamed over the target, so readers never observe a half-written file.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    max_history: usize,
}

/// Holds the store's exclusive lock until dropped.
pub struct StoreLock {
    file: File,
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, max_history: usize) -> Self {
        HistoryStore {
            path: path.into(),
            max_history: max_history.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Read the history, treating any failure as an empty history.
    pub fn load(&self) -> History {
        match self.try_load() {
            Ok(history) => history,
            Err(e) => {
                warn!("Error loading history from {}: {}", self.path.display(), e);
                History::new()
            }
        }
    }

    /// Read the history. A missing or empty file is an empty history;
    /// unreadable or malformed contents are an error.
    pub fn try_load(&self) -> Result<History, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(History::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        if content.trim().is_empty() {
            return Ok(History::new());
        }

        let entries: Vec<String> = serde_json::from_str(&content)?;
        Ok(History::from_entries(entries, self.max_history))
    }

    /// Replace the persisted history with `history`, cut to the bound.
    pub fn save(&self, history: &History) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        self.write(history)
    }

    /// Record a clipboard value (see [`History::push`]).
    pub fn add(&self, text: &str) -> Result<Pushed, StoreError> {
        if text.trim().is_empty() {
            return Ok(Pushed::Rejected);
        }
        let max = self.max_history;
        self.update(|history| history.push(text, max))
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<(), StoreError> {
        let _lock = self.lock()?;
        self.write(&History::new())
    }

    /// Remove a single entry by value.
    pub fn remove(&self, text: &str) -> Result<bool, StoreError> {
        self.update(|history| history.remove(text))
    }

    /// Run a locked read-modify-write cycle.
    ///
    /// `f` reports whether it changed anything through `Mutation`; unchanged
    /// histories are not rewritten.
    pub fn update<F, R>(&self, f: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut History) -> R,
        R: Mutation,
    {
        let _lock = self.lock()?;
        let mut history = self.load();
        let result = f(&mut history);
        if result.is_mutation() {
            self.write(&history)?;
        }
        Ok(result)
    }

    /// Acquire the exclusive store lock, blocking until it is available.
    pub fn lock(&self) -> Result<StoreLock, StoreError> {
        self.ensure_parent()?;
        let lock_path = self.sidecar("lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive().map_err(|e| StoreError::Lock {
            path: lock_path.clone(),
            source: e,
        })?;
        trace!("Acquired lock: {}", lock_path.display());
        Ok(StoreLock { file })
    }

    fn write(&self, history: &History) -> Result<(), StoreError> {
        self.ensure_parent()?;
        let mut history = history.clone();
        history.truncate(self.max_history);
        let json = serde_json::to_string_pretty(&history)?;

        let id = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = self.sidecar(&format!("{}.{}.tmp", std::process::id(), id));
        let written = (|| -> io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::Io(e));
        }

        debug!("Saved {} entries to {}", history.len(), self.path.display());
        Ok(())
    }

    fn ensure_parent(&self) -> io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }

    fn sidecar(&self, suffix: &str) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "history".into());
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }
}

/// Whether the outcome of an [`HistoryStore::update`] closure needs saving.
pub trait Mutation {
    fn is_mutation(&self) -> bool;
}

impl Mutation for bool {
    fn is_mutation(&self) -> bool {
        *self
    }
}

impl Mutation for Pushed {
    fn is_mutation(&self) -> bool {
        self.changed()
    }
}
