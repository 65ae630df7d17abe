use std::time::Duration;
use tracing::debug;

use crate::history::History;
use crate::store::HistoryStore;

/// Detects history changes made by other processes by re-reading the store
/// on a fixed interval.
///
/// The poller is passive: the owner schedules [`SyncPoller::tick`] every
/// [`SyncPoller::interval`] and redraws when it returns a new snapshot.
#[derive(Debug, Clone)]
pub struct SyncPoller {
    store: HistoryStore,
    interval: Duration,
}

impl SyncPoller {
    pub fn new(store: HistoryStore, interval: Duration) -> Self {
        SyncPoller { store, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    /// Re-read the store and compare against `last`.
    ///
    /// Returns the new snapshot only if it differs (order-sensitive). A read
    /// failure counts as "no change" rather than as an empty history, so a
    /// transient error never blanks the rendered list.
    pub fn tick(&self, last: &History) -> Option<History> {
        match self.store.try_load() {
            Ok(snapshot) if snapshot != *last => Some(snapshot),
            Ok(_) => None,
            Err(e) => {
                debug!("Sync tick skipped: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn poller(dir: &std::path::Path) -> SyncPoller {
        let store = HistoryStore::new(dir.join("history.json"), 20);
        SyncPoller::new(store, Duration::from_millis(1000))
    }

    #[test]
    fn test_tick_reports_change_once() {
        let dir = tempdir().expect("tempdir");
        let poller = poller(dir.path());
        let mut snapshot = History::new();

        assert!(poller.tick(&snapshot).is_none());

        poller.store().add("hello").expect("add");
        snapshot = poller.tick(&snapshot).expect("change detected");
        assert_eq!(snapshot.entries(), &["hello"]);
        assert!(poller.tick(&snapshot).is_none());
    }

    #[test]
    fn test_tick_is_order_sensitive() {
        let dir = tempdir().expect("tempdir");
        let poller = poller(dir.path());
        poller.store().add("a").expect("add");
        poller.store().add("b").expect("add");
        let snapshot = poller.tick(&History::new()).expect("initial");

        poller.store().add("a").expect("add");
        let moved = poller.tick(&snapshot).expect("reorder detected");
        assert_eq!(moved.entries(), &["a", "b"]);
    }

    #[test]
    fn test_tick_ignores_unreadable_file() {
        let dir = tempdir().expect("tempdir");
        let poller = poller(dir.path());
        poller.store().add("kept").expect("add");
        let snapshot = poller.tick(&History::new()).expect("initial");

        std::fs::write(poller.store().path(), "{ not json").expect("corrupt");
        assert!(poller.tick(&snapshot).is_none());
    }

    #[test]
    fn test_tick_sees_clear() {
        let dir = tempdir().expect("tempdir");
        let poller = poller(dir.path());
        poller.store().add("a").expect("add");
        let snapshot = poller.tick(&History::new()).expect("initial");

        poller.store().clear().expect("clear");
        let cleared = poller.tick(&snapshot).expect("clear detected");
        assert!(cleared.is_empty());
    }
}
