use clipstack_common::preview::{truncate, DEFAULT_PREVIEW_LENGTH};
use clipstack_platform::ClipboardPort;
use clipstack_store::{HistoryStore, Pushed, StoreError};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Long-running clipboard monitor.
///
/// Polls the clipboard through a [`ClipboardWatcher`] and records every new
/// value in the store. Only the stop signal ends the loop; clipboard and
/// store failures are logged and the loop carries on.
///
/// [`ClipboardWatcher`]: crate::watcher::ClipboardWatcher
pub struct MonitorLoop<C> {
    watcher: crate::watcher::ClipboardWatcher<C>,
    store: HistoryStore,
    poll_interval: Duration,
    backoff_interval: Duration,
    stop: watch::Receiver<bool>,
}

impl<C: ClipboardPort> MonitorLoop<C> {
    pub fn new(
        watcher: crate::watcher::ClipboardWatcher<C>,
        store: HistoryStore,
        poll_interval: Duration,
        backoff_interval: Duration,
        stop: watch::Receiver<bool>,
    ) -> Self {
        MonitorLoop {
            watcher,
            store,
            poll_interval,
            backoff_interval,
            stop,
        }
    }

    pub async fn run(mut self) {
        info!(
            "Monitoring clipboard every {:?} into {}",
            self.poll_interval,
            self.store.path().display()
        );

        while !self.stopped() {
            let Some(delay) = self.tick().await else {
                break;
            };

            if !self.wait(delay).await {
                break;
            }
        }

        info!("Clipboard monitor stopped");
    }

    /// Poll once and record any change. Returns how long to wait before the
    /// next poll, or `None` if the stop signal fired meanwhile.
    async fn tick(&mut self) -> Option<Duration> {
        let text = match self.watcher.poll_once() {
            Ok(Some(text)) => text,
            Ok(None) => return Some(self.poll_interval),
            Err(e) => {
                warn!("{}. Retrying in {:?}", e, self.backoff_interval);
                return Some(self.backoff_interval + self.poll_interval);
            }
        };

        let recorded = self.record(text).await?;
        match recorded {
            Ok((text, Pushed::Inserted)) => {
                info!("Added: {}", truncate(&text, DEFAULT_PREVIEW_LENGTH))
            }
            Ok(_) => debug!("Clipboard change not recorded (blank or already newest)"),
            Err(e) => error!("Error saving history: {}", e),
        }
        Some(self.poll_interval)
    }

    /// Add `text` to the store on the blocking pool. The store lock may be
    /// held by another process; a stop signal abandons the wait and the add
    /// finishes in the background.
    async fn record(&mut self, text: String) -> Option<Result<(String, Pushed), StoreError>> {
        let store = self.store.clone();
        let mut task = tokio::task::spawn_blocking(move || {
            let pushed = store.add(&text)?;
            Ok((text, pushed))
        });

        loop {
            tokio::select! {
                joined = &mut task => {
                    return Some(joined.unwrap_or_else(|e| {
                        Err(StoreError::Io(std::io::Error::other(e)))
                    }));
                }
                changed = self.stop.changed() => {
                    if changed.is_err() || *self.stop.borrow() {
                        info!("Stopped while waiting for the history lock");
                        return None;
                    }
                }
            }
        }
    }

    fn stopped(&self) -> bool {
        *self.stop.borrow()
    }

    /// Sleep for `duration` unless the stop signal fires first.
    /// Returns false when the loop should exit.
    async fn wait(&mut self, duration: Duration) -> bool {
        let changed = tokio::select! {
            _ = tokio::time::sleep(duration) => return true,
            changed = self.stop.changed() => changed,
        };
        // A dropped sender also means stop.
        changed.is_ok() && !*self.stop.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watcher::tests::FakeClipboard;
    use crate::watcher::ClipboardWatcher;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn monitor(
        fake: FakeClipboard,
        store: HistoryStore,
        poll_ms: u64,
    ) -> (MonitorLoop<FakeClipboard>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let monitor = MonitorLoop::new(
            ClipboardWatcher::new(fake),
            store,
            Duration::from_millis(poll_ms),
            Duration::from_millis(poll_ms),
            rx,
        );
        (monitor, tx)
    }

    #[tokio::test]
    async fn test_records_changes_and_survives_errors() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 20);
        let fake = FakeClipboard::scripted(vec![
            Ok("a"),
            Ok("a"),
            Err("backend gone"),
            Ok("b"),
            Ok("   "),
            Ok("a"),
        ]);
        let (monitor, stop) = monitor(fake, store.clone(), 5);
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(300)).await;
        stop.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("monitor stops")
            .unwrap();

        assert_eq!(store.load().entries(), &["a", "b"]);
    }

    #[tokio::test]
    async fn test_stop_interrupts_wait() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 20);
        let fake = FakeClipboard::scripted(vec![Ok("only")]);
        let (monitor, stop) = monitor(fake, store.clone(), 60_000);
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("monitor stops well before the poll interval")
            .unwrap();

        assert_eq!(store.load().entries(), &["only"]);
    }

    #[tokio::test]
    async fn test_dropped_sender_stops_loop() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 20);
        let (monitor, stop) = monitor(FakeClipboard::default(), store, 60_000);
        let handle = tokio::spawn(monitor.run());

        drop(stop);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("monitor stops")
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_stop_while_history_locked() {
        let dir = tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"), 20);
        let lock = store.lock().unwrap();

        let fake = FakeClipboard::scripted(vec![Ok("a")]);
        let (monitor, stop) = monitor(fake, store.clone(), 10);
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!handle.is_finished());
        stop.send(true).unwrap();
        tokio::time::timeout(Duration::from_millis(500), handle)
            .await
            .expect("monitor stops while the add waits for the lock")
            .unwrap();

        // The abandoned add completes once the lock is free.
        drop(lock);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while store.load().is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.load().entries(), &["a"]);
    }

    #[tokio::test]
    async fn test_keeps_polling_when_history_unwritable() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "not a directory").unwrap();
        let store = HistoryStore::new(blocker.join("history.json"), 20);

        let fake = FakeClipboard::scripted(vec![Ok("a"), Ok("b"), Ok("c")]);
        let reads = Arc::clone(&fake.reads);
        let (monitor, stop) = monitor(fake, store.clone(), 5);
        let handle = tokio::spawn(monitor.run());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(reads.lock().unwrap().is_empty());
        assert!(!handle.is_finished());

        stop.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("monitor stops on the signal")
            .unwrap();
        assert!(store.load().is_empty());
    }
}
