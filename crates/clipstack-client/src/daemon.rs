use anyhow::{Context, Result};
use clipstack_common::ipc::{
    connect_client, connect_client_with_retry, frame_fits, recv_message, send_message,
};
use clipstack_common::{ClientMessage, ClipstackError, ServerMessage};
use clipstack_platform::{ClipboardPort, SystemClipboard};
use clipstack_store::{History, HistoryStore};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::net::UnixStream;
use tracing::{debug, warn};

/// How long a locally owned clipboard value is kept after the paste was sent.
pub const CLIPBOARD_LINGER: Duration = Duration::from_millis(500);

type ClipboardFactory = Box<dyn Fn() -> Box<dyn ClipboardPort>>;

/// History operations for the client side.
///
/// Mutations go to the server when it is running, so the monitor stays the
/// only writer. Without a server the client works on the store directly;
/// the store's lock keeps that safe against a server starting meanwhile.
/// Reads always load the history file.
pub struct Daemon {
    socket: PathBuf,
    store: HistoryStore,
    clipboard: ClipboardFactory,
}

/// Ownership of a clipboard value written by this process.
///
/// X11 drops the clipboard contents together with the last handle, so a
/// local value must be held until whoever pastes it has read it. Values set
/// by the server are owned by the server and need nothing here.
pub struct ClipboardHold {
    owner: Option<Box<dyn ClipboardPort>>,
}

impl ClipboardHold {
    pub fn is_local(&self) -> bool {
        self.owner.is_some()
    }

    /// Keep a local value owned for `linger`, then give it up.
    pub async fn release(self, linger: Duration) {
        if self.owner.is_some() {
            debug!("Holding clipboard for {:?}", linger);
            tokio::time::sleep(linger).await;
        }
    }
}

impl fmt::Debug for ClipboardHold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClipboardHold")
            .field("local", &self.is_local())
            .finish()
    }
}

impl Daemon {
    pub fn new(socket: PathBuf, store: HistoryStore) -> Self {
        Daemon {
            socket,
            store,
            clipboard: Box::new(|| Box::new(SystemClipboard::new())),
        }
    }

    #[cfg(test)]
    fn with_clipboard<F>(mut self, clipboard: F) -> Self
    where
        F: Fn() -> Box<dyn ClipboardPort> + 'static,
    {
        self.clipboard = Box::new(clipboard);
        self
    }

    async fn connect(&self) -> Option<UnixStream> {
        match connect_client(&self.socket).await {
            Ok(stream) => Some(stream),
            Err(e) => {
                debug!("{}; using the history file directly", e);
                None
            }
        }
    }

    /// Send one request on a fresh connection. `None` means the caller has to
    /// apply the request itself: no server is running, or the payload does
    /// not fit in a frame.
    async fn request(&self, msg: &ClientMessage) -> Result<Option<ServerMessage>> {
        if !frame_fits(msg) {
            debug!("Request too large for the socket, applying it locally");
            return Ok(None);
        }
        let Some(mut stream) = self.connect().await else {
            return Ok(None);
        };
        send_message(&mut stream, msg).await?;
        let reply: ServerMessage = recv_message(&mut stream).await?;
        match reply {
            ServerMessage::Error(e) => Err(ClipstackError::Protocol(e).into()),
            reply => Ok(Some(reply)),
        }
    }

    /// Current history, read from the file.
    pub fn list(&self) -> History {
        self.store.load()
    }

    pub async fn add(&self, text: &str) -> Result<()> {
        match self.request(&ClientMessage::Add(text.to_string())).await? {
            Some(ServerMessage::Ok) => Ok(()),
            Some(other) => Err(unexpected(other)),
            None => {
                self.store.add(text)?;
                Ok(())
            }
        }
    }

    pub async fn clear(&self) -> Result<()> {
        match self.request(&ClientMessage::Clear).await? {
            Some(ServerMessage::Ok) => Ok(()),
            Some(other) => Err(unexpected(other)),
            None => Ok(self.store.clear()?),
        }
    }

    pub async fn remove(&self, text: &str) -> Result<()> {
        match self.request(&ClientMessage::Remove(text.to_string())).await? {
            Some(ServerMessage::Ok) => Ok(()),
            Some(other) => Err(unexpected(other)),
            None => {
                if !self.store.remove(text)? {
                    anyhow::bail!("Entry not found");
                }
                Ok(())
            }
        }
    }

    /// Put `text` on the clipboard. The returned hold must be kept until the
    /// value has been pasted.
    pub async fn select(&self, text: &str) -> Result<ClipboardHold> {
        match self.request(&ClientMessage::Select(text.to_string())).await? {
            Some(ServerMessage::Selected) => Ok(ClipboardHold { owner: None }),
            Some(other) => Err(unexpected(other)),
            None => {
                warn!("Setting the clipboard from this process; it is lost when clipstack exits");
                let mut clipboard = (self.clipboard)();
                clipboard.write(text).context("Failed to set clipboard")?;
                self.store.add(text)?;
                Ok(ClipboardHold {
                    owner: Some(clipboard),
                })
            }
        }
    }

    /// Ask a running server to stop. Returns false if none was running.
    pub async fn shutdown(&self) -> Result<bool> {
        match self.request(&ClientMessage::Shutdown).await? {
            Some(ServerMessage::ShuttingDown) => Ok(true),
            Some(other) => Err(unexpected(other)),
            None => Ok(false),
        }
    }

    pub async fn ping(&self) -> bool {
        matches!(
            self.request(&ClientMessage::Ping).await,
            Ok(Some(ServerMessage::Pong))
        )
    }

    /// Start the server as a detached background process and wait for it.
    pub async fn start_server(&self) -> Result<()> {
        if self.ping().await {
            return Ok(());
        }

        let server_path = server_binary()?;
        let mut command = std::process::Command::new(&server_path);
        command
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }
        command
            .spawn()
            .with_context(|| format!("Failed to start {}", server_path.display()))?;

        connect_client_with_retry(&self.socket, 30).await?;
        Ok(())
    }

    pub fn socket(&self) -> &Path {
        &self.socket
    }
}

fn unexpected(reply: ServerMessage) -> anyhow::Error {
    ClipstackError::Protocol(format!("Unexpected response from server: {:?}", reply)).into()
}

fn server_binary() -> Result<PathBuf> {
    let exe_path = std::env::current_exe()?;
    let dir = exe_path
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Executable has no parent directory"))?;
    let server_path = dir.join(format!("clipstack-server{}", std::env::consts::EXE_SUFFIX));

    if !server_path.exists() {
        anyhow::bail!(
            "Server binary not found: {}. Build with `cargo build`.",
            server_path.display()
        );
    }
    Ok(server_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clipstack_common::ipc::create_server;
    use clipstack_platform::ClipboardError;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    fn offline(dir: &Path) -> Daemon {
        Daemon::new(
            dir.join("no-server.sock"),
            HistoryStore::new(dir.join("history.json"), 20),
        )
    }

    /// Records writes and notes when the handle is dropped.
    struct TrackedClipboard {
        written: Arc<Mutex<Vec<String>>>,
        dropped: Arc<AtomicBool>,
    }

    impl ClipboardPort for TrackedClipboard {
        fn read(&mut self) -> Result<String, ClipboardError> {
            Ok(String::new())
        }

        fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
            self.written.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    impl Drop for TrackedClipboard {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_store_without_server() {
        let dir = tempdir().unwrap();
        let daemon = offline(dir.path());

        daemon.add("a").await.unwrap();
        daemon.add("b").await.unwrap();
        assert_eq!(daemon.list().entries(), &["b", "a"]);

        daemon.remove("b").await.unwrap();
        assert!(daemon.remove("b").await.is_err());
        daemon.clear().await.unwrap();
        assert!(daemon.list().is_empty());
        assert!(!daemon.shutdown().await.unwrap());
    }

    #[tokio::test]
    async fn test_mutations_go_to_server_when_running() {
        let dir = tempdir().unwrap();
        let socket = dir.path().join("server.sock");
        let listener = create_server(&socket).await.unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let msg: ClientMessage = recv_message(&mut stream).await.unwrap();
            assert_eq!(msg, ClientMessage::Add("via server".into()));
            send_message(&mut stream, &ServerMessage::Ok).await.unwrap();
        });

        let daemon = Daemon::new(socket, HistoryStore::new(dir.path().join("history.json"), 20));
        daemon.add("via server").await.unwrap();
        server.await.unwrap();
        // The fake server does not write; the file was left alone.
        assert!(daemon.list().is_empty());
    }

    #[tokio::test]
    async fn test_large_history_and_payloads_bypass_socket() {
        let dir = tempdir().unwrap();
        let socket = dir.path().join("server.sock");
        let listener = create_server(&socket).await.unwrap();

        let store = HistoryStore::new(dir.path().join("history.json"), 20);
        let big: Vec<String> = (0..17)
            .map(|i| format!("{}{}", i, "x".repeat(1024 * 1024)))
            .collect();
        store.save(&History::from_entries(big, 20)).unwrap();

        let daemon = Daemon::new(socket, store);
        assert_eq!(daemon.list().len(), 17);

        let huge = "y".repeat(17 * 1024 * 1024);
        daemon.add(&huge).await.unwrap();
        assert_eq!(daemon.list().top(), Some(huge.as_str()));
        assert_eq!(daemon.list().len(), 18);

        let accepted =
            tokio::time::timeout(Duration::from_millis(100), listener.accept()).await;
        assert!(accepted.is_err(), "nothing should have been sent to the server");
    }

    #[tokio::test]
    async fn test_local_select_keeps_clipboard_until_released() {
        let dir = tempdir().unwrap();
        let written = Arc::new(Mutex::new(Vec::new()));
        let dropped = Arc::new(AtomicBool::new(false));
        let (w, d) = (Arc::clone(&written), Arc::clone(&dropped));
        let daemon = offline(dir.path()).with_clipboard(move || {
            Box::new(TrackedClipboard {
                written: Arc::clone(&w),
                dropped: Arc::clone(&d),
            })
        });

        let hold = daemon.select("pick me").await.unwrap();
        assert!(hold.is_local());
        assert_eq!(*written.lock().unwrap(), vec!["pick me".to_string()]);
        assert!(!dropped.load(Ordering::SeqCst));
        assert_eq!(daemon.list().top(), Some("pick me"));

        hold.release(Duration::from_millis(1)).await;
        assert!(dropped.load(Ordering::SeqCst));
    }
}
