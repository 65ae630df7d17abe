use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ClipboardError {
    /// No clipboard backend could be opened (no display, missing tools).
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    /// The backend was reachable but the operation failed.
    #[error("Clipboard error: {0}")]
    Backend(String),
}

/// Read/write access to the system clipboard.
///
/// Implementations are used from a single task at a time.
pub trait ClipboardPort: Send {
    /// Current text contents. Non-text contents read as an empty string.
    fn read(&mut self) -> Result<String, ClipboardError>;

    fn write(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The platform clipboard through `arboard`.
///
/// The handle is opened lazily and dropped after a backend failure, so a
/// clipboard that comes up later (e.g. display server restart) is picked up
/// on the next call.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        SystemClipboard { inner: None }
    }

    fn handle(&mut self) -> Result<&mut arboard::Clipboard, ClipboardError> {
        if self.inner.is_none() {
            let clipboard = arboard::Clipboard::new()
                .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            debug!("Clipboard backend opened");
            self.inner = Some(clipboard);
        }
        self.inner
            .as_mut()
            .ok_or_else(|| ClipboardError::Unavailable("no clipboard handle".to_string()))
    }
}

impl ClipboardPort for SystemClipboard {
    fn read(&mut self) -> Result<String, ClipboardError> {
        let result = self.handle()?.get_text();
        match result {
            Ok(text) => Ok(text),
            // Images, files and an empty selection are not errors for a text history.
            Err(arboard::Error::ContentNotAvailable) => Ok(String::new()),
            Err(e) => {
                self.inner = None;
                Err(ClipboardError::Backend(e.to_string()))
            }
        }
    }

    fn write(&mut self, text: &str) -> Result<(), ClipboardError> {
        let result = self.handle()?.set_text(text.to_string());
        result.map_err(|e| {
            self.inner = None;
            ClipboardError::Backend(e.to_string())
        })
    }
}
