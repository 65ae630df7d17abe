use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipstackError {
    #[error("IPC error: {0}")]
    Ipc(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Server not running at {0}")]
    ServerUnavailable(String),

    #[error("No history entry at index {0}")]
    NoSuchEntry(usize),
}
