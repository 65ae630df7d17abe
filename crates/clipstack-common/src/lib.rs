pub mod error;
pub mod ipc;
pub mod preview;
pub mod protocol;

pub use error::ClipstackError;
pub use protocol::{ClientMessage, ServerMessage};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Unique identifier for a connected client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Get the socket path for the clipstack server.
///
/// `CLIPSTACK_SOCKET` wins; otherwise the per-user runtime directory, falling
/// back to the data directory when there is none.
pub fn socket_path() -> PathBuf {
    if let Ok(path) = std::env::var("CLIPSTACK_SOCKET") {
        return PathBuf::from(path);
    }
    dirs::runtime_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("clipstack")
        .join("server.sock")
}
