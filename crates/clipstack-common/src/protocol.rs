use serde::{Deserialize, Serialize};

/// Messages sent from client to server.
///
/// Every request gets exactly one [`ServerMessage`] in reply. There is no
/// request for the history itself: readers load the history file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Record a value as if it had been copied.
    Add(String),

    /// Remove all entries.
    Clear,

    /// Remove one entry by value.
    Remove(String),

    /// Put an entry back on the clipboard.
    Select(String),

    /// Ping (keepalive).
    Ping,

    /// Stop the server.
    Shutdown,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// The selected entry is now on the clipboard.
    Selected,

    /// Request applied.
    Ok,

    /// Error message.
    Error(String),

    /// Pong (keepalive response).
    Pong,

    /// Server is shutting down.
    ShuttingDown,
}
