use anyhow::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tracing::{debug, trace};

use crate::error::ClipstackError;

const MAX_MESSAGE_SIZE: u32 = 16 * 1024 * 1024; // 16 MB

/// Whether `msg` encodes into a single frame. Callers check this before
/// sending payloads of unbounded size.
pub fn frame_fits<T: Serialize>(msg: &T) -> bool {
    matches!(bincode::serialized_size(msg), Ok(n) if n <= MAX_MESSAGE_SIZE as u64)
}

/// Send a length-prefixed bincode message over an async writer.
pub async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let data = bincode::serialize(msg)?;
    if data.len() > MAX_MESSAGE_SIZE as usize {
        anyhow::bail!(
            "Message too large: {} bytes (max {})",
            data.len(),
            MAX_MESSAGE_SIZE
        );
    }
    let len = data.len() as u32;
    trace!("Sending message: {} bytes", len);
    writer.write_all(&len.to_le_bytes()).await?;
    writer.write_all(&data).await?;
    writer.flush().await?;
    Ok(())
}

/// Receive a length-prefixed bincode message from an async reader.
pub async fn recv_message<R, T>(reader: &mut R) -> Result<T>
where
    R: AsyncReadExt + Unpin,
    T: DeserializeOwned,
{
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf).await?;
    let len = u32::from_le_bytes(len_buf);

    if len > MAX_MESSAGE_SIZE {
        anyhow::bail!("Message too large: {} bytes (max {})", len, MAX_MESSAGE_SIZE);
    }

    trace!("Receiving message: {} bytes", len);
    let mut data = vec![0u8; len as usize];
    reader.read_exact(&mut data).await?;
    let msg = bincode::deserialize(&data)?;
    Ok(msg)
}

/// Bind the server socket, replacing a stale socket file left by a dead server.
pub async fn create_server(path: &Path) -> Result<UnixListener> {
    debug!("Creating server socket: {}", path.display());
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }

    if path.exists() {
        if UnixStream::connect(path).await.is_ok() {
            return Err(ClipstackError::Ipc(format!(
                "another server is already listening on {}",
                path.display()
            ))
            .into());
        }
        debug!("Removing stale socket: {}", path.display());
        std::fs::remove_file(path)?;
    }

    Ok(UnixListener::bind(path)?)
}

/// Connect to the server socket.
pub async fn connect_client(path: &Path) -> Result<UnixStream> {
    debug!("Connecting to server socket: {}", path.display());
    UnixStream::connect(path).await.map_err(|_| {
        anyhow::Error::from(ClipstackError::ServerUnavailable(
            path.display().to_string(),
        ))
    })
}

/// Connect, retrying for a while since a freshly spawned server may not be
/// listening yet.
pub async fn connect_client_with_retry(path: &Path, attempts: u32) -> Result<UnixStream> {
    let mut attempt = 0;
    loop {
        match UnixStream::connect(path).await {
            Ok(stream) => return Ok(stream),
            Err(e) if attempt < attempts => {
                attempt += 1;
                debug!("Socket not ready (attempt {}), retrying: {}", attempt, e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            Err(_) => {
                return Err(ClipstackError::ServerUnavailable(path.display().to_string()).into())
            }
        }
    }
}
