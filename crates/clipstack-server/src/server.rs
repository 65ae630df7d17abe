use anyhow::Result;
use clipstack_common::ipc::{recv_message, send_message};
use clipstack_common::{ClientId, ClientMessage, ServerMessage};
use clipstack_platform::ClipboardPort;
use clipstack_store::HistoryStore;
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

/// State behind the server socket.
///
/// History mutations from clients go through the same locked store as the
/// clipboard monitor, so the two are applied one after another. Requests
/// block on the store lock and file I/O, so they run on the blocking pool.
pub struct ServerState {
    store: HistoryStore,
    clipboard: Box<dyn ClipboardPort>,
}

impl ServerState {
    pub fn new(store: HistoryStore, clipboard: Box<dyn ClipboardPort>) -> Self {
        ServerState { store, clipboard }
    }

    /// Apply one client request and build the reply.
    pub fn process_message(&mut self, msg: ClientMessage) -> ServerMessage {
        match msg {
            ClientMessage::Add(text) => match self.store.add(&text) {
                Ok(_) => ServerMessage::Ok,
                Err(e) => ServerMessage::Error(format!("Failed to add entry: {}", e)),
            },

            ClientMessage::Clear => match self.store.clear() {
                Ok(()) => {
                    info!("History cleared by client");
                    ServerMessage::Ok
                }
                Err(e) => ServerMessage::Error(format!("Failed to clear history: {}", e)),
            },

            ClientMessage::Remove(text) => match self.store.remove(&text) {
                Ok(true) => ServerMessage::Ok,
                Ok(false) => ServerMessage::Error("Entry not found".to_string()),
                Err(e) => ServerMessage::Error(format!("Failed to remove entry: {}", e)),
            },

            // The monitor picks the new clipboard value up on its next poll
            // and moves it to the head of the history.
            ClientMessage::Select(text) => match self.clipboard.write(&text) {
                Ok(()) => {
                    debug!("Copied {} bytes to clipboard", text.len());
                    ServerMessage::Selected
                }
                Err(e) => ServerMessage::Error(format!("Failed to set clipboard: {}", e)),
            },

            ClientMessage::Ping => ServerMessage::Pong,

            ClientMessage::Shutdown => ServerMessage::ShuttingDown,
        }
    }
}

pub struct Server {
    state: Arc<Mutex<ServerState>>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    pub fn new(state: ServerState, shutdown: watch::Sender<bool>) -> Self {
        Server {
            state: Arc::new(Mutex::new(state)),
            shutdown,
        }
    }

    /// Accept clients until the shutdown signal is raised.
    pub async fn run(&self, listener: UnixListener) -> Result<()> {
        info!("Server starting, waiting for connections...");
        let mut stop = self.shutdown.subscribe();

        loop {
            let accepted = tokio::select! {
                accepted = listener.accept() => Some(accepted),
                _ = stop.changed() => None,
            };

            match accepted {
                Some(Ok((stream, _))) => {
                    let client_id = ClientId::new();
                    debug!("Client connected: {}", client_id);

                    let state = Arc::clone(&self.state);
                    let shutdown = self.shutdown.clone();
                    tokio::spawn(async move {
                        handle_client(state, shutdown, client_id, stream).await;
                    });
                }
                Some(Err(e)) => error!("Accept failed: {}", e),
                None if *stop.borrow() => break,
                None => {}
            }
        }

        info!("Server stopped accepting connections");
        Ok(())
    }
}

/// Handle a single client connection. Runs as an independent tokio task.
async fn handle_client(
    state: Arc<Mutex<ServerState>>,
    shutdown: watch::Sender<bool>,
    client_id: ClientId,
    mut stream: UnixStream,
) {
    loop {
        // Read next message from client (no lock held during I/O)
        let msg: Result<ClientMessage> = recv_message(&mut stream).await;

        let client_msg = match msg {
            Ok(client_msg) => client_msg,
            Err(e) => {
                debug!("Client read ended: {}", e);
                break;
            }
        };
        debug!("Client {} sent {}", client_id, request_name(&client_msg));

        let response = match client_msg {
            // Answered without the state, so they work while a store call blocks.
            ClientMessage::Ping => ServerMessage::Pong,
            ClientMessage::Shutdown => ServerMessage::ShuttingDown,
            msg => process_blocking(&state, msg).await,
        };

        if let ServerMessage::Error(e) = &response {
            warn!("Request from {} failed: {}", client_id, e);
        }
        let stopping = response == ServerMessage::ShuttingDown;

        if let Err(e) = send_message(&mut stream, &response).await {
            error!("Failed to send message: {}", e);
            break;
        }
        if stopping {
            info!("Shutdown requested by client {}", client_id);
            let _ = shutdown.send(true);
            break;
        }
    }

    debug!("Client disconnected: {}", client_id);
}

/// Run a request on the blocking pool; the store call may wait on the file
/// lock held by another process.
async fn process_blocking(state: &Arc<Mutex<ServerState>>, msg: ClientMessage) -> ServerMessage {
    let worker = Arc::clone(state);
    let processed =
        tokio::task::spawn_blocking(move || worker.blocking_lock().process_message(msg)).await;
    match processed {
        Ok(response) => response,
        Err(e) => ServerMessage::Error(format!("Request failed: {}", e)),
    }
}

/// Request kind for logs, without the clipboard payload.
fn request_name(msg: &ClientMessage) -> &'static str {
    match msg {
        ClientMessage::Add(_) => "Add",
        ClientMessage::Clear => "Clear",
        ClientMessage::Remove(_) => "Remove",
        ClientMessage::Select(_) => "Select",
        ClientMessage::Ping => "Ping",
        ClientMessage::Shutdown => "Shutdown",
    }
}
