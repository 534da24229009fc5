//! WebSocket Actor - live update channel
//!
//! Holds the connected browser clients and pushes reload, update and
//! error messages to all of them. A build error that is still current is
//! replayed to clients that connect later.
//!
//! ```text
//! BuilderActor --[Reload/Update/Error]--> WsActor --[broadcast]--> Clients
//! ```

mod client_io;
mod delivery;

use std::net::TcpStream;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tungstenite::WebSocket;

use super::messages::WsMsg;
use crate::reload::message::HotReloadMessage;

type Clients = Arc<Mutex<Vec<WebSocket<TcpStream>>>>;

/// WebSocket Actor - manages client connections and broadcasts
pub struct WsActor {
    rx: mpsc::Receiver<WsMsg>,
    /// Connected clients (shared with the read thread)
    clients: Clients,
    /// Current build error, replayed to new clients
    pending_error: Option<HotReloadMessage>,
}

impl WsActor {
    pub fn new(rx: mpsc::Receiver<WsMsg>) -> Self {
        Self {
            rx,
            clients: Arc::new(Mutex::new(Vec::new())),
            pending_error: None,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        let clients_for_reader = Arc::clone(&self.clients);
        std::thread::spawn(move || client_io::reader_loop(clients_for_reader));

        while let Some(msg) = self.rx.recv().await {
            match msg {
                WsMsg::Reload { reason } => {
                    crate::debug!("ws"; "sending reload: {}", reason);
                    self.broadcast(&HotReloadMessage::reload_with_reason(reason));
                }

                WsMsg::Update { modules } => {
                    crate::debug!("ws"; "sending update for {} module(s)", modules.len());
                    self.broadcast(&HotReloadMessage::update(modules));
                }

                WsMsg::Error { path, error } => {
                    let msg = HotReloadMessage::error(path, error);
                    self.broadcast(&msg);
                    self.pending_error = Some(msg);
                }

                WsMsg::ClearError => {
                    self.pending_error = None;
                    self.broadcast(&HotReloadMessage::ClearError);
                }

                WsMsg::AddClient(stream) => self.add_client(stream),

                WsMsg::Shutdown => {
                    crate::debug!("ws"; "shutting down");
                    for mut client in self.clients.lock().drain(..) {
                        let _ = client.close(None);
                    }
                    break;
                }
            }
        }
    }

    fn client_count(&self) -> usize {
        self.clients.lock().len()
    }
}
