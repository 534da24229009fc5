use std::net::TcpStream;
use std::time::Duration;

use tungstenite::protocol::Message;

use super::{Clients, WsActor};

/// Read poll interval for client sockets.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

impl WsActor {
    /// Complete the handshake and register the client.
    pub(super) fn add_client(&self, stream: TcpStream) {
        // blocking during the handshake, non-blocking for polling reads
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                crate::log!("ws"; "handshake failed: {}", e);
                return;
            }
        };
        let _ = ws.get_ref().set_nonblocking(true);

        if let Some(error) = &self.pending_error
            && let Err(e) = ws.send(Message::Text(error.to_json().into()))
        {
            crate::debug!("ws"; "failed to send pending error: {}", e);
            return;
        }

        let mut clients = self.clients.lock();
        clients.push(ws);
        crate::debug!("ws"; "client connected (total: {})", clients.len());
    }
}

/// Drain client sockets so pings are answered and closed clients dropped.
///
/// Clients never send anything the server acts on.
pub(super) fn reader_loop(clients: Clients) {
    while !crate::core::is_shutdown() {
        std::thread::sleep(POLL_INTERVAL);

        clients.lock().retain_mut(|ws| match ws.read() {
            Ok(Message::Close(_)) => false,
            Ok(_) => true,
            Err(tungstenite::Error::Io(ref e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                true
            }
            Err(e) => {
                crate::debug!("ws"; "client dropped: {}", e);
                false
            }
        });
    }
}
