//! Actor Message Definitions
//!
//! ```text
//! FsActor --Rebuild--> BuilderActor --Reload/Update/Error--> WsActor
//! ```

use std::path::PathBuf;

use crate::reload::message::{HotReloadMessage, ModuleUpdate};

/// Messages to the BuilderActor
#[derive(Debug)]
pub enum BuildMsg {
    /// Rebuild after source changes
    Rebuild {
        /// Paths that triggered this rebuild
        changed: Vec<PathBuf>,
        /// The project config file changed; reload it first
        config_changed: bool,
    },
    /// Shutdown
    Shutdown,
}

/// Messages to the WebSocket Actor
#[derive(Debug)]
pub enum WsMsg {
    /// Reload every client
    Reload { reason: String },
    /// Re-import changed modules in place
    Update { modules: Vec<ModuleUpdate> },
    /// Build error (display overlay, no reload)
    Error { path: String, error: String },
    /// Clear error overlay (build succeeded after error)
    ClearError,
    /// Add client
    AddClient(std::net::TcpStream),
    /// Shutdown
    Shutdown,
}

impl From<HotReloadMessage> for WsMsg {
    fn from(msg: HotReloadMessage) -> Self {
        match msg {
            HotReloadMessage::Reload { reason } => Self::Reload {
                reason: reason.unwrap_or_default(),
            },
            HotReloadMessage::Update { modules } => Self::Update { modules },
            HotReloadMessage::Error { path, error } => Self::Error { path, error },
            HotReloadMessage::ClearError => Self::ClearError,
        }
    }
}
