//! Dev serving loop state and process shutdown.
//!
//! The loop moves through `Idle → Building → Serving → Rebuilding → Serving`
//! and ends in `Stopped`. A change arriving while `Rebuilding` keeps the
//! loop in `Rebuilding` (the newer build supersedes the old one).

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use tiny_http::Server;

/// Phase of the dev serving loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServeState {
    Idle = 0,
    Building = 1,
    Serving = 2,
    Rebuilding = 3,
    Stopped = 4,
}

impl ServeState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Idle,
            1 => Self::Building,
            2 => Self::Serving,
            3 => Self::Rebuilding,
            _ => Self::Stopped,
        }
    }

    /// Whether `self → next` is a legal transition.
    pub const fn can_move_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Building)
                | (Self::Building, Self::Serving)
                | (Self::Serving, Self::Rebuilding)
                | (Self::Rebuilding, Self::Rebuilding)
                | (Self::Rebuilding, Self::Serving)
                | (_, Self::Stopped)
        )
    }
}

impl fmt::Display for ServeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Building => "building",
            Self::Serving => "serving",
            Self::Rebuilding => "rebuilding",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Rejected state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal serve state transition: {from} -> {to}")]
pub struct IllegalTransition {
    pub from: ServeState,
    pub to: ServeState,
}

/// Shared, lock-free holder of the current [`ServeState`].
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub const fn new() -> Self {
        Self(AtomicU8::new(ServeState::Idle as u8))
    }

    pub fn get(&self) -> ServeState {
        ServeState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if legal from the current state.
    pub fn transition(&self, next: ServeState) -> Result<ServeState, IllegalTransition> {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            let from = ServeState::from_u8(current);
            if !from.can_move_to(next) {
                return Err(IllegalTransition { from, to: next });
            }
            match self.0.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(from),
                Err(actual) => current = actual,
            }
        }
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SHUTDOWN state
// =============================================================================

/// Shutdown has been requested (Ctrl+C received)
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// HTTP server reference for graceful shutdown
static SERVER: OnceLock<Arc<Server>> = OnceLock::new();

/// Shutdown signal sender for actor system
static SHUTDOWN_TX: OnceLock<crossbeam::channel::Sender<()>> = OnceLock::new();

/// Setup the global Ctrl+C handler. Call once at program start.
///
/// Before `register_server()` the process exits right away; afterwards the
/// server is unblocked and the actors are notified.
pub fn setup_shutdown_handler() -> anyhow::Result<()> {
    ctrlc::set_handler(|| {
        SHUTDOWN.store(true, Ordering::SeqCst);

        if let Some(tx) = SHUTDOWN_TX.get() {
            let _ = tx.send(());
        }

        if let Some(server) = SERVER.get() {
            crate::log!("serve"; "shutting down...");
            server.unblock();
        } else {
            std::process::exit(130);
        }
    })
    .map_err(|e| anyhow::anyhow!("failed to set Ctrl+C handler: {}", e))
}

/// Register the HTTP server for graceful shutdown.
pub fn register_server(server: Arc<Server>, shutdown_tx: crossbeam::channel::Sender<()>) {
    let _ = SERVER.set(server);
    let _ = SHUTDOWN_TX.set(shutdown_tx);
}

/// Check if shutdown has been requested.
pub fn is_shutdown() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}
