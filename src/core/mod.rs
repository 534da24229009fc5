//! Core types - pure abstractions shared across the codebase.

mod kind;
mod mode;
mod state;

pub use kind::SourceKind;
pub use mode::{BuildMode, ModePolicy};
pub use state::{ServeState, StateCell, is_shutdown, register_server, setup_shutdown_handler};
