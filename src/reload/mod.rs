//! Reload Module
//!
//! WebSocket-based live reload for the dev server.
//!
//! # Modules
//!
//! - `message` - Hot reload message types (reload, update, error)
//! - `plan` - Update plan computed from two artifact sets
//! - `server` - WebSocket acceptor for client connections

pub mod message;
pub mod plan;
pub mod server;
