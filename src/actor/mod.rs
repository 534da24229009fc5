//! Actor System for the dev loop
//!
//! Message-passing concurrency for `serve`:
//!
//! ```text
//! FsActor --> BuilderActor --> WsActor
//! (watch)      (pipeline)     (broadcast)
//!                  |
//!                  v
//!              LiveSite <-- HTTP handlers
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `live` - Artifact set currently served, and the loop state
//! - `fs` - File system watcher with debouncing
//! - `builder` - Runs builds and plans client updates
//! - `ws` - WebSocket broadcast
//! - `coordinator` - Wires up and runs actors

pub mod builder;
pub mod coordinator;
pub mod fs;
pub mod live;
pub mod messages;
pub mod ws;

pub use coordinator::Coordinator;
pub use live::LiveSite;
