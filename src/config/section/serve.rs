//! `[serve]` section configuration.
//!
//! Contains development server settings.
//!
//! # Example
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 4000                 # HTTP port number
//! ws_port = 35729             # Live update channel port
//! watch = true                # Auto-rebuild on file changes
//! hot = true                  # Apply style updates without a reload
//! compress = true             # gzip responses when the client accepts it
//! history_fallback = true     # Serve index.html for client-side routes
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr};

use serde::{Deserialize, Serialize};

/// Development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,

    /// HTTP port number.
    pub port: u16,

    /// Do not fall back to the next free port.
    pub strict_port: bool,

    /// WebSocket port of the live update channel.
    pub ws_port: u16,

    /// Enable file watcher for live reload.
    pub watch: bool,

    /// Hot-apply style updates instead of reloading.
    pub hot: bool,

    /// gzip-compress responses.
    pub compress: bool,

    /// Answer unmatched routes with the entry document.
    pub history_fallback: bool,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 4000,
            strict_port: false,
            ws_port: 35729,
            watch: true,
            hot: true,
            compress: true,
            history_fallback: true,
        }
    }
}
