//! Hot Reload Message Protocol
//!
//! JSON messages sent over WebSocket to the browser client.
//!
//! # Message Types
//!
//! - `reload`: full page reload
//! - `update`: re-import changed style modules in place
//! - `error` / `clear_error`: build failure overlay

use serde::{Deserialize, Serialize};

/// One module to re-import: its stable id and new URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleUpdate {
    pub id: String,
    pub url: String,
}

/// Hot reload message sent over WebSocket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HotReloadMessage {
    /// Full page reload
    Reload {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Hot module update; the client re-imports each URL
    Update { modules: Vec<ModuleUpdate> },

    /// Build error (display overlay, no reload)
    Error {
        /// Failing file or step
        path: String,
        error: String,
    },

    /// Clear error overlay (build succeeded after error)
    #[serde(rename = "clear_error")]
    ClearError,
}

impl HotReloadMessage {
    pub fn reload_with_reason(reason: impl Into<String>) -> Self {
        Self::Reload {
            reason: Some(reason.into()),
        }
    }

    pub fn update(modules: Vec<ModuleUpdate>) -> Self {
        Self::Update { modules }
    }

    pub fn error(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Error {
            path: path.into(),
            error: error.into(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"reload"}"#.to_string())
    }

    /// Parse from JSON string
    pub fn from_json(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }
}
