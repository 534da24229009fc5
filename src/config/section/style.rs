//! `[assets]` and `[style]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [assets]
//! inline_limit = 8192                 # Images up to this size become data URIs
//!
//! [style]
//! preprocessor = ["sass", "--stdin"]  # Command compiling .scss/.sass from stdin
//! ```

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

/// Image inlining threshold used by the original configuration.
pub const DEFAULT_INLINE_LIMIT: u64 = 8192;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Largest image size (bytes) inlined as a data URI.
    pub inline_limit: u64,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            inline_limit: DEFAULT_INLINE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Preprocessor command; the source is written to its stdin.
    pub preprocessor: Vec<String>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            preprocessor: vec!["sass".into(), "--stdin".into()],
        }
    }
}

impl StyleConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.preprocessor.first().is_none_or(|p| p.trim().is_empty()) {
            diag.error("style.preprocessor", "preprocessor command must not be empty");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};

    #[test]
    fn test_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.assets.inline_limit, 8192);
        assert_eq!(config.style.preprocessor, vec!["sass", "--stdin"]);
    }

    #[test]
    fn test_empty_preprocessor_rejected() {
        let config = test_parse_config("[style]\npreprocessor = []");
        let mut diag = ConfigDiagnostics::new();
        config.style.validate(&mut diag);
        assert!(diag.has_errors());
    }
}
