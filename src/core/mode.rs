//! Build mode and the policy table keyed by it.
//!
//! Every mode-conditional decision in the pipeline reads a field of
//! [`ModePolicy`] instead of testing the mode inline.

use serde::Serialize;
use std::fmt;

/// Development / production switch, fixed for the whole build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Fast iteration: runtime style injection, live reload.
    Development,
    /// Deployable output: extracted and minified stylesheets.
    Production,
}

impl BuildMode {
    /// Check if this is development mode.
    #[inline]
    pub const fn is_dev(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Lowercase name, also used as `NODE_ENV`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    /// Policy row for this mode.
    #[inline]
    pub const fn policy(self) -> &'static ModePolicy {
        match self {
            Self::Development => &ModePolicy::DEVELOPMENT,
            Self::Production => &ModePolicy::PRODUCTION,
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mode-conditional decisions of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModePolicy {
    /// Write stylesheets as separate artifacts instead of injecting at runtime.
    pub extract_styles: bool,

    /// Name stylesheets not imported by an entry with the chunk template.
    pub chunk_styles: bool,

    /// Run the parallel stylesheet minifier.
    pub minify_styles: bool,

    /// Append `//# sourceURL=` comments to compiled scripts.
    pub source_url_comments: bool,

    /// Inject the live-reload client into served documents.
    pub live_reload: bool,

    /// Environment name passed to the script compiler.
    pub env_name: &'static str,
}

impl ModePolicy {
    /// Production: extracted, minified, no dev metadata.
    pub const PRODUCTION: Self = Self {
        extract_styles: true,
        chunk_styles: true,
        minify_styles: true,
        source_url_comments: false,
        live_reload: false,
        env_name: "production",
    };

    /// Development: injected styles, live reload.
    pub const DEVELOPMENT: Self = Self {
        extract_styles: false,
        chunk_styles: false,
        minify_styles: false,
        source_url_comments: true,
        live_reload: true,
        env_name: "development",
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_branch_is_exclusive() {
        assert!(BuildMode::Production.policy().extract_styles);
        assert!(!BuildMode::Development.policy().extract_styles);
    }

    #[test]
    fn test_optimizer_only_in_production() {
        assert!(BuildMode::Production.policy().minify_styles);
        assert!(!BuildMode::Development.policy().minify_styles);
    }

    #[test]
    fn test_env_name_matches_mode_name() {
        for mode in [BuildMode::Development, BuildMode::Production] {
            assert_eq!(mode.policy().env_name, mode.name());
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(BuildMode::Production.to_string(), "production");
        assert!(BuildMode::Development.is_dev());
    }
}
