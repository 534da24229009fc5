//! `[resolve]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [resolve]
//! extensions = [".js", ".jsx", ".json"]   # Probed in order for extensionless imports
//! external_scopes = ["@babel"]            # `@scope/pkg` imports that are packages, not aliases
//!
//! [resolve.aliases]
//! "@components" = "src/components/"
//!
//! [resolve.externals]
//! react = "https://esm.sh/react@18"       # Added to the generated import map
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Alias prefix to directory (relative to project root).
    pub aliases: BTreeMap<String, PathBuf>,

    /// Extensions tried, in order, for imports without one.
    pub extensions: Vec<String>,

    /// Scoped package names that must not be treated as aliases.
    pub external_scopes: Vec<String>,

    /// Bare specifier to URL, emitted into the import map.
    pub externals: BTreeMap<String, String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        let aliases = ["components", "contexts", "hooks", "pages"]
            .into_iter()
            .map(|dir| (format!("@{dir}"), PathBuf::from(format!("src/{dir}/"))))
            .collect();
        Self {
            aliases,
            extensions: vec![".js".into(), ".jsx".into(), ".json".into()],
            external_scopes: Vec::new(),
            externals: BTreeMap::new(),
        }
    }
}

impl ResolveConfig {
    /// Make alias targets absolute against `root`.
    pub fn normalize(&mut self, root: &Path) {
        for target in self.aliases.values_mut() {
            *target = crate::utils::path::normalize_path(&root.join(&*target));
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        for alias in self.aliases.keys() {
            if alias.is_empty() || alias.contains('/') {
                diag.error(
                    "resolve.aliases",
                    format!("alias `{alias}` must be a single path segment"),
                );
            }
        }
        for ext in &self.extensions {
            if !ext.starts_with('.') {
                diag.error_with_hint(
                    "resolve.extensions",
                    format!("extension `{ext}` must start with a dot"),
                    format!("use `.{ext}`"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::{ConfigDiagnostics, test_parse_config};
    use std::path::PathBuf;

    #[test]
    fn test_default_aliases() {
        let config = test_parse_config("");
        let aliases = &config.resolve.aliases;
        assert_eq!(aliases.len(), 4);
        assert_eq!(aliases["@hooks"], PathBuf::from("src/hooks/"));
        assert_eq!(config.resolve.extensions, vec![".js", ".jsx", ".json"]);
    }

    #[test]
    fn test_custom_aliases_replace_defaults() {
        let config = test_parse_config("[resolve.aliases]\n\"@ui\" = \"lib/ui\"");
        assert_eq!(config.resolve.aliases.len(), 1);
        assert!(config.resolve.aliases.contains_key("@ui"));
    }

    #[test]
    fn test_validate_extensions() {
        let config = test_parse_config("[resolve]\nextensions = [\"js\"]");
        let mut diag = ConfigDiagnostics::new();
        config.resolve.validate(&mut diag);
        assert_eq!(diag.len(), 1);
    }
}
