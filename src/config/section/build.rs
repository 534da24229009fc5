//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! source = "src"                    # Source tree (relative to project root)
//! output = "dist"                   # Bundle output directory
//! clean = ["build"]                 # Secondary directories emptied before each build
//! template = "public/index.html"    # HTML shell for the entry document
//! public_path = "/"                 # URL prefix of emitted assets
//!
//! [build.entries]
//! main = "index.js"                 # Entry scripts (relative to source)
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ConfigDiagnostics;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildSectionConfig {
    /// Source tree root.
    pub source: PathBuf,

    /// Bundle output directory.
    pub output: PathBuf,

    /// Secondary directories removed together with the output.
    pub clean: Vec<PathBuf>,

    /// HTML shell for `index.html`. A built-in shell is used when missing.
    pub template: PathBuf,

    /// URL prefix of every emitted reference.
    pub public_path: String,

    /// Entry name to entry script (relative to `source`).
    pub entries: BTreeMap<String, PathBuf>,
}

impl Default for BuildSectionConfig {
    fn default() -> Self {
        Self {
            source: "src".into(),
            output: "dist".into(),
            clean: vec!["build".into()],
            template: "public/index.html".into(),
            public_path: "/".into(),
            entries: BTreeMap::from([("main".to_string(), PathBuf::from("index.js"))]),
        }
    }
}

impl BuildSectionConfig {
    /// Make every path absolute against `root`.
    pub fn normalize(&mut self, root: &Path) {
        use crate::utils::path::normalize_path;

        self.source = normalize_path(&root.join(&self.source));
        self.output = normalize_path(&root.join(&self.output));
        self.template = normalize_path(&root.join(&self.template));
        self.clean = self
            .clean
            .iter()
            .map(|p| normalize_path(&root.join(p)))
            .collect();
        for entry in self.entries.values_mut() {
            *entry = normalize_path(&self.source.join(&*entry));
        }
        if !self.public_path.ends_with('/') {
            self.public_path.push('/');
        }
    }

    /// Validate build configuration.
    pub fn validate(&self, root: &Path, diag: &mut ConfigDiagnostics) {
        if self.entries.is_empty() {
            diag.error("build.entries", "at least one entry script is required");
        }
        for (name, path) in &self.entries {
            if !path.is_file() {
                diag.error_with_hint(
                    "build.entries",
                    format!("entry `{name}` not found: {}", path.display()),
                    "entry paths are relative to `build.source`",
                );
            }
        }
        if self.output == root || self.source.starts_with(&self.output) {
            diag.error(
                "build.output",
                "output directory must not contain the project root or the source tree",
            );
        }
        for dir in &self.clean {
            if dir == root || self.source.starts_with(dir) {
                diag.error(
                    "build.clean",
                    format!("refusing to clean `{}`", dir.display()),
                );
            }
        }
        if !self.public_path.starts_with('/') && !self.public_path.contains("://") {
            diag.error_with_hint(
                "build.public_path",
                "public path must be absolute",
                "use `/` or a full URL such as `https://cdn.example.com/`",
            );
        }
    }
}
