//! Project configuration management for `packwright.toml`.
//!
//! # Module Structure
//!
//! ```text
//! config/
//! ├── section/       # Configuration section definitions
//! │   ├── build      # [build]
//! │   ├── resolve    # [resolve]
//! │   ├── style      # [assets], [style]
//! │   └── serve      # [serve]
//! ├── types/         # ConfigError, ConfigDiagnostics
//! └── mod.rs         # ProjectConfig (this file)
//! ```
//!
//! The configuration is built once per invocation and passed explicitly to
//! every component. Nothing downstream reads the process environment or the
//! working directory.

pub mod section;
pub mod types;
mod util;

pub use section::{
    AssetsConfig, BuildSectionConfig, DEFAULT_INLINE_LIMIT, ResolveConfig, ServeConfig,
    StyleConfig,
};
pub use types::{ConfigDiagnostics, ConfigError};
pub use util::is_import_map_target;

use crate::{
    cli::{BuildArgs, Cli, Commands},
    debug, log,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use util::find_config_file;

// ============================================================================
// root configuration
// ============================================================================

/// Root configuration structure representing packwright.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// CLI arguments reference (internal use only)
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (internal use only)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Project root directory - parent of config file (internal use only)
    #[serde(skip)]
    pub root: PathBuf,

    /// Paths, entries, public path
    #[serde(default)]
    pub build: BuildSectionConfig,

    /// Import aliases and externals
    #[serde(default)]
    pub resolve: ResolveConfig,

    /// Image inlining
    #[serde(default)]
    pub assets: AssetsConfig,

    /// Stylesheet preprocessing
    #[serde(default)]
    pub style: StyleConfig,

    /// Extra environment bindings substituted into scripts
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            cli: None,
            config_path: PathBuf::new(),
            root: PathBuf::new(),
            build: BuildSectionConfig::default(),
            resolve: ResolveConfig::default(),
            assets: AssetsConfig::default(),
            style: StyleConfig::default(),
            env: BTreeMap::new(),
            serve: ServeConfig::default(),
        }
    }
}

impl ProjectConfig {
    /// Load configuration from CLI arguments.
    ///
    /// Searches upward from cwd for the config file. The project root is the
    /// config file's parent directory, or cwd when no file exists.
    pub fn load(cli: &'static Cli) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current working directory")?;

        let (mut config, root) = match find_config_file(&cwd, &cli.config) {
            Some(path) => {
                let mut config = Self::from_path(&path)?;
                let root = path.parent().map(Path::to_path_buf).unwrap_or(cwd);
                config.config_path = path;
                (config, root)
            }
            None => {
                debug!("config"; "no {} found, using defaults", cli.config.display());
                (Self::default(), cwd)
            }
        };

        config.cli = Some(cli);
        config.apply_command_options(cli);
        config.finalize(&root);
        if cli.build_args().is_some() {
            config.validate()?;
        }

        Ok(config)
    }

    /// Re-read the config file with the same CLI overrides.
    pub fn reload(&self) -> Result<Self> {
        let cli = self
            .cli
            .ok_or_else(|| anyhow::anyhow!("config was not loaded from the command line"))?;
        Self::load(cli)
    }

    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path with unknown field detection.
    fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;

        let (config, ignored) = Self::parse_with_ignored(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        if !ignored.is_empty() {
            Self::print_unknown_fields_warning(&ignored, path);
        }

        Ok(config)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>)> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })
        .map_err(ConfigError::Toml)?;
        Ok((config, ignored))
    }

    /// Print warning about unknown fields.
    fn print_unknown_fields_warning(fields: &[String], path: &Path) {
        let display_path = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        log!("warning"; "unknown fields in {}, ignoring:", display_path);
        for field in fields {
            eprintln!("- {}", field);
        }
    }

    /// Get path relative to the project root
    pub fn root_relative(&self, path: impl AsRef<Path>) -> PathBuf {
        path.as_ref()
            .strip_prefix(&self.root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.as_ref().to_path_buf())
    }

    // ========================================================================
    // cli configuration updates
    // ========================================================================

    /// Apply command-specific configuration options.
    fn apply_command_options(&mut self, cli: &Cli) {
        Self::update_option(&mut self.build.source, cli.source.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        match &cli.command {
            Commands::Build { build_args } => self.apply_build_args(build_args),
            Commands::Serve {
                build_args,
                interface,
                port,
                strict_port,
                watch,
            } => {
                self.apply_build_args(build_args);
                Self::update_option(&mut self.serve.interface, interface.as_ref());
                Self::update_option(&mut self.serve.port, port.as_ref());
                Self::update_option(&mut self.serve.watch, watch.as_ref());
                self.serve.strict_port |= *strict_port;
            }
            Commands::Inspect { .. } => {}
        }
    }

    /// Apply build arguments from CLI.
    fn apply_build_args(&mut self, args: &BuildArgs) {
        crate::logger::set_verbose(args.verbose);

        for (key, value) in &args.env {
            self.env.insert(key.clone(), value.clone());
        }
    }

    /// Update config option if CLI value is provided.
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    // ========================================================================
    // path normalization
    // ========================================================================

    /// Set the root and make every configured path absolute against it.
    pub fn finalize(&mut self, root: &Path) {
        let root = crate::utils::path::normalize_path(root);
        self.build.normalize(&root);
        self.resolve.normalize(&root);
        self.root = root;
    }

    // ========================================================================
    // validation
    // ========================================================================

    /// Validate configuration, collecting all errors at once.
    pub fn validate(&self) -> Result<()> {
        let mut diag = ConfigDiagnostics::new();

        self.build.validate(&self.root, &mut diag);
        self.resolve.validate(&mut diag);
        self.style.validate(&mut diag);

        for (specifier, target) in &self.resolve.externals {
            if !is_import_map_target(target) {
                diag.error(
                    "resolve.externals",
                    format!("`{specifier}` maps to `{target}`, which is not a URL"),
                );
            }
        }
        for key in self.env.keys() {
            if key == "NODE_ENV" {
                diag.error_with_hint(
                    "env",
                    "NODE_ENV is derived from the build mode",
                    "use `--mode development|production` instead",
                );
            }
        }

        diag.into_result()
            .map_err(|e| ConfigError::Diagnostics(e).into())
    }
}

// ============================================================================
// Test Helpers (available to all modules via `use crate::config::test_*`)
// ============================================================================

/// Parse config, panicking on unknown fields (to catch typos in tests).
#[cfg(test)]
pub fn test_parse_config(content: &str) -> ProjectConfig {
    let (parsed, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}

/// Default config rooted at `root`, with every path normalized.
#[cfg(test)]
pub fn test_config_at(root: &Path) -> ProjectConfig {
    let mut config = ProjectConfig::default();
    config.finalize(root);
    config
}

// ============================================================================
// tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str_invalid_toml() {
        assert!(ProjectConfig::from_str("[build\nsource = \"src\"").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = ProjectConfig::default();
        assert!(config.cli.is_none());
        assert_eq!(config.serve.port, 4000);
        assert_eq!(config.assets.inline_limit, DEFAULT_INLINE_LIMIT);
        assert!(config.env.is_empty());
    }

    #[test]
    fn test_unknown_fields_detected() {
        let content = "[build]\nsource = \"app\"\n[unknown_section]\nfield = \"value\"";
        let (config, ignored) = ProjectConfig::parse_with_ignored(content).unwrap();

        assert_eq!(config.build.source, PathBuf::from("app"));
        assert!(ignored.iter().any(|f| f.contains("unknown_section")));
    }

    #[test]
    fn test_env_section() {
        let config = test_parse_config("[env]\nAPI_URL = \"https://api.example.com\"");
        assert_eq!(config.env["API_URL"], "https://api.example.com");
    }

    #[test]
    fn test_validate_rejects_node_env_override() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.js"), "").unwrap();

        let mut config = test_config_at(dir.path());
        assert!(config.validate().is_ok());

        config.env.insert("NODE_ENV".into(), "test".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("NODE_ENV"));
    }

    #[test]
    fn test_validate_reports_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config_at(dir.path());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("entry `main` not found"));
    }

    #[test]
    fn test_root_relative() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config_at(dir.path());
        let file = config.root.join("src/index.js");
        assert_eq!(config.root_relative(&file), PathBuf::from("src/index.js"));
    }
}
