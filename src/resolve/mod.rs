//! Alias expansion and import specifier resolution.
//!
//! - [`PathResolver`] maps a registered alias to its base directory.
//! - [`ImportResolver`] turns an import specifier into a local file,
//!   probing extensions and directory indexes, or marks it external.
//! - [`imports`] finds import statements in script source.
//! - [`graph`] links the classified files through their imports.

pub mod graph;
pub mod imports;

pub use graph::{Import, ImportTarget, ModuleGraph, ModuleNode};
pub use imports::{ImportKind, ImportStatement, ScanError, scan_imports, script_source_type};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ResolveConfig;
use crate::utils::path::lexical_normalize;

/// Alias lookup failed: the alias is not registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown alias `{alias}`")]
pub struct UnknownAliasError {
    pub alias: String,
}

/// Registered alias table. Pure lookups, no filesystem access.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    aliases: BTreeMap<String, PathBuf>,
}

impl PathResolver {
    pub fn new(aliases: BTreeMap<String, PathBuf>) -> Self {
        Self { aliases }
    }

    /// Return `base(alias) + suffix`.
    pub fn resolve(&self, alias: &str, suffix: &str) -> Result<PathBuf, UnknownAliasError> {
        let base = self.aliases.get(alias).ok_or_else(|| UnknownAliasError {
            alias: alias.to_string(),
        })?;
        let suffix = suffix.trim_start_matches('/');
        if suffix.is_empty() {
            Ok(base.clone())
        } else {
            Ok(base.join(suffix))
        }
    }

    #[inline]
    pub fn contains(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }
}

/// Outcome of resolving one specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// A file inside the project.
    Local(PathBuf),
    /// Left to the browser (bare package, absolute URL path, remote URL).
    External,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    UnknownAlias(#[from] UnknownAliasError),

    #[error("cannot resolve `{specifier}` (tried {})", format_tried(tried))]
    NotFound {
        specifier: String,
        tried: Vec<PathBuf>,
    },
}

fn format_tried(tried: &[PathBuf]) -> String {
    tried
        .iter()
        .map(|p| format!("`{}`", p.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Specifier resolution for script imports.
#[derive(Debug, Clone)]
pub struct ImportResolver {
    aliases: PathResolver,
    extensions: Vec<String>,
    external_scopes: Vec<String>,
}

impl ImportResolver {
    /// Build from a normalized `[resolve]` section.
    pub fn from_config(config: &ResolveConfig) -> Self {
        Self {
            aliases: PathResolver::new(config.aliases.clone()),
            extensions: config.extensions.clone(),
            external_scopes: config.external_scopes.clone(),
        }
    }

    /// Resolve `specifier` as written in `importer`.
    pub fn resolve(&self, importer: &Path, specifier: &str) -> Result<Resolved, ResolveError> {
        if is_relative(specifier) {
            let dir = importer.parent().unwrap_or(Path::new(""));
            let base = lexical_normalize(&dir.join(specifier));
            return self.find_file(specifier, &base).map(Resolved::Local);
        }

        if is_external(specifier) {
            return Ok(Resolved::External);
        }

        let (head, rest) = specifier.split_once('/').unwrap_or((specifier, ""));
        if self.aliases.contains(head) {
            let base = self.aliases.resolve(head, rest)?;
            return self.find_file(specifier, &base).map(Resolved::Local);
        }

        // `@scope/pkg` is an npm package only when the scope is declared
        if head.starts_with('@') && !self.external_scopes.iter().any(|s| s == head) {
            return Err(UnknownAliasError {
                alias: head.to_string(),
            }
            .into());
        }

        Ok(Resolved::External)
    }

    /// Exact file, then each extension appended, then `index` + extension.
    fn find_file(&self, specifier: &str, base: &Path) -> Result<PathBuf, ResolveError> {
        let mut tried = Vec::with_capacity(1 + self.extensions.len() * 2);

        if base.is_file() {
            return Ok(base.to_path_buf());
        }
        tried.push(base.to_path_buf());

        for ext in &self.extensions {
            let mut candidate = base.as_os_str().to_owned();
            candidate.push(ext);
            let candidate = PathBuf::from(candidate);
            if candidate.is_file() {
                return Ok(candidate);
            }
            tried.push(candidate);
        }

        for ext in &self.extensions {
            let candidate = base.join(format!("index{ext}"));
            if candidate.is_file() {
                return Ok(candidate);
            }
            tried.push(candidate);
        }

        Err(ResolveError::NotFound {
            specifier: specifier.to_string(),
            tried,
        })
    }
}

#[inline]
fn is_relative(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Absolute URL paths and URLs with a scheme are never local.
fn is_external(specifier: &str) -> bool {
    specifier.starts_with('/')
        || specifier.starts_with("data:")
        || specifier.starts_with("http://")
        || specifier.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn resolver_at(root: &Path) -> ImportResolver {
        let mut config = ResolveConfig::default();
        config.normalize(root);
        ImportResolver::from_config(&config)
    }

    #[test]
    fn test_resolve_alias_is_pure() {
        let resolver = PathResolver::new(BTreeMap::from([(
            "@components".to_string(),
            PathBuf::from("/p/src/components"),
        )]));

        let first = resolver.resolve("@components", "Button").unwrap();
        let second = resolver.resolve("@components", "Button").unwrap();
        assert_eq!(first, PathBuf::from("/p/src/components/Button"));
        assert_eq!(first, second);

        assert_eq!(
            resolver.resolve("@components", "").unwrap(),
            PathBuf::from("/p/src/components")
        );
    }

    #[test]
    fn test_unknown_alias() {
        let resolver = PathResolver::default();
        let err = resolver.resolve("@unknown", "x").unwrap_err();
        assert_eq!(err.alias, "@unknown");
        assert_eq!(err.to_string(), "unknown alias `@unknown`");
    }

    #[test]
    fn test_extension_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("src/components/Button")).unwrap();
        fs::write(root.join("src/components/Button/index.jsx"), "").unwrap();
        fs::write(root.join("src/util.js"), "").unwrap();
        fs::write(root.join("src/data.json"), "{}").unwrap();

        let resolver = resolver_at(root);
        let importer = root.join("src/index.js");

        assert_eq!(
            resolver.resolve(&importer, "./util").unwrap(),
            Resolved::Local(root.join("src/util.js"))
        );
        assert_eq!(
            resolver.resolve(&importer, "./data.json").unwrap(),
            Resolved::Local(root.join("src/data.json"))
        );
        assert_eq!(
            resolver.resolve(&importer, "@components/Button").unwrap(),
            Resolved::Local(root.join("src/components/Button/index.jsx"))
        );
    }

    #[test]
    fn test_not_found_lists_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = resolver_at(dir.path());
        let importer = dir.path().join("src/index.js");

        let err = resolver.resolve(&importer, "./missing").unwrap_err();
        match err {
            ResolveError::NotFound { tried, .. } => {
                assert_eq!(tried.len(), 7);
                assert!(tried[1].ends_with("missing.js"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_scoped_packages() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ResolveConfig::default();
        config.external_scopes.push("@emotion".into());
        config.normalize(dir.path());
        let resolver = ImportResolver::from_config(&config);
        let importer = dir.path().join("src/index.js");

        assert_eq!(
            resolver.resolve(&importer, "@emotion/react").unwrap(),
            Resolved::External
        );
        assert!(matches!(
            resolver.resolve(&importer, "@utils/format"),
            Err(ResolveError::UnknownAlias(_))
        ));
        assert_eq!(resolver.resolve(&importer, "react").unwrap(), Resolved::External);
        assert_eq!(
            resolver.resolve(&importer, "https://esm.sh/react").unwrap(),
            Resolved::External
        );
    }
}
