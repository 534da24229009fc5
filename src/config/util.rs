//! Configuration utility functions.

use std::path::{Path, PathBuf};

/// Check that an import-map target is usable by a browser.
///
/// Accepts absolute URLs (`https://esm.sh/react`) and root-relative paths
/// (`/vendor/react.js`). Root-relative paths are parsed against a dummy base
/// so that malformed escapes are still rejected.
pub fn is_import_map_target(target: &str) -> bool {
    if target.starts_with('/') {
        return url::Url::parse("http://localhost")
            .and_then(|base| base.join(target))
            .is_ok();
    }
    url::Url::parse(target).is_ok_and(|u| !u.cannot_be_a_base())
}

/// Find config file by searching upward from `start`.
///
/// Walks up parent directories until finding `config_name`.
/// Returns the absolute path to the config file if found.
///
/// # Example
/// ```text
/// /home/user/app/src/components/   ← start
/// /home/user/app/packwright.toml   ← found!
/// ```
pub fn find_config_file(start: &Path, config_name: &Path) -> Option<PathBuf> {
    if config_name.is_absolute() {
        return config_name.exists().then(|| config_name.to_path_buf());
    }

    let mut current = start;
    loop {
        let candidate = current.join(config_name);
        if candidate.exists() {
            return Some(candidate);
        }
        current = current.parent()?;
    }
}

// ============================================================================
// tests
// ============================================================================
