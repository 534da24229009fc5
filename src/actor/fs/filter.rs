use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::types::{ChangeKind, ChangeSet};
use crate::config::ProjectConfig;

/// Decides which changed paths are build input.
///
/// The output and secondary directories are written by the build itself
/// and are never input; directories on their own carry no content.
pub(super) struct ChangeFilter {
    config_path: PathBuf,
    ignored: Vec<PathBuf>,
}

impl ChangeFilter {
    pub(super) fn new(config: &ProjectConfig) -> Self {
        let mut ignored = vec![config.build.output.clone()];
        ignored.extend(config.build.clean.iter().cloned());
        ignored.push(config.root.join("node_modules"));
        Self {
            config_path: config.config_path.clone(),
            ignored,
        }
    }

    pub(super) fn apply(&self, raw: FxHashMap<PathBuf, ChangeKind>) -> ChangeSet {
        let mut set = ChangeSet::default();
        let mut changes: Vec<_> = raw
            .into_iter()
            .filter(|(path, _)| !self.is_ignored(path))
            .filter(|(path, kind)| *kind == ChangeKind::Removed || !path.is_dir())
            .collect();
        changes.sort();

        set.config_changed = changes
            .iter()
            .any(|(path, _)| !self.config_path.as_os_str().is_empty() && path == &self.config_path);
        set.changes = changes;
        set
    }

    fn is_ignored(&self, path: &Path) -> bool {
        self.ignored.iter().any(|dir| path.starts_with(dir))
    }
}
