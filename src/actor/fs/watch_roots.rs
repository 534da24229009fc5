use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashSet;

use crate::config::ProjectConfig;

/// Watched roots, re-attached when a root is removed and recreated.
pub(super) struct WatchRoots {
    desired: Vec<PathBuf>,
    attached: FxHashSet<PathBuf>,
}

impl WatchRoots {
    pub(super) fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            desired: paths,
            attached: FxHashSet::default(),
        }
    }

    /// Source tree, alias targets outside it, the template and the config file.
    pub(super) fn for_project(config: &ProjectConfig) -> Self {
        let mut paths = vec![config.build.source.clone()];
        for target in config.resolve.aliases.values() {
            if !target.starts_with(&config.build.source) {
                paths.push(target.clone());
            }
        }
        if let Some(dir) = config.build.template.parent() {
            paths.push(dir.to_path_buf());
        }
        if !config.config_path.as_os_str().is_empty() {
            paths.push(config.config_path.clone());
        }

        paths.sort();
        paths.dedup();
        // nested roots are covered by their recursive parent
        let roots = paths
            .iter()
            .filter(|p| !paths.iter().any(|q| q != *p && p.starts_with(q)))
            .cloned()
            .collect();
        Self::new(roots)
    }

    pub(super) fn roots(&self) -> &[PathBuf] {
        &self.desired
    }

    pub(super) fn attach_existing(&mut self, watcher: &mut RecommendedWatcher) -> notify::Result<()> {
        for path in &self.desired {
            if !path.exists() {
                continue;
            }
            watcher.watch(path, mode_for(path))?;
            self.attached.insert(path.clone());
        }
        Ok(())
    }

    pub(super) fn maintain(&mut self, watcher: &mut RecommendedWatcher) {
        self.attached.retain(|path| path.exists());

        for path in &self.desired {
            if self.attached.contains(path) || !path.exists() {
                continue;
            }
            if watcher.watch(path, mode_for(path)).is_ok() {
                self.attached.insert(path.clone());
                crate::debug!("watch"; "re-attached {}", path.display());
            }
        }
    }
}

fn mode_for(path: &std::path::Path) -> RecursiveMode {
    if path.is_dir() {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    }
}
