use std::path::PathBuf;

/// What happened to a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum ChangeKind {
    Created,
    Modified,
    Removed,
}

impl ChangeKind {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Removed => "removed",
        }
    }
}

/// Debounced changes that warrant a rebuild.
#[derive(Debug, Default)]
pub(super) struct ChangeSet {
    /// Sorted by path.
    pub(super) changes: Vec<(PathBuf, ChangeKind)>,
    /// The project config file is among the changes.
    pub(super) config_changed: bool,
}

impl ChangeSet {
    pub(super) fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub(super) fn paths(&self) -> Vec<PathBuf> {
        self.changes.iter().map(|(p, _)| p.clone()).collect()
    }
}
