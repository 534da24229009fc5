use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;

use super::types::ChangeKind;
use crate::utils::path::normalize_path;

pub(super) const DEBOUNCE_MS: u64 = 300;

/// Collects notify events until the tree has been quiet for [`DEBOUNCE_MS`].
pub(super) struct Debouncer {
    pub(super) changes: FxHashMap<PathBuf, ChangeKind>,
    pub(super) last_event: Option<Instant>,
}

impl Debouncer {
    pub(super) fn new() -> Self {
        Self {
            changes: FxHashMap::default(),
            last_event: None,
        }
    }

    /// Record a notify event. Later events on a path refine earlier ones:
    /// removed then recreated is a modification, created then removed
    /// cancels out, anything then removed is a removal.
    pub(super) fn add_event(&mut self, event: &notify::Event) {
        use notify::EventKind;

        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            // metadata-only changes (touch, chmod) never alter build input
            EventKind::Modify(notify::event::ModifyKind::Metadata(_)) => return,
            EventKind::Modify(_) => ChangeKind::Modified,
            _ => return,
        };

        for path in &event.paths {
            if is_editor_artifact(path) {
                continue;
            }
            let path = normalize_path(path);
            let merged = match (self.changes.get(&path).copied(), kind) {
                (None, kind) => Some(kind),
                (Some(ChangeKind::Created), ChangeKind::Removed) => None,
                (Some(ChangeKind::Removed), ChangeKind::Created | ChangeKind::Modified) => {
                    Some(ChangeKind::Modified)
                }
                (Some(_), ChangeKind::Removed) => Some(ChangeKind::Removed),
                (Some(existing), _) => Some(existing),
            };
            crate::debug!("watch"; "{}: {}", kind.label(), path.display());
            match merged {
                Some(kind) => self.changes.insert(path, kind),
                None => self.changes.remove(&path),
            };
            self.last_event = Some(Instant::now());
        }
    }

    /// Drain the collected changes once the quiet period has passed.
    pub(super) fn take_if_ready(&mut self) -> Option<FxHashMap<PathBuf, ChangeKind>> {
        let quiet = self
            .last_event
            .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS));
        if !quiet {
            return None;
        }
        self.last_event = None;
        let changes = std::mem::take(&mut self.changes);
        (!changes.is_empty()).then_some(changes)
    }

    /// Time until [`take_if_ready`](Self::take_if_ready) may succeed.
    pub(super) fn sleep_duration(&self) -> Duration {
        match self.last_event {
            Some(t) => Duration::from_millis(DEBOUNCE_MS)
                .saturating_sub(t.elapsed())
                .max(Duration::from_millis(1)),
            None => Duration::from_secs(3600),
        }
    }
}

/// Swap files, backups and dotfiles written by editors.
fn is_editor_artifact(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bak" | "swp" | "swo" | "swx" | "tmp")
        || name.ends_with('~')
        || name.starts_with(".#")
        || (name.starts_with('.') && name != ".env")
}
