//! Update plan: what the browser must do after a rebuild.
//!
//! Compares two artifact sets by (source, role). A rebuild whose only
//! differences are style-injector modules, assets and the entry document
//! can be applied in place, provided the document structure (its signature,
//! which leaves hashes out) is unchanged. Anything else reloads the page.

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::message::{HotReloadMessage, ModuleUpdate};
use crate::output::{ArtifactRole, ArtifactSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlan {
    /// Nothing the page loads changed.
    None,
    /// Re-import these modules.
    Update(Vec<ModuleUpdate>),
    /// Full reload, with the reason shown in the client console.
    Reload(String),
}

impl UpdatePlan {
    /// Plan for moving clients from `old` to `new`.
    pub fn between(old: &ArtifactSet, new: &ArtifactSet) -> Self {
        if old.signature() != new.signature() {
            return Self::Reload("document structure changed".into());
        }

        let before = old.by_source();
        let after = new.by_source();
        let keys: BTreeSet<(&PathBuf, ArtifactRole)> =
            before.keys().chain(after.keys()).copied().collect();

        let mut modules = Vec::new();
        for key in keys {
            let (old_meta, new_meta) = (before.get(&key), after.get(&key));
            if old_meta.map(|m| &m.output_path) == new_meta.map(|m| &m.output_path) {
                continue;
            }
            match key.1 {
                ArtifactRole::Document | ArtifactRole::Image | ArtifactRole::Font => {}
                ArtifactRole::StyleInjector => {
                    if let Some(meta) = new_meta
                        && let Some(id) = &meta.module_id
                        && let Some(url) = new.modules().get(id)
                    {
                        modules.push(ModuleUpdate {
                            id: id.clone(),
                            url: url.clone(),
                        });
                    }
                }
                ArtifactRole::Script | ArtifactRole::Stylesheet => {
                    return Self::Reload(format!("{} changed", key.0.display()));
                }
            }
        }

        if modules.is_empty() {
            Self::None
        } else {
            Self::Update(modules)
        }
    }

    /// Message to broadcast, if any.
    pub fn message(self) -> Option<HotReloadMessage> {
        match self {
            Self::None => None,
            Self::Update(modules) => Some(HotReloadMessage::update(modules)),
            Self::Reload(reason) => Some(HotReloadMessage::reload_with_reason(reason)),
        }
    }
}
