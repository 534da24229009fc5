//! Emitted artifacts of one build.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use super::hash::ContentHash;
use crate::pipeline::BuildError;

/// What an artifact is for the document and the dev server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactRole {
    Document,
    Script,
    StyleInjector,
    Stylesheet,
    Image,
    Font,
}

/// Naming record of one emitted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputArtifact {
    pub source_path: PathBuf,
    /// Relative to the output directory, `/`-separated.
    pub output_path: String,
    pub content_hash: ContentHash,
    pub role: ArtifactRole,
    /// Import-map key, for modules.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

/// Naming record plus the bytes to write.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub meta: OutputArtifact,
    pub bytes: Arc<[u8]>,
}

/// Every file of one build, keyed by output path.
///
/// Built in memory, committed to disk in one pass, and swapped as a whole
/// by the dev server.
#[derive(Debug, Clone, Default)]
pub struct ArtifactSet {
    files: BTreeMap<String, Artifact>,
    /// Module id to public URL.
    modules: BTreeMap<String, String>,
    /// Document structure without hashes; see [`super::entry::DocumentPlan`].
    signature: Vec<String>,
}

impl ArtifactSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one file.
    ///
    /// Equal bytes under the same path are shared by both sources; a second
    /// source with different bytes is a collision.
    pub fn insert(&mut self, meta: OutputArtifact, bytes: Vec<u8>) -> Result<(), BuildError> {
        if let Some(existing) = self.files.get(&meta.output_path) {
            if existing.meta.content_hash == meta.content_hash
                && existing.meta.role == meta.role
                && *existing.bytes == *bytes
            {
                return Ok(());
            }
            return Err(BuildError::NamingCollision {
                output: meta.output_path,
                first: existing.meta.source_path.clone(),
                second: meta.source_path,
            });
        }
        self.files.insert(
            meta.output_path.clone(),
            Artifact {
                meta,
                bytes: bytes.into(),
            },
        );
        Ok(())
    }

    pub fn register_module(&mut self, id: String, url: String) {
        self.modules.insert(id, url);
    }

    pub fn set_signature(&mut self, signature: Vec<String>) {
        self.signature = signature;
    }

    #[inline]
    pub fn get(&self, output_path: &str) -> Option<&Artifact> {
        self.files.get(output_path)
    }

    /// All artifacts, sorted by output path.
    pub fn iter(&self) -> impl Iterator<Item = &Artifact> {
        self.files.values()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn modules(&self) -> &BTreeMap<String, String> {
        &self.modules
    }

    pub fn signature(&self) -> &[String] {
        &self.signature
    }

    /// Artifact produced from `source` in the given role.
    pub fn by_source(&self) -> BTreeMap<(&PathBuf, ArtifactRole), &OutputArtifact> {
        self.files
            .values()
            .map(|a| ((&a.meta.source_path, a.meta.role), &a.meta))
            .collect()
    }

    pub fn count(&self, role: ArtifactRole) -> usize {
        self.files.values().filter(|a| a.meta.role == role).count()
    }

    pub fn total_bytes(&self) -> usize {
        self.files.values().map(|a| a.bytes.len()).sum()
    }
}
