//! Naming, hashing and the in-memory artifact set.

pub mod artifact;
pub mod entry;
pub mod hash;
pub mod namer;

pub use artifact::{Artifact, ArtifactRole, ArtifactSet, OutputArtifact};
pub use entry::DocumentPlan;
pub use hash::ContentHash;
pub use namer::{Category, ENTRY_DOCUMENT};
