//! Output file naming.
//!
//! ```text
//! assets/js/<name>.<hash8>.js
//! assets/css/<name>.<hash8>.css        (imported by an entry)
//! assets/css/<name>.<hash8>.chunk.css  (imported elsewhere)
//! assets/images/<name>.<hash8>.<ext>
//! assets/fonts/<name>.<hash8>.<ext>
//! index.html
//! ```
//!
//! Names are a pure function of (logical name, content hash, mode,
//! category). Truncating the hash to 8 hex characters leaves 32 bits, so an
//! accidental collision between two different files with the same logical
//! name is negligible but possible; the artifact set rejects it instead of
//! overwriting.

use super::hash::ContentHash;
use crate::core::BuildMode;

/// Name of the emitted HTML document.
pub const ENTRY_DOCUMENT: &str = "index.html";

/// What is being named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category<'a> {
    Script,
    Stylesheet { entry: bool },
    Image { ext: &'a str },
    Font { ext: &'a str },
    EntryDocument,
}

/// Output path relative to the output directory, or `None` when the mode
/// emits no file for this category (stylesheets in development).
pub fn name(logical: &str, hash: &ContentHash, mode: BuildMode, category: Category<'_>) -> Option<String> {
    let hash = hash.short();
    match category {
        Category::Script => Some(format!("assets/js/{logical}.{hash}.js")),
        Category::Stylesheet { .. } if !mode.policy().extract_styles => None,
        Category::Stylesheet { entry } => {
            let suffix = if entry || !mode.policy().chunk_styles {
                "css"
            } else {
                "chunk.css"
            };
            Some(format!("assets/css/{logical}.{hash}.{suffix}"))
        }
        Category::Image { ext } => Some(format!("assets/images/{logical}.{hash}.{ext}")),
        Category::Font { ext } => Some(format!("assets/fonts/{logical}.{hash}.{ext}")),
        Category::EntryDocument => Some(ENTRY_DOCUMENT.to_string()),
    }
}
