//! Image and font steps.

use anyhow::Result;
use base64::{Engine as _, engine::general_purpose::STANDARD};

use super::{Emission, TransformStep, Unit};
use crate::config::DEFAULT_INLINE_LIMIT;
use crate::utils::mime;

/// `inline-or-copy`: data URI when `len <= limit`, hashed copy otherwise.
pub fn inline_or_copy(unit: &mut Unit, step: &TransformStep) -> Result<()> {
    let limit = step.int("limit").unwrap_or(DEFAULT_INLINE_LIMIT);
    unit.emission = if unit.bytes.len() as u64 <= limit {
        Emission::Inline(data_uri(&unit.bytes, mime::essence(mime::from_path(&unit.source))))
    } else {
        Emission::File
    };
    Ok(())
}

/// `copy-hashed`: always a hashed copy.
pub fn copy_hashed(unit: &mut Unit) {
    unit.emission = Emission::File;
}

pub fn data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetsConfig;
    use crate::core::{BuildMode, SourceKind};
    use crate::transform::select;

    fn image(len: usize) -> Unit {
        Unit::new("src/logo.png".into(), SourceKind::Image, vec![7; len])
    }

    #[test]
    fn test_inline_boundary() {
        let chain = select(SourceKind::Image, BuildMode::Production, &AssetsConfig::default());
        let step = &chain.steps[0];

        let mut at_limit = image(8192);
        inline_or_copy(&mut at_limit, step).unwrap();
        match &at_limit.emission {
            Emission::Inline(uri) => assert!(uri.starts_with("data:image/png;base64,")),
            other => panic!("expected inline, got {other:?}"),
        }

        let mut over = image(8193);
        inline_or_copy(&mut over, step).unwrap();
        assert_eq!(over.emission, Emission::File);
    }

    #[test]
    fn test_fonts_are_never_inlined() {
        let mut font = Unit::new("src/a.woff2".into(), SourceKind::Font, vec![0; 10]);
        copy_hashed(&mut font);
        assert_eq!(font.emission, Emission::File);
    }

    #[test]
    fn test_data_uri() {
        assert_eq!(data_uri(b"hi", "image/gif"), "data:image/gif;base64,aGk=");
    }
}
