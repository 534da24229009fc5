//! Source file classification.

use serde::Serialize;
use std::path::Path;

/// Kind of source file, determines the transform chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// `.js` `.jsx` `.mjs` `.ts` `.tsx`
    Script,
    /// `*.module.css`
    CssModule,
    /// `.scss` `.sass` `.css`
    Style,
    /// `.jpg` `.jpeg` `.png` `.gif`
    Image,
    /// `.woff` `.woff2` `.eot` `.ttf` `.otf`
    Font,
}

/// Suffix marking a CSS module, checked before plain style extensions.
///
/// Preprocessed files never become modules: `theme.module.scss` is a plain
/// style, the same way the sass rule claims it in a loader setup.
const MODULE_SUFFIX: &str = ".module.css";

impl SourceKind {
    /// All kinds, in transform order (leaf units first).
    pub const ALL: [Self; 5] = [
        Self::Image,
        Self::Font,
        Self::Style,
        Self::CssModule,
        Self::Script,
    ];

    /// Detect kind from a file extension (without the module suffix rule).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "js" | "jsx" | "mjs" | "ts" | "tsx" => Some(Self::Script),
            "scss" | "sass" | "css" => Some(Self::Style),
            "jpg" | "jpeg" | "png" | "gif" => Some(Self::Image),
            "woff" | "woff2" | "eot" | "ttf" | "otf" => Some(Self::Font),
            _ => None,
        }
    }

    /// Detect kind from a file path.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(MODULE_SUFFIX) {
            return Some(Self::CssModule);
        }
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Display name for this kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Script => "script",
            Self::CssModule => "css-module",
            Self::Style => "style",
            Self::Image => "image",
            Self::Font => "font",
        }
    }

    #[inline]
    pub fn is_style(self) -> bool {
        matches!(self, Self::Style | Self::CssModule)
    }

    /// Image or font: copied or inlined, never compiled.
    #[inline]
    pub fn is_asset(self) -> bool {
        matches!(self, Self::Image | Self::Font)
    }
}
