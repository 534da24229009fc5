//! Configuration section definitions.
//!
//! Each module corresponds to a section in `packwright.toml`:
//!
//! | Module    | TOML Section            | Purpose                          |
//! |-----------|-------------------------|----------------------------------|
//! | `build`   | `[build]`               | Paths, entries, public path      |
//! | `resolve` | `[resolve]`             | Aliases, extensions, externals   |
//! | `style`   | `[assets]`, `[style]`   | Inline limit, preprocessor       |
//! | `serve`   | `[serve]`               | Development server               |

mod build;
mod resolve;
mod serve;
mod style;

pub use build::BuildSectionConfig;
pub use resolve::ResolveConfig;
pub use serve::ServeConfig;
pub use style::{AssetsConfig, DEFAULT_INLINE_LIMIT, StyleConfig};
