//! Stylesheet minification for production builds.
//!
//! Uses lightningcss. Scripts are not minified.

use anyhow::{Result, bail};
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};

/// Minify CSS source code.
pub fn minify_css(source: &str, filename: &str) -> Result<String> {
    let options = ParserOptions {
        filename: filename.to_string(),
        ..ParserOptions::default()
    };
    let mut stylesheet = match StyleSheet::parse(source, options) {
        Ok(sheet) => sheet,
        Err(e) => bail!("{e}"),
    };
    if let Err(e) = stylesheet.minify(MinifyOptions::default()) {
        bail!("{e}");
    }
    match stylesheet.to_css(PrinterOptions {
        minify: true,
        ..PrinterOptions::default()
    }) {
        Ok(result) => Ok(result.code),
        Err(e) => bail!("{e}"),
    }
}
