//! Stylesheet steps.
//!
//! Application order for plain styles:
//!
//! ```text
//! compile-preprocessor -> rewrite-urls -> resolve-imports -> emit-style
//! ```
//!
//! `resolve-imports` runs the `import_loaders` steps before it on every
//! inlined file, so imported files get the same preprocessing and url
//! rewriting relative to their own directory.
//!
//! Stylesheets are parsed with lightningcss, so `url()` and `@import`
//! inside comments are never touched. Preprocessor output carries an
//! embedded source map; a `url()` that came from a partial resolves
//! against the partial's directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use lightningcss::dependencies::{Dependency, DependencyOptions};
use lightningcss::rules::CssRule;
use lightningcss::rules::import::ImportRule;
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use lightningcss::traits::ToCss;
use oxc_sourcemap::{SourceMap, Token};
use percent_encoding::percent_decode_str;
use url::Url;

use super::{Emission, Link, TransformContext, TransformStep, Unit, run_steps};
use crate::core::SourceKind;
use crate::embed::build::{STYLE_INJECTOR_JS, StyleInjectorVars};
use crate::utils::exec::Cmd;
use crate::utils::path::lexical_normalize;

const SOURCE_MAP_COMMENT: &str = "/*# sourceMappingURL=";

// ============================================================================
// compile-preprocessor
// ============================================================================

/// Pipe `.scss` / `.sass` through the configured command; `.css` passes.
///
/// The output keeps the embedded source map for `rewrite-urls`.
pub fn compile_preprocessor(unit: &mut Unit, ctx: &TransformContext<'_>) -> Result<()> {
    let ext = unit
        .source
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let indented = match ext.as_deref() {
        Some("scss") => false,
        Some("sass") => true,
        _ => return Ok(()),
    };

    let command = &ctx.config.style.preprocessor;
    let program = command
        .first()
        .ok_or_else(|| anyhow!("no stylesheet preprocessor configured"))?;
    which::which(program).map_err(|_| {
        anyhow!("`{program}` not found, install it or set `style.preprocessor` in the config")
    })?;

    let dir = unit.source.parent().unwrap_or(&ctx.config.root);
    let mut cmd = Cmd::from_slice(command)
        .arg(format!("--load-path={}", dir.display()))
        .arg("--embed-source-map")
        .arg("--source-map-urls=absolute");
    if indented {
        cmd = cmd.arg("--indented");
    }
    let output = cmd.cwd(&ctx.config.root).stdin(&unit.bytes).run()?;
    unit.bytes = output.stdout;
    Ok(())
}

// ============================================================================
// rewrite-urls
// ============================================================================

/// Resolve relative `url(...)` against the file it was written in.
pub fn rewrite_urls(unit: &mut Unit, ctx: &TransformContext<'_>) -> Result<()> {
    let dir = unit.source.parent().unwrap_or(&ctx.config.root).to_path_buf();
    let (css, origins) = split_source_map(unit.text()?, &ctx.config.root);
    let (code, dependencies) = print_with_dependencies(&css, ctx.display_path(&unit.source))?;
    let table = origins.as_ref().map(|o| o.map.generate_lookup_table());

    // Placeholders repeat for equal urls, so they are replaced in print order
    let mut out = String::with_capacity(code.len());
    let mut cursor = 0;
    for dependency in &dependencies {
        let (placeholder, url) = match dependency {
            Dependency::Url(dep) if is_rewritable(&dep.url) => {
                let origin = match (&origins, &table) {
                    (Some(origins), Some(table)) => {
                        origins.file_at(table, dep.loc.start.line, dep.loc.start.column)
                    }
                    _ => None,
                };
                let base = origin.and_then(Path::parent).unwrap_or(dir.as_path());
                (&dep.placeholder, rewrite_url(&dep.url, base, ctx)?)
            }
            Dependency::Url(dep) => (&dep.placeholder, dep.url.clone()),
            // `@import` belongs to resolve-imports
            Dependency::Import(dep) => (&dep.placeholder, dep.url.clone()),
        };

        let quoted = format!("\"{placeholder}\"");
        let Some(offset) = code[cursor..].find(&quoted) else {
            continue;
        };
        out.push_str(&code[cursor..cursor + offset]);
        out.push_str(&serde_json::to_string(&url)?);
        cursor += offset + quoted.len();
    }
    out.push_str(&code[cursor..]);

    unit.bytes = out.into_bytes();
    Ok(())
}

fn print_with_dependencies(css: &str, filename: String) -> Result<(String, Vec<Dependency>)> {
    let options = ParserOptions {
        filename,
        ..ParserOptions::default()
    };
    let stylesheet = match StyleSheet::parse(css, options) {
        Ok(sheet) => sheet,
        Err(e) => bail!("{e}"),
    };
    let printer = PrinterOptions {
        analyze_dependencies: Some(DependencyOptions {
            remove_imports: false,
        }),
        ..PrinterOptions::default()
    };
    match stylesheet.to_css(printer) {
        Ok(result) => Ok((result.code, result.dependencies.unwrap_or_default())),
        Err(e) => bail!("{e}"),
    }
}

/// Relative references only.
fn is_rewritable(url: &str) -> bool {
    !(url.is_empty()
        || url.starts_with('/')
        || url.starts_with('#')
        || url.starts_with("data:")
        || url.contains("://"))
}

fn rewrite_url(value: &str, dir: &Path, ctx: &TransformContext<'_>) -> Result<String> {
    let split = value.find(['?', '#']).unwrap_or(value.len());
    let (raw, suffix) = value.split_at(split);
    let decoded = percent_decode_str(raw).decode_utf8_lossy();
    let target = lexical_normalize(&dir.join(decoded.as_ref()));

    match ctx.links.get(&target) {
        Some(Link::Asset { url }) if url.starts_with("data:") => Ok(url.clone()),
        Some(Link::Asset { url }) => Ok(format!("{url}{suffix}")),
        Some(_) => bail!("url(`{value}`) does not point at an image or font"),
        None if !target.is_file() => bail!("cannot resolve url(`{value}`)"),
        None => match SourceKind::from_path(&target) {
            Some(kind) if kind.is_asset() => bail!(
                "url(`{value}`) points outside the source tree: `{}`",
                ctx.display_path(&target)
            ),
            _ => bail!("url(`{value}`) does not point at an image or font"),
        },
    }
}

/// Source files of compiled CSS, from an embedded source map.
struct Origins {
    map: SourceMap,
    files: Vec<Option<PathBuf>>,
}

impl Origins {
    fn parse(json: &str, root: &Path) -> Option<Self> {
        let map = SourceMap::from_json_string(json).ok()?;
        let files = map.get_sources().map(|s| source_file(s, root)).collect();
        Some(Self { map, files })
    }

    /// File that produced the CSS at 1-based `line` and `column`.
    fn file_at(&self, table: &[&[Token]], line: u32, column: u32) -> Option<&Path> {
        let token = self
            .map
            .lookup_token(table, line.checked_sub(1)?, column.saturating_sub(1))?;
        self.files.get(token.get_source_id()? as usize)?.as_deref()
    }
}

/// Strip the embedded source map comment and decode the map.
///
/// Maps that are missing, external or malformed yield `None`; urls then
/// resolve against the stylesheet itself.
fn split_source_map(css: &str, root: &Path) -> (String, Option<Origins>) {
    let Some(start) = css.rfind(SOURCE_MAP_COMMENT) else {
        return (css.to_string(), None);
    };
    let Some(len) = css[start..].find("*/") else {
        return (css.to_string(), None);
    };

    let target = css[start + SOURCE_MAP_COMMENT.len()..start + len].trim();
    let stripped = format!("{}{}", &css[..start], &css[start + len + 2..]);
    let origins = decode_data_url(target).and_then(|json| Origins::parse(&json, root));
    (stripped, origins)
}

fn decode_data_url(url: &str) -> Option<String> {
    let (meta, data) = url.strip_prefix("data:")?.split_once(',')?;
    if meta.ends_with(";base64") {
        String::from_utf8(STANDARD.decode(data.trim()).ok()?).ok()
    } else {
        Some(percent_decode_str(data).decode_utf8_lossy().into_owned())
    }
}

/// A map source as an existing file; `file:` urls or paths under `root`.
fn source_file(source: &str, root: &Path) -> Option<PathBuf> {
    let path = match Url::parse(source) {
        Ok(url) => url.to_file_path().ok()?,
        Err(_) => {
            let decoded = percent_decode_str(source).decode_utf8_lossy();
            lexical_normalize(&root.join(decoded.as_ref()))
        }
    };
    path.is_file().then_some(path)
}

// ============================================================================
// resolve-imports
// ============================================================================

/// Inline local `@import` rules; remote ones stay.
pub fn resolve_imports(
    unit: &mut Unit,
    steps: &[TransformStep],
    index: usize,
    ctx: &TransformContext<'_>,
) -> Result<()> {
    let loaders = steps[index].int("import_loaders").unwrap_or(0) as usize;
    let preceding = &steps[index.saturating_sub(loaders)..index];

    let mut stack = vec![unit.source.clone()];
    let css = inline_imports(&unit.source, unit.text()?, preceding, ctx, &mut stack)?;
    unit.bytes = css.into_bytes();
    Ok(())
}

fn inline_imports(
    file: &Path,
    css: &str,
    preceding: &[TransformStep],
    ctx: &TransformContext<'_>,
    stack: &mut Vec<PathBuf>,
) -> Result<String> {
    let dir = file.parent().unwrap_or(&ctx.config.root);
    let options = ParserOptions {
        filename: ctx.display_path(file),
        ..ParserOptions::default()
    };
    let stylesheet = match StyleSheet::parse(css, options) {
        Ok(sheet) => sheet,
        Err(e) => bail!("{e}"),
    };

    let mut out = String::with_capacity(css.len());
    for rule in &stylesheet.rules.0 {
        let text = match rule {
            CssRule::Import(import) if !is_remote(&import.url) => {
                let path = resolve_import(dir, &import.url)?;
                if stack.contains(&path) {
                    let chain: Vec<_> = stack
                        .iter()
                        .chain(std::iter::once(&path))
                        .map(|p| ctx.display_path(p))
                        .collect();
                    bail!("@import cycle: {}", chain.join(" -> "));
                }

                let mut imported = Unit::read(&path, SourceKind::Style)
                    .with_context(|| format!("cannot read `{}`", ctx.display_path(&path)))?;
                run_steps(&mut imported, preceding, ctx)?;

                stack.push(path.clone());
                let nested = inline_imports(&path, imported.text()?, preceding, ctx, stack)?;
                stack.pop();
                wrap_conditions(import, nested.trim_end())?
            }
            rule => print_css(rule)?,
        };
        out.push_str(&text);
        out.push('\n');
    }
    Ok(out)
}

fn is_remote(spec: &str) -> bool {
    spec.contains("://") || spec.starts_with("//")
}

/// Keep the `layer`, `supports()` and media conditions of an inlined import.
fn wrap_conditions(import: &ImportRule<'_>, css: &str) -> Result<String> {
    let mut css = css.to_string();
    if !import.media.media_queries.is_empty() {
        css = format!("@media {} {{\n{css}\n}}", print_css(&import.media)?);
    }
    if let Some(supports) = &import.supports {
        css = format!("@supports {} {{\n{css}\n}}", print_css(supports)?);
    }
    match &import.layer {
        Some(Some(name)) => css = format!("@layer {} {{\n{css}\n}}", print_css(name)?),
        Some(None) => css = format!("@layer {{\n{css}\n}}"),
        None => {}
    }
    Ok(css)
}

fn print_css(value: &impl ToCss) -> Result<String> {
    match value.to_css_string(PrinterOptions::default()) {
        Ok(css) => Ok(css),
        Err(e) => bail!("{e}"),
    }
}

/// The exact path, or the path with `.css` appended.
fn resolve_import(dir: &Path, spec: &str) -> Result<PathBuf> {
    let exact = lexical_normalize(&dir.join(spec));
    if exact.is_file() {
        return Ok(exact);
    }
    let mut with_ext = exact.clone().into_os_string();
    with_ext.push(".css");
    let with_ext = PathBuf::from(with_ext);
    if with_ext.is_file() {
        return Ok(with_ext);
    }
    bail!("cannot resolve @import `{spec}`")
}

// ============================================================================
// emit-style
// ============================================================================

/// Extract (production) or wrap into a style-injector module (development).
pub fn emit_style(unit: &mut Unit, step: &TransformStep, ctx: &TransformContext<'_>) -> Result<()> {
    let extract = step
        .bool("extract")
        .unwrap_or(ctx.policy().extract_styles);
    if extract {
        unit.emission = Emission::Stylesheet;
        return Ok(());
    }

    let id = ctx.graph.module_id(&unit.source);
    let js = STYLE_INJECTOR_JS.render(&StyleInjectorVars {
        module_id: &id,
        css: unit.text()?,
        class_map: unit.class_map.as_ref(),
    });
    unit.bytes = js.into_bytes();
    unit.emission = Emission::StyleInjector;
    Ok(())
}
