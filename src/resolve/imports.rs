//! Import statement discovery for script sources.
//!
//! Scripts are parsed with oxc and the imports are read from the parser's
//! module record, so statements inside comments, strings and template
//! literals are never mistaken for imports.
//!
//! ```text
//! import x from "s"          import "s"
//! import * as ns from "s"    import { a, b as c } from "s"
//! export { a } from "s"      export * from "s"
//! import("s")
//! ```
//!
//! Type-only imports (`import type { T } from "s"`) are skipped, and so are
//! dynamic imports whose argument is not a plain string literal.

use std::ops::Range;
use std::path::Path;

use oxc::allocator::Allocator;
use oxc::parser::Parser;
use oxc::span::{SourceType, Span};
use oxc::syntax::module_record::{ImportImportName, ModuleRecord};
use thiserror::Error;

/// Statement form, with the default binding where there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    /// `import <bindings> from "s"`; `default` is set when the only binding
    /// is a default import.
    Static { default: Option<String> },
    /// `import "s"`
    SideEffect,
    /// `export <clause> from "s"`
    ReExport,
    /// `import("s")`
    Dynamic,
}

/// One import found in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    pub kind: ImportKind,
    pub specifier: String,
    /// Byte range of the whole statement (or call expression).
    pub span: Range<usize>,
    /// Byte range of the specifier text, quotes excluded.
    pub specifier_span: Range<usize>,
}

impl ImportStatement {
    /// The binding of `import x from "s"`, when that is the only binding.
    ///
    /// Leaf units (styles, assets, JSON) only support this form.
    pub fn default_binding(&self) -> Option<&str> {
        match &self.kind {
            ImportKind::Static { default } => default.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("`{0}` is not a script extension")]
    Extension(String),

    #[error("{0}")]
    Syntax(String),
}

/// Parser settings for a script at `path`.
///
/// Every script is an ES module; `.js` files may contain JSX.
pub fn script_source_type(path: &Path) -> Result<SourceType, ScanError> {
    let source_type = SourceType::from_path(path)
        .map_err(|_| {
            ScanError::Extension(
                path.extension()
                    .map(|e| e.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            )
        })?
        .with_module(true);
    Ok(if source_type.is_typescript() {
        source_type
    } else {
        source_type.with_jsx(true)
    })
}

/// Find every import of the script at `path`, ordered by position.
pub fn scan_imports(path: &Path, source: &str) -> Result<Vec<ImportStatement>, ScanError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, script_source_type(path)?).parse();
    if let Some(error) = ret.errors.first() {
        return Err(ScanError::Syntax(error.to_string()));
    }
    Ok(collect(&ret.module_record, source))
}

fn collect(record: &ModuleRecord<'_>, source: &str) -> Vec<ImportStatement> {
    let mut found = Vec::new();

    for (specifier, requests) in &record.requested_modules {
        for request in requests.iter().filter(|r| !r.is_type) {
            let kind = if request.is_import {
                static_kind(record, request.statement_span)
            } else {
                ImportKind::ReExport
            };
            found.push(ImportStatement {
                kind,
                specifier: specifier.to_string(),
                span: range(request.statement_span),
                specifier_span: unquoted(request.span),
            });
        }
    }

    for dynamic in record.dynamic_imports.iter() {
        let argument = &source[range(dynamic.module_request)];
        if let Some(specifier) = string_literal(argument) {
            found.push(ImportStatement {
                kind: ImportKind::Dynamic,
                specifier: specifier.to_string(),
                span: range(dynamic.span),
                specifier_span: unquoted(dynamic.module_request),
            });
        }
    }

    found.sort_by_key(|stmt| stmt.span.start);
    found
}

/// `Static` or `SideEffect`, from the bindings of the statement at `statement`.
fn static_kind(record: &ModuleRecord<'_>, statement: Span) -> ImportKind {
    let mut bindings = record
        .import_entries
        .iter()
        .filter(|entry| entry.statement_span == statement);

    match (bindings.next(), bindings.next()) {
        (None, _) => ImportKind::SideEffect,
        (Some(entry), None) if matches!(entry.import_name, ImportImportName::Default(_)) => {
            ImportKind::Static {
                default: Some(entry.local_name.name.to_string()),
            }
        }
        _ => ImportKind::Static { default: None },
    }
}

/// Contents of a quoted literal without escapes.
fn string_literal(text: &str) -> Option<&str> {
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = text.strip_prefix(quote)?.strip_suffix(quote)?;
    (!inner.is_empty() && !inner.contains('\\')).then_some(inner)
}

#[inline]
fn range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

#[inline]
fn unquoted(span: Span) -> Range<usize> {
    span.start as usize + 1..span.end as usize - 1
}

/// Apply non-overlapping `(range, replacement)` edits to `source`.
///
/// Edits must be sorted by range start.
pub fn apply_edits(source: &str, edits: &[(Range<usize>, String)]) -> String {
    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (range, replacement) in edits {
        out.push_str(&source[cursor..range.start]);
        out.push_str(replacement);
        cursor = range.end;
    }
    out.push_str(&source[cursor..]);
    out
}
