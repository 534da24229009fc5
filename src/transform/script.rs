//! `compile-script`: import rewriting, environment substitution and
//! JSX/TypeScript stripping with oxc.

use std::fs;
use std::ops::Range;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use oxc::allocator::Allocator;
use oxc::codegen::Codegen;
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::syntax::identifier::is_identifier_name;
use oxc::transformer::{TransformOptions, Transformer};
use oxc::transformer_plugins::{ReplaceGlobalDefines, ReplaceGlobalDefinesConfig};

use super::{Emission, Link, TransformContext, TransformStep, Unit};
use crate::core::SourceKind;
use crate::pipeline::EnvironmentBinding;
use crate::resolve::imports::apply_edits;
use crate::resolve::{ImportKind, ImportStatement, ImportTarget, script_source_type};

pub fn compile_script(
    unit: &mut Unit,
    _step: &TransformStep,
    ctx: &TransformContext<'_>,
) -> Result<()> {
    let source = unit.text()?;
    let rewritten = rewrite_imports(&unit.source, source, ctx)?;
    let mut code = compile(&unit.source, &rewritten, ctx.env, ctx.mode.is_dev())?;

    if ctx.policy().source_url_comments {
        code.push_str(&format!("\n//# sourceURL={}\n", ctx.graph.module_id(&unit.source)));
    }

    unit.bytes = code.into_bytes();
    unit.emission = Emission::Script;
    Ok(())
}

// ============================================================================
// Import rewriting
// ============================================================================

/// Point every local import at its final form.
///
/// Scripts and injected styles become module ids; assets, JSON and
/// extracted styles are inlined into the importing statement.
fn rewrite_imports(path: &Path, source: &str, ctx: &TransformContext<'_>) -> Result<String> {
    let node = ctx
        .graph
        .get(path)
        .ok_or_else(|| anyhow!("`{}` is not part of the module graph", ctx.display_path(path)))?;

    let mut edits: Vec<(Range<usize>, String)> = Vec::with_capacity(node.imports.len());
    for import in &node.imports {
        let stmt = &import.statement;
        match &import.target {
            ImportTarget::External => {}
            ImportTarget::Json(file) => {
                let json = read_json(file)?;
                edits.push((stmt.span.clone(), inline_binding(stmt, &json)?));
            }
            ImportTarget::Local(target) => {
                let target_kind = ctx.graph.get(target).map(|n| n.kind);
                if target_kind == Some(SourceKind::Script) {
                    edits.push((stmt.specifier_span.clone(), ctx.graph.module_id(target)));
                    continue;
                }
                let link = ctx.links.get(target).ok_or_else(|| {
                    anyhow!("`{}` has not been transformed", ctx.display_path(target))
                })?;
                match link {
                    Link::Module { id } => edits.push((stmt.specifier_span.clone(), id.clone())),
                    Link::Asset { url } => {
                        let literal = serde_json::to_string(url)?;
                        edits.push((stmt.span.clone(), inline_binding(stmt, &literal)?));
                    }
                    Link::Stylesheet { class_map } => {
                        let literal = match class_map {
                            Some(map) => serde_json::to_string(map)?,
                            None => "{}".to_string(),
                        };
                        edits.push((stmt.span.clone(), inline_binding(stmt, &literal)?));
                    }
                }
            }
        }
    }

    edits.sort_by_key(|(range, _)| range.start);
    Ok(apply_edits(source, &edits))
}

/// Replacement for an import of a leaf value (`literal` is a JS expression).
fn inline_binding(stmt: &ImportStatement, literal: &str) -> Result<String> {
    match &stmt.kind {
        ImportKind::SideEffect => Ok(String::new()),
        ImportKind::Dynamic => Ok(format!("Promise.resolve({{ default: {literal} }})")),
        ImportKind::Static { .. } => match stmt.default_binding() {
            Some(binding) => Ok(format!("const {binding} = {literal};")),
            None => bail!(
                "`{}` only supports a default import (`import x from \"{}\"`)",
                stmt.specifier,
                stmt.specifier
            ),
        },
        ImportKind::ReExport => {
            bail!("`{}` cannot be re-exported", stmt.specifier)
        }
    }
}

/// Read a JSON file as a compact JS literal.
fn read_json(path: &Path) -> Result<String> {
    let content =
        fs::read_to_string(path).with_context(|| format!("cannot read `{}`", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("invalid JSON in `{}`", path.display()))?;
    Ok(serde_json::to_string(&value)?)
}

// ============================================================================
// Compilation
// ============================================================================

/// `process.env.NAME` defines for every bound name.
///
/// Names that are not identifiers cannot appear in a dotted access and are
/// skipped.
fn env_defines(env: &EnvironmentBinding) -> Result<ReplaceGlobalDefinesConfig> {
    let defines: Vec<(String, String)> = env
        .iter()
        .filter(|(name, _)| is_identifier_name(name))
        .map(|(name, value)| Ok((format!("process.env.{name}"), serde_json::to_string(value)?)))
        .collect::<Result<_>>()?;
    ReplaceGlobalDefinesConfig::new(&defines).map_err(|errors| {
        anyhow!(
            "{}",
            errors.first().map_or_else(|| "invalid define".to_string(), ToString::to_string)
        )
    })
}

/// Substitute the environment, lower JSX and strip TypeScript, keeping ES
/// module syntax.
///
/// `process.env.NAME` is replaced on the AST, so only real member accesses
/// on the global `process` are touched. Unbound names are left alone.
fn compile(path: &Path, source: &str, env: &EnvironmentBinding, development: bool) -> Result<String> {
    let source_type = script_source_type(path)?;

    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = ret.errors.first() {
        bail!("{error}");
    }
    let mut program = ret.program;

    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();
    let scoping = ReplaceGlobalDefines::new(&allocator, env_defines(env)?)
        .build(scoping, &mut program)
        .scoping;

    let mut options = TransformOptions::default();
    options.jsx.development = development;
    let ret = Transformer::new(&allocator, path, &options).build_with_scoping(scoping, &mut program);
    if let Some(error) = ret.errors.first() {
        bail!("{error}");
    }

    Ok(Codegen::new().build(&program).code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::BuildMode;
    use crate::resolve::{Import, ModuleNode, scan_imports};
    use crate::transform::test_support::Fixture;
    use crate::transform::{StepName, select};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    /// Register `source` at `rel` with its imports resolved to `targets`.
    fn add_script(fixture: &mut Fixture, rel: &str, source: &str, targets: Vec<ImportTarget>) -> PathBuf {
        let path = fixture.config.root.join(rel);
        let imports = scan_imports(&path, source)
            .unwrap()
            .into_iter()
            .zip(targets)
            .map(|(statement, target)| Import { statement, target })
            .collect();
        fixture.graph.insert(ModuleNode {
            path: path.clone(),
            kind: SourceKind::Script,
            source: Some(source.to_string()),
            imports,
        });
        path
    }

    fn compile(fixture: &Fixture, path: &Path, source: &str) -> Result<String> {
        let chain = select(SourceKind::Script, fixture.mode, &fixture.config.assets);
        let mut unit = Unit::new(path.to_path_buf(), SourceKind::Script, source.as_bytes().to_vec());
        compile_script(&mut unit, &chain.steps[0], &fixture.ctx())?;
        assert_eq!(unit.emission, Emission::Script);
        Ok(String::from_utf8(unit.bytes).unwrap())
    }

    #[test]
    fn test_env_substitution() {
        let env = EnvironmentBinding::new(BuildMode::Production, &BTreeMap::new());
        let out = super::compile(
            Path::new("/p/src/index.js"),
            "if (process.env.NODE_ENV !== 'production') { a(); }\nx.process.env.NODE_ENV;\nprocess.env.OTHER;\n",
            &env,
            false,
        )
        .unwrap();
        assert!(out.contains("\"production\" !== \"production\""));
        assert!(out.contains("x.process.env.NODE_ENV"));
        assert!(out.contains("process.env.OTHER"));
    }

    #[test]
    fn test_env_names_in_strings_are_kept() {
        let env = EnvironmentBinding::new(BuildMode::Production, &BTreeMap::new());
        let out = super::compile(
            Path::new("/p/src/index.js"),
            "console.log(\"set process.env.NODE_ENV to switch\", `${process.env.NODE_ENV}`);\n",
            &env,
            false,
        )
        .unwrap();
        assert!(out.contains("\"set process.env.NODE_ENV to switch\""));
        assert!(out.contains("${\"production\"}"));
    }

    #[test]
    fn test_shadowed_process_is_kept() {
        let env = EnvironmentBinding::new(BuildMode::Development, &BTreeMap::new());
        let out = super::compile(
            Path::new("/p/src/index.js"),
            "function f(process) { return process.env.NODE_ENV; }\n",
            &env,
            false,
        )
        .unwrap();
        assert!(out.contains("return process.env.NODE_ENV"));
    }

    #[test]
    fn test_jsx_is_lowered() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new(dir.path(), BuildMode::Production);
        let source = "export default function App() { return <div className=\"app\">hi</div>; }\n";
        let path = add_script(&mut fixture, "src/App.jsx", source, vec![]);

        let out = compile(&fixture, &path, source).unwrap();
        assert!(!out.contains("<div"));
        assert!(out.contains("react/jsx-runtime"));
        assert!(!out.contains("sourceURL"));
    }

    #[test]
    fn test_typescript_is_stripped() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new(dir.path(), BuildMode::Production);
        let source = "const n: number = 1;\nexport function twice(x: number): number { return x * n * 2; }\n";
        let path = add_script(&mut fixture, "src/math.ts", source, vec![]);

        let out = compile(&fixture, &path, source).unwrap();
        assert!(!out.contains(": number"));
        assert!(out.contains("export function twice(x)"));
    }

    #[test]
    fn test_imports_are_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new(dir.path(), BuildMode::Production);
        let root = fixture.config.root.clone();

        let button = root.join("src/Button.js");
        fixture.graph.insert(ModuleNode::new(button.clone(), SourceKind::Script));
        let logo = root.join("src/logo.png");
        fixture.links.insert(logo.clone(), Link::Asset { url: "/assets/images/logo.0123abcd.png".into() });
        let css = root.join("src/index.css");
        fixture.links.insert(css.clone(), Link::Stylesheet { class_map: None });
        let module = root.join("src/App.module.css");
        fixture.links.insert(
            module.clone(),
            Link::Stylesheet { class_map: Some(BTreeMap::from([("app".into(), "x_app".into())])) },
        );

        let source = "import Button from './Button';\nimport logo from './logo.png';\nimport './index.css';\nimport styles from './App.module.css';\nimport React from 'react';\n";
        let path = add_script(
            &mut fixture,
            "src/index.js",
            source,
            vec![
                ImportTarget::Local(button),
                ImportTarget::Local(logo),
                ImportTarget::Local(css),
                ImportTarget::Local(module),
                ImportTarget::External,
            ],
        );

        let out = compile(&fixture, &path, source).unwrap();
        assert!(out.contains("\"/@module/src/Button.js\""));
        assert!(out.contains("\"/assets/images/logo.0123abcd.png\""));
        assert!(out.contains("x_app"));
        assert!(!out.contains("index.css"));
        assert!(out.contains("from \"react\""));
    }

    #[test]
    fn test_named_import_of_asset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new(dir.path(), BuildMode::Production);
        let logo = fixture.config.root.join("src/logo.png");
        fixture.links.insert(logo.clone(), Link::Asset { url: "data:image/png;base64,AA==".into() });

        let source = "import { src } from './logo.png';\n";
        let path = add_script(&mut fixture, "src/index.js", source, vec![ImportTarget::Local(logo)]);

        let err = compile(&fixture, &path, source).unwrap_err();
        assert!(err.to_string().contains("only supports a default import"));
    }

    #[test]
    fn test_dev_appends_source_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut fixture = Fixture::new(dir.path(), BuildMode::Development);
        let source = "export const a = 1;\n";
        let path = add_script(&mut fixture, "src/a.js", source, vec![]);

        let out = compile(&fixture, &path, source).unwrap();
        assert!(out.ends_with("//# sourceURL=/@module/src/a.js\n"));
        assert_eq!(StepName::CompileScript.name(), "compile-script");
    }
}
