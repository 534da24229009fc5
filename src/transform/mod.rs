//! Per-kind transform chains.
//!
//! # Module Structure
//!
//! ```text
//! transform/
//! ├── mod.rs      # StepName, TransformChain, select(), run_chain()
//! ├── script.rs   # compile-script
//! ├── style.rs    # compile-preprocessor, rewrite-urls, resolve-imports, emit-style
//! ├── module.rs   # scope-class-names
//! ├── asset.rs    # inline-or-copy, copy-hashed
//! └── minify.rs   # production stylesheet minifier
//! ```
//!
//! Chains are listed in application order: the first step runs first.
//! A chain is built once per kind per build ([`ChainTable`]) and shared by
//! every file of that kind.

mod asset;
pub mod minify;
mod module;
mod script;
mod style;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{fmt, fs};

use serde::Serialize;
use thiserror::Error;

use crate::config::{AssetsConfig, ProjectConfig};
use crate::core::{BuildMode, ModePolicy, SourceKind};
use crate::pipeline::EnvironmentBinding;
use crate::resolve::ModuleGraph;

pub use module::ClassMap;

// ============================================================================
// Steps and chains
// ============================================================================

/// Identity of a transform step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepName {
    CompileScript,
    ScopeClassNames,
    CompilePreprocessor,
    RewriteUrls,
    ResolveImports,
    EmitStyle,
    InlineOrCopy,
    CopyHashed,
}

impl StepName {
    pub const fn name(self) -> &'static str {
        match self {
            Self::CompileScript => "compile-script",
            Self::ScopeClassNames => "scope-class-names",
            Self::CompilePreprocessor => "compile-preprocessor",
            Self::RewriteUrls => "rewrite-urls",
            Self::ResolveImports => "resolve-imports",
            Self::EmitStyle => "emit-style",
            Self::InlineOrCopy => "inline-or-copy",
            Self::CopyHashed => "copy-hashed",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a recognized step option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepOption {
    Bool(bool),
    Int(u64),
    Str(String),
}

/// One step of a chain with its options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformStep {
    pub name: StepName,
    pub options: BTreeMap<&'static str, StepOption>,
}

impl TransformStep {
    pub fn new(name: StepName) -> Self {
        Self {
            name,
            options: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &'static str, value: StepOption) -> Self {
        self.options.insert(key, value);
        self
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.options.get(key)? {
            StepOption::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn int(&self, key: &str) -> Option<u64> {
        match self.options.get(key)? {
            StepOption::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        match self.options.get(key)? {
            StepOption::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Ordered steps for one source kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformChain {
    pub kind: SourceKind,
    pub steps: Vec<TransformStep>,
}

impl TransformChain {
    pub fn step_names(&self) -> Vec<StepName> {
        self.steps.iter().map(|s| s.name).collect()
    }
}

/// Chain for `kind` under `mode`, in application order.
pub fn select(kind: SourceKind, mode: BuildMode, assets: &AssetsConfig) -> TransformChain {
    use StepName::*;
    use StepOption::*;

    let policy = mode.policy();
    let emit_style = || TransformStep::new(EmitStyle).with("extract", Bool(policy.extract_styles));

    let steps = match kind {
        SourceKind::Script => vec![
            TransformStep::new(CompileScript).with("env_name", Str(policy.env_name.into())),
        ],
        SourceKind::CssModule => vec![
            TransformStep::new(ScopeClassNames).with("modules", Bool(true)),
            emit_style(),
        ],
        SourceKind::Style => vec![
            TransformStep::new(CompilePreprocessor),
            TransformStep::new(RewriteUrls),
            TransformStep::new(ResolveImports).with("import_loaders", Int(2)),
            emit_style(),
        ],
        SourceKind::Image => {
            vec![TransformStep::new(InlineOrCopy).with("limit", Int(assets.inline_limit))]
        }
        SourceKind::Font => vec![TransformStep::new(CopyHashed)],
    };

    TransformChain { kind, steps }
}

/// One shared chain per kind, built at the start of a build.
#[derive(Debug, Clone)]
pub struct ChainTable {
    chains: BTreeMap<SourceKind, Arc<TransformChain>>,
}

impl ChainTable {
    pub fn new(mode: BuildMode, assets: &AssetsConfig) -> Self {
        let chains = SourceKind::ALL
            .into_iter()
            .map(|kind| (kind, Arc::new(select(kind, mode, assets))))
            .collect();
        Self { chains }
    }

    pub fn get(&self, kind: SourceKind) -> Arc<TransformChain> {
        Arc::clone(&self.chains[&kind])
    }
}

// ============================================================================
// Units
// ============================================================================

/// How a transformed unit leaves the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Emission {
    /// No emitting step has run yet.
    Pending,
    /// ES module artifact.
    Script,
    /// Extracted stylesheet artifact.
    Stylesheet,
    /// ES module that injects its CSS into the page at runtime.
    StyleInjector,
    /// Referenced through a data URI, no artifact.
    Inline(String),
    /// Copied under a hashed name.
    File,
}

/// A source file on its way through its chain.
#[derive(Debug, Clone)]
pub struct Unit {
    pub source: PathBuf,
    pub kind: SourceKind,
    pub bytes: Vec<u8>,
    pub class_map: Option<ClassMap>,
    pub emission: Emission,
}

impl Unit {
    pub fn new(source: PathBuf, kind: SourceKind, bytes: Vec<u8>) -> Self {
        Self {
            source,
            kind,
            bytes,
            class_map: None,
            emission: Emission::Pending,
        }
    }

    pub fn read(path: &Path, kind: SourceKind) -> std::io::Result<Self> {
        Ok(Self::new(path.to_path_buf(), kind, fs::read(path)?))
    }

    fn text(&self) -> anyhow::Result<&str> {
        std::str::from_utf8(&self.bytes)
            .map_err(|_| anyhow::anyhow!("`{}` is not valid UTF-8", self.source.display()))
    }
}

/// How importers refer to an already transformed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Link {
    /// Image or font: a hashed URL or a data URI.
    Asset { url: String },
    /// Anything importable as a module, by stable id.
    Module { id: String },
    /// Extracted stylesheet; CSS modules carry their class map.
    Stylesheet { class_map: Option<ClassMap> },
}

/// Links of every unit transformed so far, keyed by source path.
pub type LinkTable = BTreeMap<PathBuf, Link>;

/// Everything a step may read. Immutable for the whole build.
pub struct TransformContext<'a> {
    pub config: &'a ProjectConfig,
    pub mode: BuildMode,
    pub env: &'a EnvironmentBinding,
    pub graph: &'a ModuleGraph,
    pub links: &'a LinkTable,
}

impl TransformContext<'_> {
    #[inline]
    pub fn policy(&self) -> &'static ModePolicy {
        self.mode.policy()
    }

    /// Display path of a source file, relative to the project root.
    pub fn display_path(&self, path: &Path) -> String {
        crate::utils::path::to_slash(&self.config.root_relative(path))
    }
}

// ============================================================================
// Execution
// ============================================================================

/// A chain step failed on one file.
#[derive(Debug, Clone, Error)]
#[error("{}: {step} failed: {cause}", file.display())]
pub struct TransformError {
    pub file: PathBuf,
    pub step: StepName,
    pub cause: String,
}

impl TransformError {
    pub fn new(file: impl Into<PathBuf>, step: StepName, cause: impl fmt::Display) -> Self {
        Self {
            file: file.into(),
            step,
            cause: cause.to_string(),
        }
    }
}

/// Run every step of `chain` on `unit`, in order.
pub fn run_chain(
    mut unit: Unit,
    chain: &TransformChain,
    ctx: &TransformContext<'_>,
) -> Result<Unit, TransformError> {
    debug_assert_eq!(unit.kind, chain.kind);
    run_steps(&mut unit, &chain.steps, ctx)?;
    if unit.emission == Emission::Pending {
        let step = chain.steps.last().map_or(StepName::CopyHashed, |s| s.name);
        return Err(TransformError::new(&unit.source, step, "chain produced no output"));
    }
    Ok(unit)
}

/// Run a slice of steps; `resolve-imports` reuses this for imported files.
fn run_steps(
    unit: &mut Unit,
    steps: &[TransformStep],
    ctx: &TransformContext<'_>,
) -> Result<(), TransformError> {
    for (index, step) in steps.iter().enumerate() {
        apply_step(unit, steps, index, ctx)
            .map_err(|e| TransformError::new(&unit.source, step.name, format!("{e:#}")))?;
    }
    Ok(())
}

fn apply_step(
    unit: &mut Unit,
    steps: &[TransformStep],
    index: usize,
    ctx: &TransformContext<'_>,
) -> anyhow::Result<()> {
    let step = &steps[index];
    match step.name {
        StepName::CompileScript => script::compile_script(unit, step, ctx),
        StepName::ScopeClassNames => module::scope_class_names(unit, ctx),
        StepName::CompilePreprocessor => style::compile_preprocessor(unit, ctx),
        StepName::RewriteUrls => style::rewrite_urls(unit, ctx),
        StepName::ResolveImports => style::resolve_imports(unit, steps, index, ctx),
        StepName::EmitStyle => style::emit_style(unit, step, ctx),
        StepName::InlineOrCopy => asset::inline_or_copy(unit, step),
        StepName::CopyHashed => {
            asset::copy_hashed(unit);
            Ok(())
        }
    }
}
