//! Build orchestration.
//!
//! # Module Structure
//!
//! ```text
//! pipeline/
//! ├── mod.rs       # build(), BuildResult, supersede tokens (this file)
//! ├── error.rs     # BuildError, BuildStep
//! ├── env.rs       # EnvironmentBinding
//! ├── clean.rs     # output and secondary directory cleanup
//! ├── classify.rs  # source walk, classification, import resolution
//! ├── optimize.rs  # production stylesheet minification pool
//! └── emit.rs      # naming, entry document, commit
//! ```
//!
//! Pipeline: env -> clean -> classify -> transform (assets, styles, scripts)
//! -> optimize -> emit -> entry document -> commit

mod classify;
mod clean;
mod emit;
mod env;
mod error;
mod optimize;

pub use env::EnvironmentBinding;
pub use error::{BuildError, BuildStep};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::config::ProjectConfig;
use crate::core::{BuildMode, SourceKind};
use crate::debug;
use crate::logger::ProgressLine;
use crate::output::ArtifactSet;
use crate::resolve::ModuleGraph;
use crate::transform::{ChainTable, LinkTable, TransformContext, Unit, run_chain};

/// Serializes builds; a second request waits for the first.
static BUILD_LOCK: Mutex<()> = Mutex::new(());

/// Transform groups in execution order: leaves before their importers.
const GROUPS: [&[SourceKind]; 3] = [
    &[SourceKind::Image, SourceKind::Font],
    &[SourceKind::Style, SourceKind::CssModule],
    &[SourceKind::Script],
];

// ============================================================================
// Supersede tokens
// ============================================================================

/// Monotonic build generation shared by the dev loop and its builds.
#[derive(Debug, Clone, Default)]
pub struct Generation(Arc<AtomicU64>);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation; tokens of older ones become stale.
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[inline]
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// Token bound to the current generation.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            generation: self.clone(),
            issued: self.current(),
        }
    }
}

/// Lets a build notice that a newer change superseded it.
#[derive(Debug, Clone)]
pub struct CancelToken {
    generation: Generation,
    issued: u64,
}

impl CancelToken {
    #[inline]
    pub fn is_stale(&self) -> bool {
        self.generation.current() != self.issued
    }

    /// `Superseded` at `step` when a newer generation exists.
    pub fn check(&self, step: BuildStep) -> Result<(), BuildError> {
        if self.is_stale() {
            return Err(BuildError::Superseded { step });
        }
        Ok(())
    }
}

// ============================================================================
// Build
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Checked between units; `None` for one-shot builds.
    pub cancel: Option<CancelToken>,
    /// Suppress the progress line.
    pub quiet: bool,
}

/// A committed build.
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub mode: BuildMode,
    pub artifacts: Arc<ArtifactSet>,
    /// Source units per kind.
    pub counts: FxHashMap<SourceKind, usize>,
    pub elapsed: Duration,
}

/// One-shot build with a progress line.
pub fn build(config: &ProjectConfig, mode: BuildMode) -> Result<BuildResult, BuildError> {
    build_with(config, mode, &BuildOptions::default())
}

/// Run every step and commit the artifact set to `build.output`.
///
/// On error nothing new is written; the output directory is left empty if
/// the failure came after cleaning.
pub fn build_with(
    config: &ProjectConfig,
    mode: BuildMode,
    options: &BuildOptions,
) -> Result<BuildResult, BuildError> {
    let _guard = BUILD_LOCK.lock();
    let started = Instant::now();
    let check = |step| match &options.cancel {
        Some(token) => token.check(step),
        None => Ok(()),
    };

    // fixed before any script is compiled
    let env = EnvironmentBinding::new(mode, &config.env);
    debug!("build"; "{} mode, {} env bindings", mode, env.len());

    clean::clean_outputs(config)?;
    check(BuildStep::Clean)?;

    let graph = classify::classify(config)?;
    check(BuildStep::Classify)?;

    let counts: FxHashMap<_, _> = SourceKind::ALL
        .into_iter()
        .map(|kind| (kind, graph.count(kind)))
        .collect();
    let progress = (!options.quiet).then(|| {
        let items: Vec<_> = SourceKind::ALL
            .into_iter()
            .map(|kind| (kind.name(), counts[&kind]))
            .collect();
        ProgressLine::new(&items)
    });

    let chains = ChainTable::new(mode, &config.assets);
    let mut emitter = emit::Emitter::new(config, mode, &graph);
    let mut links = LinkTable::new();

    for group in GROUPS {
        let mut units = Vec::new();
        {
            let ctx = TransformContext {
                config,
                mode,
                env: &env,
                graph: &graph,
                links: &links,
            };
            for &kind in group {
                let chain = chains.get(kind);
                for node in graph.of_kind(kind) {
                    check(BuildStep::Transform)?;
                    let unit = load_unit(&graph, &node.path, kind)?;
                    units.push(run_chain(unit, &chain, &ctx)?);
                    if let Some(p) = &progress {
                        p.inc(kind.name());
                    }
                }
            }
        }

        if mode.policy().minify_styles {
            optimize::minify_stylesheets(&mut units)?;
            check(BuildStep::Optimize)?;
        }

        for unit in units {
            let source = unit.source.clone();
            let link = emitter.emit(unit)?;
            links.insert(source, link);
        }
    }

    let artifacts = emitter.finish()?;
    if let Some(p) = progress {
        p.finish();
    }
    check(BuildStep::EntryDocument)?;

    emit::commit(&config.build.output, &artifacts)?;

    Ok(BuildResult {
        mode,
        artifacts: Arc::new(artifacts),
        counts,
        elapsed: started.elapsed(),
    })
}

/// Scripts reuse the text scanned during classification.
fn load_unit(graph: &ModuleGraph, path: &std::path::Path, kind: SourceKind) -> Result<Unit, BuildError> {
    if let Some(source) = graph.get(path).and_then(|n| n.source.as_ref()) {
        return Ok(Unit::new(path.to_path_buf(), kind, source.clone().into_bytes()));
    }
    Unit::read(path, kind).map_err(|e| BuildError::io(BuildStep::Transform, path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;
    use crate::output::ArtifactRole;
    use std::fs;
    use std::path::Path;

    fn write(root: &Path, rel: &str, content: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn quiet() -> BuildOptions {
        BuildOptions {
            quiet: true,
            ..BuildOptions::default()
        }
    }

    /// index.js -> App.jsx -> {App.module.css, logo.png}, index.css -> font
    fn project(root: &Path) {
        write(
            root,
            "src/index.js",
            b"import App from './App';\nimport './index.css';\nconsole.log(App, process.env.NODE_ENV);\n",
        );
        write(
            root,
            "src/App.jsx",
            b"import styles from './App.module.css';\nimport logo from './logo.png';\nexport default function App() { return styles.title + logo; }\n",
        );
        write(root, "src/App.module.css", b".title { color: red; }\n");
        write(
            root,
            "src/index.css",
            b"@font-face { font-family: Inter; src: url(./fonts/Inter.woff2); }\nbody { margin: 0; }\n",
        );
        write(root, "src/fonts/Inter.woff2", b"wOF2-font-bytes");
        write(root, "src/logo.png", &[0x89, b'P', b'N', b'G']);
    }

    fn run(root: &Path, mode: BuildMode) -> BuildResult {
        build_with(&test_config_at(root), mode, &quiet()).unwrap()
    }

    fn snapshot(output: &Path) -> Vec<(String, Vec<u8>)> {
        let mut files: Vec<_> = jwalk::WalkDir::new(output)
            .sort(true)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let path = e.path();
                let rel = crate::utils::path::to_slash(path.strip_prefix(output).unwrap());
                (rel, fs::read(&path).unwrap())
            })
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_builds_are_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path());
        let output = dir.path().join("dist");

        run(dir.path(), BuildMode::Production);
        let first = snapshot(&output);
        run(dir.path(), BuildMode::Production);
        assert_eq!(first, snapshot(&output));
    }

    #[test]
    fn test_production_layout() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path());
        let result = run(dir.path(), BuildMode::Production);
        let set = &result.artifacts;

        assert_eq!(set.count(ArtifactRole::Script), 2);
        assert_eq!(set.count(ArtifactRole::Stylesheet), 2);
        assert_eq!(set.count(ArtifactRole::Font), 1);
        // 4-byte logo is inlined
        assert_eq!(set.count(ArtifactRole::Image), 0);

        let paths: Vec<_> = set.paths().collect();
        assert!(paths.iter().any(|p| p.starts_with("assets/css/index.") && p.ends_with(".css") && !p.ends_with(".chunk.css")));
        assert!(paths.iter().any(|p| p.starts_with("assets/css/App.module.") && p.ends_with(".chunk.css")));
        assert!(paths.iter().any(|p| p.starts_with("assets/js/main.")));

        let html = String::from_utf8(fs::read(dir.path().join("dist/index.html")).unwrap()).unwrap();
        assert!(html.contains("<div id=\"root\"></div>"));
        assert!(html.contains("rel=\"stylesheet\""));
        assert!(html.contains("rel=\"modulepreload\""));
        assert!(html.contains("\"/@module/src/App.jsx\""));

        let main = set.iter().find(|a| a.meta.output_path.starts_with("assets/js/main.")).unwrap();
        let main = std::str::from_utf8(&main.bytes).unwrap();
        assert!(main.contains("\"production\""));
        assert!(!main.contains("index.css"));
    }

    #[test]
    fn test_development_has_no_stylesheets() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path());
        let result = run(dir.path(), BuildMode::Development);

        assert_eq!(result.artifacts.count(ArtifactRole::Stylesheet), 0);
        assert_eq!(result.artifacts.count(ArtifactRole::StyleInjector), 2);
        assert!(!dir.path().join("dist/assets/css").exists());

        let html = String::from_utf8(fs::read(dir.path().join("dist/index.html")).unwrap()).unwrap();
        assert!(!html.contains("rel=\"stylesheet\""));
        assert!(html.contains("\"/@module/src/index.css\""));
    }

    #[test]
    fn test_inline_limit_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/index.js", b"import a from './a.png';\nimport b from './b.png';\nconsole.log(a, b);\n");
        write(root, "src/a.png", &vec![7u8; 8192]);
        write(root, "src/b.png", &vec![7u8; 8193]);

        let result = run(root, BuildMode::Production);
        let images: Vec<_> = result
            .artifacts
            .iter()
            .filter(|a| a.meta.role == ArtifactRole::Image)
            .map(|a| a.meta.output_path.clone())
            .collect();
        assert_eq!(images.len(), 1);
        assert!(images[0].starts_with("assets/images/b."));

        let main = result.artifacts.iter().find(|a| a.meta.role == ArtifactRole::Script).unwrap();
        let main = std::str::from_utf8(&main.bytes).unwrap();
        assert!(main.contains("data:image/png;base64,"));
        assert!(main.contains(&format!("/{}", images[0])));
    }

    #[test]
    fn test_identical_assets_share_one_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(
            root,
            "src/index.js",
            b"import a from './a/icon.png';\nimport b from './b/icon.png';\nconsole.log(a, b);\n",
        );
        write(root, "src/a/icon.png", &vec![3u8; 9000]);
        write(root, "src/b/icon.png", &vec![3u8; 9000]);

        let result = run(root, BuildMode::Production);
        let images: Vec<_> = result
            .artifacts
            .iter()
            .filter(|a| a.meta.role == ArtifactRole::Image)
            .collect();
        assert_eq!(images.len(), 1);

        let main = result.artifacts.iter().find(|a| a.meta.role == ArtifactRole::Script).unwrap();
        let main = std::str::from_utf8(&main.bytes).unwrap();
        assert_eq!(main.matches(&format!("/{}", images[0].meta.output_path)).count(), 2);
    }

    #[test]
    fn test_stale_output_is_removed() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path());
        write(dir.path(), "dist/old.js", b"stale");
        write(dir.path(), "build/cache/x", b"stale");

        run(dir.path(), BuildMode::Production);
        assert!(!dir.path().join("dist/old.js").exists());
        assert!(dir.path().join("build").is_dir());
        assert_eq!(fs::read_dir(dir.path().join("build")).unwrap().count(), 0);
    }

    #[test]
    fn test_single_script_production() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", b"document.title = 'hi';\n");

        let result = run(dir.path(), BuildMode::Production);
        let paths: Vec<_> = result.artifacts.paths().map(str::to_string).collect();
        assert_eq!(paths.len(), 2);
        assert_eq!(paths[1], "index.html");
        assert!(paths[0].starts_with("assets/js/main.") && paths[0].ends_with(".js"));

        let html = String::from_utf8(fs::read(dir.path().join("dist/index.html")).unwrap()).unwrap();
        assert!(html.contains(&format!("<script type=\"module\" src=\"/{}\"></script>", paths[0])));
        assert!(!html.contains("modulepreload"));
    }

    fn changed_paths(before: &ArtifactSet, after: &ArtifactSet) -> Vec<String> {
        after
            .iter()
            .filter(|a| before.get(&a.meta.output_path).is_none_or(|b| b.bytes != a.bytes))
            .map(|a| a.meta.output_path.clone())
            .collect()
    }

    #[test]
    fn test_font_change_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path());
        write(dir.path(), "src/fonts/Mono.woff2", b"wOF2-mono");
        let before = run(dir.path(), BuildMode::Production).artifacts;

        write(dir.path(), "src/fonts/Mono.woff2", b"wOF2-mono-v2");
        let after = run(dir.path(), BuildMode::Production).artifacts;

        let changed = changed_paths(&before, &after);
        assert_eq!(changed.len(), 1, "{changed:?}");
        assert!(changed[0].starts_with("assets/fonts/Mono."));
        assert_eq!(before.len(), after.len());
    }

    #[test]
    fn test_referenced_font_change_reaches_only_referrers() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path());
        let before = run(dir.path(), BuildMode::Production).artifacts;

        write(dir.path(), "src/fonts/Inter.woff2", b"wOF2-other-bytes");
        let after = run(dir.path(), BuildMode::Production).artifacts;

        // the font, the stylesheet embedding its URL and the document linking it
        let changed = changed_paths(&before, &after);
        assert_eq!(changed.len(), 3, "{changed:?}");
        assert!(changed.iter().any(|p| p.starts_with("assets/fonts/Inter.")));
        assert!(changed.iter().any(|p| p.starts_with("assets/css/index.")));
        assert!(changed.contains(&"index.html".to_string()));
        assert!(after.paths().filter(|p| p.starts_with("assets/js/")).all(|p| before.get(p).is_some()));
    }

    #[test]
    fn test_superseded_build_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        project(dir.path());
        let generation = Generation::new();
        let options = BuildOptions {
            cancel: Some(generation.token()),
            quiet: true,
        };
        generation.bump();

        let err = build_with(&test_config_at(dir.path()), BuildMode::Production, &options).unwrap_err();
        assert!(err.is_superseded());
        assert!(!dir.path().join("dist/index.html").exists());
    }

    #[test]
    fn test_failed_transform_names_step() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "src/index.js", b"import { a } from './logo.png';\n");
        write(dir.path(), "src/logo.png", b"png");

        let err = build_with(&test_config_at(dir.path()), BuildMode::Production, &quiet()).unwrap_err();
        assert_eq!(err.step(), BuildStep::Transform);
        assert!(err.to_string().contains("compile-script"));
    }
}
