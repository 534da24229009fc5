//! `build` command: one build of the whole project, committed to the
//! output directory.

use anyhow::{Result, anyhow};

use crate::config::ProjectConfig;
use crate::core::{BuildMode, SourceKind};
use crate::log;
use crate::output::ArtifactRole;
use crate::pipeline::{self, BuildError, BuildResult};

pub fn build(config: &ProjectConfig, mode: BuildMode) -> Result<()> {
    let built = pipeline::build(config, mode).map_err(|e| report(config, e))?;
    log!("build"; "{}", summary(config, &built));

    for kind in SourceKind::ALL {
        if let Some(count) = built.counts.get(&kind) {
            crate::debug!("build"; "{}: {} source file(s)", kind.name(), count);
        }
    }
    Ok(())
}

/// `<step>: <file>: <cause>` with the full cause chain.
fn report(config: &ProjectConfig, error: BuildError) -> anyhow::Error {
    let step = error.step();
    let location = error
        .file()
        .map(|file| format!("{}: ", config.root_relative(file).display()))
        .unwrap_or_default();
    let chain = format!("{:#}", anyhow::Error::from(error));
    anyhow!("{step} step failed: {location}{chain}")
}

fn summary(config: &ProjectConfig, built: &BuildResult) -> String {
    let set = &built.artifacts;
    format!(
        "{} build in {:.2}s: {} script(s), {} stylesheet(s), {} image(s), {} font(s), {} total -> {}",
        built.mode,
        built.elapsed.as_secs_f64(),
        set.count(ArtifactRole::Script) + set.count(ArtifactRole::StyleInjector),
        set.count(ArtifactRole::Stylesheet),
        set.count(ArtifactRole::Image),
        set.count(ArtifactRole::Font),
        format_size(set.total_bytes()),
        config.root_relative(&config.build.output).display(),
    )
}

/// Human-readable byte count.
fn format_size(bytes: usize) -> String {
    const UNITS: [&str; 3] = ["KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
