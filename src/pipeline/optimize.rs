//! Step 7: production stylesheet minification on a worker pool.

use std::num::NonZeroUsize;
use std::sync::OnceLock;
use std::thread;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::BuildError;
use crate::debug;
use crate::transform::minify::minify_css;
use crate::transform::{Emission, Unit};

/// Pool sized one below the logical CPU count, at least one worker.
fn pool() -> Option<&'static ThreadPool> {
    static POOL: OnceLock<Option<ThreadPool>> = OnceLock::new();
    POOL.get_or_init(|| {
        let threads = worker_count();
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("packwright-minify-{i}"))
            .build()
            .inspect_err(|e| debug!("optimize"; "minify pool unavailable: {e}"))
            .ok()
    })
    .as_ref()
}

fn worker_count() -> usize {
    thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
        .saturating_sub(1)
        .max(1)
}

/// Minify every extracted stylesheet in place.
///
/// The first failure in unit order is reported; later ones are dropped.
pub fn minify_stylesheets(units: &mut [Unit]) -> Result<(), BuildError> {
    let run = |units: &mut [Unit]| -> Vec<Result<(), BuildError>> {
        units
            .par_iter_mut()
            .filter(|unit| unit.emission == Emission::Stylesheet)
            .map(minify_unit)
            .collect()
    };

    let results = match pool() {
        Some(pool) => pool.install(|| run(units)),
        None => run(units),
    };
    results.into_iter().collect()
}

fn minify_unit(unit: &mut Unit) -> Result<(), BuildError> {
    let optimize_error = |cause: String| BuildError::Optimize {
        file: unit.source.clone(),
        cause,
    };
    let source = std::str::from_utf8(&unit.bytes).map_err(|e| optimize_error(e.to_string()))?;
    let filename = unit.source.to_string_lossy();
    let minified = minify_css(source, &filename).map_err(|e| optimize_error(format!("{e:#}")))?;

    debug!("optimize"; "{}: {} -> {} bytes", filename, unit.bytes.len(), minified.len());
    unit.bytes = minified.into_bytes();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SourceKind;
    use std::path::PathBuf;

    fn stylesheet(name: &str, css: &str) -> Unit {
        let mut unit = Unit::new(PathBuf::from(name), SourceKind::Style, css.as_bytes().to_vec());
        unit.emission = Emission::Stylesheet;
        unit
    }

    #[test]
    fn test_worker_count_leaves_a_core() {
        let cpus = thread::available_parallelism().map(NonZeroUsize::get).unwrap_or(1);
        assert_eq!(worker_count(), cpus.saturating_sub(1).max(1));
    }

    #[test]
    fn test_minifies_only_stylesheets() {
        let mut injector = stylesheet("b.css", "a {\n  color: red;\n}\n");
        injector.emission = Emission::StyleInjector;
        let mut units = vec![stylesheet("a.css", "a {\n  color: #ff0000;\n}\n"), injector];

        minify_stylesheets(&mut units).unwrap();

        let minified = std::str::from_utf8(&units[0].bytes).unwrap();
        assert!(!minified.contains('\n'));
        assert!(minified.contains("color:red"));
        assert_eq!(units[1].bytes, b"a {\n  color: red;\n}\n");
    }

    #[test]
    fn test_failure_names_the_file() {
        let mut binary = stylesheet("binary.css", "");
        binary.bytes = vec![0xff, 0xfe];
        let mut units = vec![stylesheet("ok.css", "a { color: red }"), binary];

        match minify_stylesheets(&mut units).unwrap_err() {
            BuildError::Optimize { file, .. } => assert_eq!(file, PathBuf::from("binary.css")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
