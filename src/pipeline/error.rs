//! Build error taxonomy.
//!
//! Every variant knows the pipeline step it aborted, so the CLI can report
//! `<step>: <file>: <cause>` without inspecting the message.

use std::path::{Path, PathBuf};
use std::{fmt, io};

use thiserror::Error;

use crate::resolve::UnknownAliasError;
use crate::transform::TransformError;

/// Orchestrator steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildStep {
    Clean,
    Classify,
    Transform,
    Optimize,
    Emit,
    EntryDocument,
    Commit,
}

impl BuildStep {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Classify => "classify",
            Self::Transform => "transform",
            Self::Optimize => "optimize",
            Self::Emit => "emit",
            Self::EntryDocument => "entry-document",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed build. Nothing has been committed when this is returned.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("cannot clean `{}`", path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}: cannot resolve `{specifier}`", file.display())]
    UnknownAlias {
        file: PathBuf,
        specifier: String,
        #[source]
        source: UnknownAliasError,
    },

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("{}: minification failed: {cause}", file.display())]
    Optimize { file: PathBuf, cause: String },

    #[error(
        "`{output}` would be written by both `{}` and `{}`",
        first.display(),
        second.display()
    )]
    NamingCollision {
        output: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("{step}: `{}`", path.display())]
    Io {
        step: BuildStep,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("build superseded by a newer change")]
    Superseded { step: BuildStep },
}

impl BuildError {
    /// Step that produced this error.
    pub const fn step(&self) -> BuildStep {
        match self {
            Self::Cleanup { .. } => BuildStep::Clean,
            Self::UnknownAlias { .. } => BuildStep::Classify,
            Self::Transform(_) => BuildStep::Transform,
            Self::Optimize { .. } => BuildStep::Optimize,
            Self::NamingCollision { .. } => BuildStep::Emit,
            Self::Io { step, .. } | Self::Superseded { step } => *step,
        }
    }

    /// File the failure is attributed to, if any.
    pub fn file(&self) -> Option<&Path> {
        match self {
            Self::Cleanup { path, .. } | Self::Io { path, .. } => Some(path),
            Self::UnknownAlias { file, .. } | Self::Optimize { file, .. } => Some(file),
            Self::Transform(e) => Some(&e.file),
            Self::NamingCollision { second, .. } => Some(second),
            Self::Superseded { .. } => None,
        }
    }

    #[inline]
    pub const fn is_superseded(&self) -> bool {
        matches!(self, Self::Superseded { .. })
    }

    pub(crate) fn io(step: BuildStep, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            step,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::StepName;

    #[test]
    fn test_step_identity() {
        let err = BuildError::from(TransformError::new(
            "src/App.jsx",
            StepName::CompileScript,
            "unexpected token",
        ));
        assert_eq!(err.step(), BuildStep::Transform);
        assert!(err.to_string().contains("compile-script"));

        let err = BuildError::io(
            BuildStep::Commit,
            "dist/index.html",
            io::Error::other("disk full"),
        );
        assert_eq!(err.step(), BuildStep::Commit);
        assert_eq!(err.to_string(), "commit: `dist/index.html`");
    }

    #[test]
    fn test_collision_names_both_sources() {
        let err = BuildError::NamingCollision {
            output: "assets/images/logo.0123abcd.png".into(),
            first: "src/a/logo.png".into(),
            second: "src/b/logo.png".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("src/a/logo.png"));
        assert!(msg.contains("src/b/logo.png"));
        assert_eq!(err.step(), BuildStep::Emit);
    }
}
