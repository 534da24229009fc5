//! Step 1: empty the output directory and the secondary directories.

use std::fs;
use std::io;
use std::path::Path;

use super::BuildError;
use crate::config::ProjectConfig;
use crate::debug;

/// Empty `build.output` and every `build.clean` directory, recreating them.
pub fn clean_outputs(config: &ProjectConfig) -> Result<(), BuildError> {
    for dir in std::iter::once(&config.build.output).chain(&config.build.clean) {
        empty_dir(dir).map_err(|source| BuildError::Cleanup {
            path: dir.clone(),
            source,
        })?;
    }
    Ok(())
}

/// Remove everything inside `dir`; create it when missing.
pub fn empty_dir(dir: &Path) -> io::Result<()> {
    if !dir.exists() {
        return fs::create_dir_all(dir);
    }
    if !dir.is_dir() {
        return Err(io::Error::other("not a directory"));
    }

    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    entries.sort_by_key(|e| e.path());
    for entry in entries {
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
        debug!("clean"; "removed {}", path.display());
    }
    Ok(())
}
