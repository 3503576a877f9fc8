// premerge-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes `content` to `path` through a temporary file in the same directory,
/// then renames it into place. Readers see either the old file or the new one.
/// Missing parent directories are created.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    stage(path, content.as_ref())?
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;
    Ok(())
}

/// Writes a set of files that belong together. Every file is staged in a
/// temporary sibling first; nothing is renamed into place until all of them
/// are fully written, so a failed write leaves the previous set untouched.
/// Only a failing rename part-way through can still leave a mix.
pub fn atomic_write_all<C: AsRef<[u8]>>(
    files: &[(PathBuf, C)],
) -> Result<(), InfrastructureError> {
    let mut staged: Vec<(NamedTempFile, &Path)> = Vec::with_capacity(files.len());
    for (path, content) in files {
        staged.push((stage(path, content.as_ref())?, path.as_path()));
    }
    for (temp_file, path) in staged {
        temp_file
            .persist(path)
            .map_err(|e| InfrastructureError::Io(e.error))?;
    }
    Ok(())
}

fn stage(path: &Path, content: &[u8]) -> Result<NamedTempFile, InfrastructureError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp_file = NamedTempFile::new_in(parent)?;
    temp_file.write_all(content)?;
    temp_file.flush()?;
    Ok(temp_file)
}

pub fn ensure_dir(dir: &Path) -> Result<(), InfrastructureError> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}
