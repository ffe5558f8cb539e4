/// Catalog scanning
///
/// Recursively lists the files under a directory whose extension matches
/// one of a set of accepted extensions.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CompileError, Result};

/// Collect every file below `root` whose extension is in `extensions`
/// (compared case-insensitively, without the leading dot).
///
/// Paths are returned sorted so that anything derived from discovery order
/// (auto-assigned pids and positions, stylesheet concatenation) is the same
/// on every platform. Symlink cycles are not guarded against.
pub fn collect_files(root: &Path, extensions: &[impl AsRef<str>]) -> Result<Vec<PathBuf>> {
    check_directory(root)?;

    let extensions: Vec<String> = extensions
        .iter()
        .map(|ext| ext.as_ref().trim_start_matches('.').to_lowercase())
        .collect();

    let mut files = Vec::new();
    walk(root, &extensions, &mut files)?;
    files.sort();

    tracing::debug!("found {} file(s) under {}", files.len(), root.display());
    Ok(files)
}

/// Fail unless `path` exists and is a directory.
pub fn check_directory(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|_| CompileError::PathNotFound(path.to_path_buf()))?;
    if !meta.is_dir() {
        return Err(CompileError::NotADirectory(path.to_path_buf()));
    }
    Ok(())
}

fn walk(dir: &Path, extensions: &[String], out: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| CompileError::io(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| CompileError::io(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| CompileError::io(&path, e))?;

        // Follow symlinks to directories like a plain stat would
        if file_type.is_dir() || (file_type.is_symlink() && path.is_dir()) {
            walk(&path, extensions, out)?;
        } else if has_extension(&path, extensions) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|accepted| *accepted == ext.to_lowercase()))
        .unwrap_or(false)
}

/// File name without its extension, used as the fallback passage name.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}
