/// Distribution bundle
///
/// `dist/` holds the compiled story HTML (named after the story) next to a
/// copy of every static asset, ready to upload as-is.

use std::fs;
use std::path::{Path, PathBuf};

use crate::decompile::file_stem_for;
use crate::driver::{CompileOutput, Compiler};
use crate::error::{CompileError, Result};

/// Copy `src` to `dest`: a file is copied, a directory is recreated with
/// all of its contents. Paths listed in `except` are skipped, as is `dest`
/// itself when it lives inside `src`. Paths are compared after
/// canonicalization, so `./src/static` and `src/static` are the same.
pub fn copy_recursive(src: &Path, dest: &Path, except: &[PathBuf]) -> Result<()> {
    let except: Vec<PathBuf> = except.iter().map(|p| canonical(p)).collect();
    copy_entry(src, dest, &except, None)
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn copy_entry(src: &Path, dest: &Path, except: &[PathBuf], root: Option<&Path>) -> Result<()> {
    let resolved = canonical(src);
    if except.contains(&resolved) || root == Some(resolved.as_path()) {
        return Ok(());
    }

    let meta = fs::metadata(src).map_err(|e| CompileError::io(src, e))?;
    if meta.is_dir() {
        fs::create_dir_all(dest).map_err(|e| CompileError::io(dest, e))?;
        // `dest` exists from here on, so it canonicalizes like any source path
        let root = match root {
            Some(root) => root.to_path_buf(),
            None => canonical(dest),
        };
        let entries = fs::read_dir(src).map_err(|e| CompileError::io(src, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CompileError::io(src, e))?;
            copy_entry(&entry.path(), &dest.join(entry.file_name()), except, Some(&root))?;
        }
    } else {
        fs::copy(src, dest).map_err(|e| CompileError::io(src, e))?;
        tracing::debug!("copied {} -> {}", src.display(), dest.display());
    }
    Ok(())
}

/// Compile in build mode and assemble the dist folder from scratch.
///
/// Returns the compile output and the path of the story HTML in dist.
pub fn build_dist(compiler: &Compiler) -> Result<(CompileOutput, PathBuf)> {
    let config = &compiler.options().config;
    let output = compiler.compile_to_file()?;

    let dist = &config.dist_path;
    if dist.exists() {
        fs::remove_dir_all(dist).map_err(|e| CompileError::io(dist, e))?;
    }
    fs::create_dir_all(dist).map_err(|e| CompileError::io(dist, e))?;

    if config.static_path.is_dir() {
        let entries =
            fs::read_dir(&config.static_path).map_err(|e| CompileError::io(&config.static_path, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| CompileError::io(&config.static_path, e))?;
            copy_recursive(&entry.path(), &dist.join(entry.file_name()), &[])?;
        }
    } else {
        tracing::warn!("static folder {} not found, nothing to copy", config.static_path.display());
    }

    let stem = file_stem_for(&output.story.project.info.name);
    let html_path = dist.join(format!("{stem}.html"));
    fs::write(&html_path, &output.html).map_err(|e| CompileError::io(&html_path, e))?;
    tracing::info!("built {}", html_path.display());

    Ok((output, html_path))
}
