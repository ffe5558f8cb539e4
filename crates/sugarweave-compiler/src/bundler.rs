/// Script bundling
///
/// The story script is produced by an external bundler run on the entry file
/// of the scripts folder. The compiler only needs the bundled text back.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{BundlerConfig, ScriptsConfig};
use crate::error::{CompileError, Result};

/// Turns a script entry point into one self-contained script.
pub trait Bundler {
    /// Bundle `entry`. `build` selects the production flavor.
    fn bundle(&self, entry: &Path, build: bool) -> Result<String>;
}

/// Runs an external bundler and captures its standard output.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    program: String,
    args: Vec<String>,
    build_args: Vec<String>,
}

impl CommandBundler {
    pub fn new(config: &BundlerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            build_args: config.build_args.clone(),
        }
    }

    fn arguments(&self, entry: &Path, build: bool) -> Vec<String> {
        let entry = entry.to_string_lossy();
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace("{entry}", &entry))
            .collect();
        if build {
            args.extend(self.build_args.iter().cloned());
        }
        args
    }
}

impl Bundler for CommandBundler {
    fn bundle(&self, entry: &Path, build: bool) -> Result<String> {
        let args = self.arguments(entry, build);
        tracing::debug!("running bundler: {} {}", self.program, args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| CompileError::Bundle {
                diagnostics: format!("failed to run '{}': {}", self.program, e),
            })?;

        if !output.status.success() {
            let mut diagnostics = String::from_utf8_lossy(&output.stderr).into_owned();
            if diagnostics.trim().is_empty() {
                diagnostics = format!("'{}' exited with {}", self.program, output.status);
            }
            return Err(CompileError::Bundle { diagnostics });
        }

        String::from_utf8(output.stdout).map_err(|_| CompileError::Bundle {
            diagnostics: format!("'{}' produced non UTF-8 output", self.program),
        })
    }
}

/// Embeds the entry file as-is. Used when no bundler program is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct VerbatimBundler;

impl Bundler for VerbatimBundler {
    fn bundle(&self, entry: &Path, _build: bool) -> Result<String> {
        fs::read_to_string(entry).map_err(|e| CompileError::io(entry, e))
    }
}

/// Pick the bundler described by the configuration.
pub fn from_config(config: &BundlerConfig) -> Box<dyn Bundler> {
    if config.program.trim().is_empty() {
        Box::new(VerbatimBundler)
    } else {
        Box::new(CommandBundler::new(config))
    }
}

/// Locate `<entry>.<ext>` in `folder`, trying extensions in configured order.
pub fn find_entry(folder: &Path, scripts: &ScriptsConfig) -> Result<PathBuf> {
    if !folder.is_dir() {
        return Err(CompileError::PathNotFound(folder.to_path_buf()));
    }
    scripts
        .extensions
        .iter()
        .map(|ext| folder.join(format!("{}.{}", scripts.entry, ext)))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| CompileError::EntryNotFound {
            folder: folder.to_path_buf(),
            name: format!(
                "{}.{}",
                scripts.entry,
                scripts.extensions.first().map_or("js", String::as_str)
            ),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_placeholder_and_build_args() {
        let bundler = CommandBundler::new(&BundlerConfig::default());
        let entry = Path::new("scripts/index.ts");
        assert_eq!(
            bundler.arguments(entry, false),
            vec!["scripts/index.ts", "--bundle", "--format=iife"]
        );
        assert_eq!(
            bundler.arguments(entry, true),
            vec!["scripts/index.ts", "--bundle", "--format=iife", "--minify"]
        );
    }

    #[test]
    fn entry_is_found_by_extension_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.ts"), "").unwrap();
        fs::write(dir.path().join("index.jsx"), "").unwrap();
        let entry = find_entry(dir.path(), &ScriptsConfig::default()).unwrap();
        assert_eq!(entry.file_name().unwrap(), "index.ts");
    }

    #[test]
    fn missing_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("main.js"), "").unwrap();
        let err = find_entry(dir.path(), &ScriptsConfig::default()).unwrap_err();
        assert!(err.to_string().contains("index.js"));
    }

    #[test]
    fn verbatim_bundler_reads_entry() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("index.js");
        fs::write(&entry, "setup();").unwrap();
        assert_eq!(VerbatimBundler.bundle(&entry, true).unwrap(), "setup();");
    }

    #[test]
    fn missing_program_is_a_bundle_error() {
        let config = BundlerConfig {
            program: "sugarweave-no-such-bundler".into(),
            ..BundlerConfig::default()
        };
        let err = CommandBundler::new(&config)
            .bundle(Path::new("index.js"), false)
            .unwrap_err();
        assert!(matches!(err, CompileError::Bundle { .. }));
    }
}
