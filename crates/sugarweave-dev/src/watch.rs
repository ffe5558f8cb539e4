/// Rebuild on change.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use sugarweave_compiler::{CompileOptions, Compiler, Config};

/// Directory watched for source changes: the parent of the project folder,
/// so that the static folder and template next to it are covered too.
pub fn watch_root(config: &Config) -> PathBuf {
    match config.project_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Compile once in dev mode. Failures are logged, never fatal.
pub fn rebuild(config: &Config) -> bool {
    let compiler = Compiler::new(CompileOptions::new(config.clone()));
    match compiler.compile_to_file() {
        Ok(output) => {
            tracing::info!(
                "compiled {} ({} passages, next pid {})",
                config.output_html_path.display(),
                output.story.passages.len(),
                output.next_pid.map_or_else(|| "none".to_string(), |pid| pid.to_string())
            );
            true
        }
        Err(e) => {
            tracing::error!("compilation failed: {}", e);
            false
        }
    }
}

/// Events worth a rebuild: anything except the compiled output itself and
/// hidden files, which editors create and delete constantly.
fn relevant(events: &[DebouncedEvent], output: &Path) -> bool {
    events.iter().any(|event| {
        let hidden = event
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with('.'));
        !hidden && !same_file(&event.path, output)
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b || a.ends_with(b),
    }
}

/// Block forever, recompiling after each quiet period following a change.
pub fn watch(config: &Config) -> Result<()> {
    let root = watch_root(config);
    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(config.watch.debounce_ms), tx)
        .context("failed to create file watcher")?;
    debouncer
        .watcher()
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;
    tracing::info!("watching {}", root.display());

    for result in rx {
        match result {
            Ok(events) => {
                if relevant(&events, &config.output_html_path) {
                    for event in &events {
                        tracing::debug!("changed: {}", event.path.display());
                    }
                    rebuild(config);
                }
            }
            Err(e) => tracing::warn!("watch error: {:?}", e),
        }
    }
    Ok(())
}
