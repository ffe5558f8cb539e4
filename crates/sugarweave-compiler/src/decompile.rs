/// Decompiler
///
/// Turns a folder holding one compiled story HTML (plus its assets) back into
/// an editable project: `_project.json`, one stylesheet, one script, one
/// Markdown file per passage, the HTML template and the static assets.
///
/// Files are written one after another; a failure part way through leaves
/// the ones already written in place.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::catalog::check_directory;
use crate::config::Config;
use crate::dist::copy_recursive;
use crate::driver::write_file;
use crate::error::{CompileError, Result};
use crate::extract::{extract_story, ExtractedStory};

/// Summary of a decompile run.
#[derive(Debug, Clone)]
pub struct DecompileReport {
    pub html_path: PathBuf,
    pub story_name: String,
    pub passages: Vec<PathBuf>,
}

pub struct Decompiler {
    config: Config,
}

impl Decompiler {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Decompile the single HTML file found directly in `input_dir`.
    pub fn decompile_dir(&self, input_dir: &Path) -> Result<DecompileReport> {
        let html_path = find_story_html(input_dir)?;
        tracing::info!("HTML file found: {}", html_path.display());
        self.decompile(input_dir, &html_path)
    }

    pub fn decompile(&self, input_dir: &Path, html_path: &Path) -> Result<DecompileReport> {
        let config = &self.config;
        let html = fs::read_to_string(html_path).map_err(|e| CompileError::io(html_path, e))?;
        let story = extract_story(&html, &config.passage_data_marker, &config.supported_formats)?;

        fs::create_dir_all(&config.project_path)
            .map_err(|e| CompileError::io(&config.project_path, e))?;

        write_file(&config.template_path, &story.template)?;
        write_file(&config.project_file_path(), &story.project.to_json_pretty())?;
        write_file(
            &config.styles_path().join(&config.styles.default_file),
            &story.stylesheet,
        )?;
        write_file(
            &config.scripts_path().join(&config.scripts.default_file),
            &story.script,
        )?;
        let passages = self.write_passages(&story)?;

        if !config.static_path.exists() {
            fs::create_dir_all(&config.static_path)
                .map_err(|e| CompileError::io(&config.static_path, e))?;
        }
        copy_recursive(input_dir, &config.static_path, &[html_path.to_path_buf()])?;
        tracing::info!("copied assets to {}", config.static_path.display());

        Ok(DecompileReport {
            html_path: html_path.to_path_buf(),
            story_name: story.project.info.name,
            passages,
        })
    }

    fn write_passages(&self, story: &ExtractedStory) -> Result<Vec<PathBuf>> {
        let extension = self
            .config
            .passage_extensions
            .first()
            .map_or("md", String::as_str);
        let delimiter = &self.config.passage_format.meta_delimiter;

        let mut used = HashSet::new();
        let mut written = Vec::with_capacity(story.passages.len());
        for passage in &story.passages {
            let name = passage.name.as_deref().unwrap_or_default();
            let stem = unique_stem(&file_stem_for(name), &mut used);
            let path = self.config.project_path.join(format!("{stem}.{extension}"));
            write_file(&path, &passage.to_source(delimiter))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// The one `.html` file directly inside `dir`.
///
/// Zero or several HTML files is a usage error.
pub fn find_story_html(dir: &Path) -> Result<PathBuf> {
    check_directory(dir).map_err(|e| match e {
        CompileError::PathNotFound(_) => {
            CompileError::Usage("The specified path does not exist.".into())
        }
        CompileError::NotADirectory(_) => {
            CompileError::Usage("The specified path is not a directory.".into())
        }
        other => other,
    })?;

    let mut html_files = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CompileError::io(dir, e))? {
        let path = entry.map_err(|e| CompileError::io(dir, e))?.path();
        let is_html = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("html"));
        if is_html && path.is_file() {
            html_files.push(path);
        }
    }

    match html_files.len() {
        0 => Err(CompileError::Usage(
            "No HTML files found in the specified directory.".into(),
        )),
        1 => Ok(html_files.remove(0)),
        _ => Err(CompileError::Usage(
            "More than one HTML file found in the specified directory. There should only be one."
                .into(),
        )),
    }
}

/// Passage names may contain characters no file system accepts; those are
/// replaced. The real name is kept in the metadata block.
pub(crate) fn file_stem_for(name: &str) -> String {
    let stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let stem = stem.trim_end_matches(['.', ' ']).to_string();
    if stem.is_empty() {
        "passage".to_string()
    } else {
        stem
    }
}

fn unique_stem(stem: &str, used: &mut HashSet<String>) -> String {
    if used.insert(stem.to_lowercase()) {
        return stem.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{stem}-{n}");
        if used.insert(candidate.to_lowercase()) {
            tracing::warn!("passage file name '{}' already taken, using '{}'", stem, candidate);
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsafe_characters_are_replaced() {
        assert_eq!(file_stem_for("Where: now?"), "Where_ now_");
        assert_eq!(file_stem_for("a/b\\c"), "a_b_c");
        assert_eq!(file_stem_for("..."), "passage");
        assert_eq!(file_stem_for("Start"), "Start");
    }

    #[test]
    fn colliding_stems_get_a_suffix() {
        let mut used = HashSet::new();
        assert_eq!(unique_stem("a_b", &mut used), "a_b");
        assert_eq!(unique_stem("A_B", &mut used), "A_B-2");
        assert_eq!(unique_stem("a_b", &mut used), "a_b-3");
    }

    #[test]
    fn html_count_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_story_html(dir.path()).unwrap_err().is_usage());

        fs::write(dir.path().join("story.HTML"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        assert_eq!(
            find_story_html(dir.path()).unwrap().file_name().unwrap(),
            "story.HTML"
        );

        fs::write(dir.path().join("other.html"), "").unwrap();
        assert!(find_story_html(dir.path()).unwrap_err().is_usage());
    }

    #[test]
    fn missing_directory_is_a_usage_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_story_html(&dir.path().join("nope")).unwrap_err().is_usage());
    }
}
