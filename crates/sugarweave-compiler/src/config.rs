/// Tool configuration
///
/// Every path and constant the compiler and decompiler rely on. Defaults
/// describe the conventional project layout; a `sugarweave.json` file can
/// override any subset of keys.

use std::fs;
use std::path::{Path, PathBuf};
use serde::Deserialize;

use crate::error::{CompileError, Result};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "sugarweave.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Story formats accepted by the validator and the extractor
    pub supported_formats: Vec<String>,
    /// Folder holding passages, `_project.json`, styles and scripts
    pub project_path: PathBuf,
    /// Folder holding assets copied verbatim into the dist bundle
    pub static_path: PathBuf,
    pub project_file_name: String,
    /// HTML template containing the passage data marker
    pub template_path: PathBuf,
    pub output_html_path: PathBuf,
    pub dist_path: PathBuf,
    pub passage_data_marker: String,
    pub passage_extensions: Vec<String>,
    pub styles: StylesConfig,
    pub scripts: ScriptsConfig,
    pub passage_format: PassageFormat,
    pub bundler: BundlerConfig,
    pub server: ServerConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StylesConfig {
    pub folder: String,
    pub extensions: Vec<String>,
    /// File name used when decompiling the single stylesheet
    pub default_file: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptsConfig {
    pub folder: String,
    pub extensions: Vec<String>,
    /// Entry file stem, resolved against `extensions` in order
    pub entry: String,
    pub default_file: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PassageFormat {
    pub meta_delimiter: String,
    pub default_size: String,
    pub max_position: i64,
    pub position_delta: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundlerConfig {
    /// External bundler executable. Empty embeds the entry file verbatim.
    pub program: String,
    /// Arguments; `{entry}` is replaced by the entry file path
    pub args: Vec<String>,
    /// Extra arguments appended in build mode
    pub build_args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatchConfig {
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            supported_formats: vec!["SugarCube".to_string()],
            project_path: PathBuf::from("src/story"),
            static_path: PathBuf::from("src/static"),
            project_file_name: "_project.json".to_string(),
            template_path: PathBuf::from("index.html"),
            output_html_path: PathBuf::from(".dist.html"),
            dist_path: PathBuf::from("dist"),
            passage_data_marker: "<!--tw-passagedata-->".to_string(),
            passage_extensions: vec!["md".to_string()],
            styles: StylesConfig::default(),
            scripts: ScriptsConfig::default(),
            passage_format: PassageFormat::default(),
            bundler: BundlerConfig::default(),
            server: ServerConfig::default(),
            watch: WatchConfig::default(),
        }
    }
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            folder: "styles".to_string(),
            extensions: vec!["css".to_string()],
            default_file: "styles.css".to_string(),
        }
    }
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            folder: "scripts".to_string(),
            extensions: ["js", "ts", "tsx", "jsx"].iter().map(|s| s.to_string()).collect(),
            entry: "index".to_string(),
            default_file: "index.js".to_string(),
        }
    }
}

impl Default for PassageFormat {
    fn default() -> Self {
        Self {
            meta_delimiter: "=".repeat(20),
            default_size: "100,100".to_string(),
            max_position: 10_000,
            position_delta: 150,
        }
    }
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            program: "esbuild".to_string(),
            args: vec![
                "{entry}".to_string(),
                "--bundle".to_string(),
                "--format=iife".to_string(),
            ],
            build_args: vec!["--minify".to_string()],
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl Config {
    /// Load configuration from `path`, or from `sugarweave.json` in the
    /// working directory when it exists, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.is_file() {
                    tracing::debug!("no {} found, using default configuration", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path).map_err(|e| CompileError::io(&path, e))?;
        let config = Self::from_json(&text)
            .map_err(|e| CompileError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and sanity-check a JSON configuration document.
    pub fn from_json(text: &str) -> std::result::Result<Self, String> {
        let config: Config = serde_json::from_str(text).map_err(|e| e.to_string())?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> std::result::Result<(), String> {
        if self.passage_format.position_delta <= 0 {
            return Err("passage_format.position_delta must be positive".into());
        }
        if self.passage_format.max_position < self.passage_format.position_delta {
            return Err("passage_format.max_position must be at least position_delta".into());
        }
        if self.passage_format.meta_delimiter.is_empty()
            || self.passage_format.meta_delimiter.chars().any(|c| c != '=')
        {
            return Err("passage_format.meta_delimiter must be a row of '='".into());
        }
        if self.passage_data_marker.is_empty() {
            return Err("passage_data_marker cannot be empty".into());
        }
        if self.supported_formats.is_empty() {
            return Err("supported_formats cannot be empty".into());
        }
        Ok(())
    }

    /// Path of the project-info JSON file.
    pub fn project_file_path(&self) -> PathBuf {
        self.project_path.join(&self.project_file_name)
    }

    pub fn styles_path(&self) -> PathBuf {
        self.project_path.join(&self.styles.folder)
    }

    pub fn scripts_path(&self) -> PathBuf {
        self.project_path.join(&self.scripts.folder)
    }

    /// Root every other path is resolved against.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.project_path = root.join(&self.project_path);
        self.static_path = root.join(&self.static_path);
        self.template_path = root.join(&self.template_path);
        self.output_html_path = root.join(&self.output_html_path);
        self.dist_path = root.join(&self.dist_path);
        self
    }
}
