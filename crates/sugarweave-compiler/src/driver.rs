/// Compiler driver
///
/// Sequences one compile run: project info, stylesheet, script bundle, tags,
/// passages, then the HTML output. Nothing is written until every step has
/// succeeded.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bundler::{self, Bundler};
use crate::catalog::{collect_files, file_stem};
use crate::config::{Config, PassageFormat};
use crate::embed::{splice_into_template, StoryData};
use crate::error::{CompileError, Result};
use crate::layout::{format_position, PassageAllocator};
use crate::passage::{parse_passage, Passage, RawPassage};
use crate::project::{ProjectFile, ValidationError};

/// Options for one compile run.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub config: Config,
    /// Production build: no dev bootstrap, bundler build flags
    pub build: bool,
}

impl CompileOptions {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            build: false,
        }
    }

    pub fn build_mode(mut self, build: bool) -> Self {
        self.build = build;
        self
    }
}

/// Result of a successful compile.
#[derive(Debug, Clone)]
pub struct CompileOutput {
    /// Template with the story data spliced in
    pub html: String,
    pub story: StoryData,
    /// First pid no passage uses yet; `None` when `u32::MAX` is taken
    pub next_pid: Option<u32>,
}

/// Compiles a project directory into a story HTML file.
pub struct Compiler {
    options: CompileOptions,
    bundler: Box<dyn Bundler>,
}

impl Compiler {
    /// Create a compiler using the bundler named in the configuration.
    pub fn new(options: CompileOptions) -> Self {
        let bundler = bundler::from_config(&options.config.bundler);
        Self { options, bundler }
    }

    pub fn with_bundler(options: CompileOptions, bundler: Box<dyn Bundler>) -> Self {
        Self { options, bundler }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Run every compile step in memory.
    pub fn compile(&self) -> Result<CompileOutput> {
        let config = &self.options.config;

        let project = load_project(config)?;
        tracing::info!("loaded project '{}'", project.info.name);

        let stylesheet = load_stylesheet(config)?;

        let entry = bundler::find_entry(&config.scripts_path(), &config.scripts)?;
        let script = self.bundler.bundle(&entry, self.options.build)?;
        tracing::info!("bundled script from {}", entry.display());

        let sources = load_passages(config)?;
        let (passages, allocator) = resolve_passages(sources, &config.passage_format)?;
        tracing::info!("compiled {} passage(s)", passages.len());

        if !passages.iter().any(|p| p.pid == project.info.startnode) {
            tracing::warn!(
                "startnode {} does not match any passage pid",
                project.info.startnode
            );
        }

        let story = StoryData {
            project,
            stylesheet,
            script,
            passages,
        };

        let template_path = &config.template_path;
        let template =
            fs::read_to_string(template_path).map_err(|e| CompileError::io(template_path, e))?;
        let html = splice_into_template(
            &template,
            &config.passage_data_marker,
            &story.render(self.options.build),
        )
        .ok_or_else(|| CompileError::MarkerNotFound {
            marker: config.passage_data_marker.clone(),
            template: template_path.clone(),
        })?;

        Ok(CompileOutput {
            html,
            story,
            next_pid: allocator.next_available_pid(),
        })
    }

    /// Compile and write the result to the configured output path.
    pub fn compile_to_file(&self) -> Result<CompileOutput> {
        let output = self.compile()?;
        let path = &self.options.config.output_html_path;
        write_file(path, &output.html)?;
        tracing::info!("wrote {}", path.display());
        Ok(output)
    }
}

/// Read and validate `_project.json`.
pub fn load_project(config: &Config) -> Result<ProjectFile> {
    let path = config.project_file_path();
    let text = fs::read_to_string(&path).map_err(|e| CompileError::ProjectFile {
        path: path.clone(),
        message: e.to_string(),
    })?;
    ProjectFile::from_json(&text, &config.supported_formats).map_err(|e| match e {
        ValidationError::Malformed(message) => CompileError::ProjectFile { path, message },
        other => CompileError::Validation(other),
    })
}

/// Concatenate every stylesheet, one newline between files.
pub fn load_stylesheet(config: &Config) -> Result<String> {
    let files = collect_files(&config.styles_path(), &config.styles.extensions)?;
    let mut parts = Vec::with_capacity(files.len());
    for file in &files {
        tracing::debug!("adding stylesheet {}", file.display());
        parts.push(fs::read_to_string(file).map_err(|e| CompileError::io(file, e))?);
    }
    Ok(parts.join("\n"))
}

/// Read and parse every passage file under the project folder.
pub fn load_passages(config: &Config) -> Result<Vec<(PathBuf, RawPassage)>> {
    let files = collect_files(&config.project_path, &config.passage_extensions)?;
    files
        .into_iter()
        .map(|path| {
            let text = fs::read_to_string(&path).map_err(|e| CompileError::io(&path, e))?;
            tracing::debug!("parsed passage {}", path.display());
            Ok((path, parse_passage(&text)))
        })
        .collect()
}

/// Fill in names, pids, tags, positions and sizes.
///
/// All explicit pids and positions are registered before anything is
/// assigned, so auto-assigned values never collide with an explicit value
/// that appears later in `sources`.
pub fn resolve_passages(
    sources: Vec<(PathBuf, RawPassage)>,
    format: &PassageFormat,
) -> Result<(Vec<Passage>, PassageAllocator)> {
    let mut allocator = PassageAllocator::new(format);
    let mut names: HashMap<String, PathBuf> = HashMap::new();
    let mut pids: HashMap<u32, String> = HashMap::new();
    let mut explicit_pids = Vec::with_capacity(sources.len());

    for (path, raw) in &sources {
        let name = passage_name(path, raw);
        if let Some(first) = names.insert(name.clone(), path.clone()) {
            return Err(CompileError::DuplicateName {
                name,
                first,
                second: path.clone(),
            });
        }

        let pid = match RawPassage::field(&raw.pid) {
            Some(value) => Some(parse_pid(&name, value)?),
            None => None,
        };
        if let Some(pid) = pid {
            if let Some(first) = pids.insert(pid, name.clone()) {
                return Err(CompileError::DuplicatePid {
                    pid,
                    first,
                    second: name,
                });
            }
            allocator.reserve_pid(pid);
        }
        explicit_pids.push(pid);

        if let Some(position) = RawPassage::field(&raw.position) {
            if !allocator.reserve_position(position) {
                tracing::warn!("passage '{}': ignoring unparseable position '{}'", name, position);
            }
        }
    }

    tracing::info!("biggest explicit pid: {}", allocator.biggest_pid());

    let mut passages = Vec::with_capacity(sources.len());
    for ((path, raw), pid) in sources.into_iter().zip(explicit_pids) {
        let name = passage_name(&path, &raw);
        let pid = match pid {
            Some(pid) => pid,
            None => allocator
                .next_pid()
                .ok_or_else(|| CompileError::PidSpaceExhausted { passage: name.clone() })?,
        };
        let position = match RawPassage::field(&raw.position) {
            Some(position) => position.to_string(),
            None => format_position(allocator.next_position()),
        };
        passages.push(Passage {
            pid,
            name,
            tags: raw.tags.unwrap_or_default(),
            position,
            size: RawPassage::field(&raw.size)
                .unwrap_or(&format.default_size)
                .to_string(),
            content: raw.content,
        });
    }

    Ok((passages, allocator))
}

/// A non-empty `name` in the metadata block wins over the file name.
fn passage_name(path: &Path, raw: &RawPassage) -> String {
    RawPassage::field(&raw.name)
        .map(str::to_string)
        .unwrap_or_else(|| file_stem(path))
}

fn parse_pid(name: &str, value: &str) -> Result<u32> {
    match value.parse::<u32>() {
        Ok(pid) if pid > 0 => Ok(pid),
        _ => Err(CompileError::InvalidPid {
            passage: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Write `contents`, creating parent directories as needed.
pub(crate) fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| CompileError::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| CompileError::io(path, e))
}
