/// Error types for compiling and decompiling stories

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::project::ValidationError;

/// Errors raised by either direction of the story transformation.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Invalid project file: {0}")]
    Validation(#[from] ValidationError),

    #[error("Error while trying to read '{}': {message}", .path.display())]
    ProjectFile { path: PathBuf, message: String },

    #[error("Can't open file '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Path \"{}\" does not exist", .0.display())]
    PathNotFound(PathBuf),

    #[error("Path \"{}\" is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("Entry file '{name}' not found in '{}'", .folder.display())]
    EntryNotFound { folder: PathBuf, name: String },

    #[error("Script bundling failed:\n{diagnostics}")]
    Bundle { diagnostics: String },

    #[error("Marker '{marker}' not found in template '{}'", .template.display())]
    MarkerNotFound { marker: String, template: PathBuf },

    #[error("`tw-storydata` tag is not found")]
    StoryDataNotFound,

    #[error("Only {supported} stories are supported, found '{found}'")]
    UnsupportedFormat { found: String, supported: String },

    #[error("Passage '{passage}' has an invalid pid '{value}': expected a positive integer")]
    InvalidPid { passage: String, value: String },

    #[error("No pid left for passage '{passage}': pid {} is already taken", u32::MAX)]
    PidSpaceExhausted { passage: String },

    #[error("Pid {pid} is used by both '{first}' and '{second}'")]
    DuplicatePid { pid: u32, first: String, second: String },

    #[error("Passage name '{name}' is used by both '{}' and '{}'", .first.display(), .second.display())]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Bad invocation; the CLI answers these with usage help.
    #[error("{0}")]
    Usage(String),
}

impl CompileError {
    /// Wrap an I/O failure with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CompileError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, CompileError::Usage(_))
    }
}

pub type Result<T> = std::result::Result<T, CompileError>;
