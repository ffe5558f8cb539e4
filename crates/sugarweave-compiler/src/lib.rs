/// Sugarweave compiler
///
/// Converts between a directory of editable story sources (Markdown
/// passages, stylesheets, scripts, `_project.json`) and a single Twine 2
/// HTML file for the SugarCube story format, in both directions.

pub mod bundler;
pub mod catalog;
pub mod config;
pub mod decompile;
pub mod dist;
pub mod driver;
pub mod embed;
pub mod entities;
pub mod error;
pub mod extract;
pub mod layout;
pub mod logging;
pub mod passage;
pub mod project;

#[cfg(test)]
mod test_support;

pub use bundler::{Bundler, CommandBundler, VerbatimBundler};
pub use config::Config;
pub use decompile::{DecompileReport, Decompiler};
pub use driver::{CompileOptions, CompileOutput, Compiler};
pub use embed::StoryData;
pub use error::{CompileError, Result};
pub use extract::{extract_story, ExtractedStory};
pub use layout::PassageAllocator;
pub use passage::{parse_passage, Passage, RawPassage};
pub use project::{validate_project, ProjectFile, ProjectInfo, Tag, ValidationError};
