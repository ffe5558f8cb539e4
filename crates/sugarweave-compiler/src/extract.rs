/// Story-data extraction
///
/// The inverse of [`crate::embed`]: finds the `<tw-storydata>` block inside an
/// arbitrary HTML document and takes it apart again. This is a scanner over
/// the fixed Twine tag set, not an HTML parser; everything outside the block
/// is left untouched and becomes the template for the next compile.

use std::collections::HashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::embed::CLEAR_SESSION_STORAGE_SCRIPT;
use crate::entities::{decode, decode_attribute};
use crate::error::{CompileError, Result};
use crate::passage::RawPassage;
use crate::project::{ProjectFile, ProjectInfo, Tag};

static STORY_DATA_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<tw-storydata\b").unwrap());
/// Inside the block: the start of a raw-text element or the block's end.
static BLOCK_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<(style|script)\b[^>]*>|</tw-storydata\s*>").unwrap()
});
static STYLE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</style\s*>").unwrap());
static SCRIPT_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</script\s*>").unwrap());
static STORY_DATA_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\A<tw-storydata\b([^>]*)>").unwrap());
static STYLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>(.*?)</style\s*>").unwrap());
static SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>(.*?)</script\s*>").unwrap());
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<tw-tag\b([^>]*)>").unwrap());
static PASSAGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<tw-passagedata\b([^>]*)>(.*?)</tw-passagedata\s*>").unwrap()
});
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
        .unwrap()
});

/// Everything recovered from a compiled story.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedStory {
    pub project: ProjectFile,
    pub stylesheet: String,
    pub script: String,
    pub passages: Vec<RawPassage>,
    /// The source document with the story data replaced by the marker
    pub template: String,
}

/// Pull the story data out of `html`.
///
/// Project attributes are read leniently: a missing attribute becomes an
/// empty string (or `0`). The story format, however, must be one of
/// `supported_formats`.
pub fn extract_story(
    html: &str,
    marker: &str,
    supported_formats: &[String],
) -> Result<ExtractedStory> {
    let (start, end) = locate_story_data(html).ok_or(CompileError::StoryDataNotFound)?;
    let template = format!("{}{}{}", &html[..start], marker, &html[end..]);
    let block = &html[start..end];

    let open_attributes = STORY_DATA_OPEN
        .captures(block)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str());
    let info = project_info(&parse_attributes(open_attributes), supported_formats)?;

    let stylesheet = first_body(&STYLE, block).trim().to_string();
    let script = strip_dev_bootstrap(first_body(&SCRIPT, block).trim()).to_string();

    // Tags and passages are searched only outside the style and script
    // bodies, which may contain arbitrary text.
    let markup = STYLE.replace_all(block, "");
    let markup = SCRIPT.replace_all(&markup, "");

    let tags = extract_tags(&markup);
    let passages = extract_passages(&markup);

    tracing::info!(
        "extracted story '{}': {} tag(s), {} passage(s)",
        info.name,
        tags.len(),
        passages.len()
    );

    Ok(ExtractedStory {
        project: ProjectFile { info, tags },
        stylesheet,
        script,
        passages,
        template,
    })
}

/// Byte range of the `<tw-storydata>` element. Style and script bodies are
/// raw text, so a closing story tag inside them does not end the block.
fn locate_story_data(html: &str) -> Option<(usize, usize)> {
    let start = STORY_DATA_START.find(html)?.start();
    let mut cursor = start;
    loop {
        let token = BLOCK_TOKEN.captures_at(html, cursor)?;
        let whole = token.get(0)?;
        let raw_end = match token.get(1).map(|m| m.as_str().to_ascii_lowercase()) {
            None => return Some((start, whole.end())),
            Some(name) if name == "style" => &*STYLE_END,
            Some(_) => &*SCRIPT_END,
        };
        // An unclosed raw-text element swallows the rest of the document
        cursor = raw_end.find_at(html, whole.end())?.end();
    }
}

fn first_body<'a>(re: &Regex, block: &'a str) -> &'a str {
    re.captures(block)
        .and_then(|c| c.get(1))
        .map_or("", |m| m.as_str())
}

/// Attribute name (lowercased) to decoded value. Valueless attributes map
/// to an empty string; the first occurrence of a name wins.
fn parse_attributes(source: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for caps in ATTRIBUTE.captures_iter(source) {
        let name = caps[1].to_ascii_lowercase();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map_or(String::new(), |m| decode_attribute(m.as_str()));
        attributes.entry(name).or_insert(value);
    }
    attributes
}

fn project_info(
    attributes: &HashMap<String, String>,
    supported_formats: &[String],
) -> Result<ProjectInfo> {
    let text = |key: &str| attributes.get(key).cloned().unwrap_or_default();

    let format = text("format");
    if !supported_formats.iter().any(|f| *f == format) {
        return Err(CompileError::UnsupportedFormat {
            found: format,
            supported: supported_formats.join(", "),
        });
    }

    let startnode = attributes
        .get("startnode")
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let zoom = attributes
        .get("zoom")
        .and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|z| z.is_finite())
        .unwrap_or(0.0);

    Ok(ProjectInfo {
        name: text("name"),
        startnode,
        creator: text("creator"),
        creator_version: text("creator-version"),
        ifid: text("ifid"),
        zoom,
        format,
        format_version: text("format-version"),
        options: text("options"),
    })
}

fn extract_tags(markup: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    for caps in TAG.captures_iter(markup) {
        let attributes = parse_attributes(&caps[1]);
        match (attributes.get("name"), attributes.get("color")) {
            (Some(name), Some(color)) => tags.push(Tag {
                name: name.clone(),
                color: color.clone(),
            }),
            _ => tracing::warn!("skipping <tw-tag> without name or color: {}", &caps[0]),
        }
    }
    tags
}

/// Passages with no name are skipped (the name is their file name); any
/// other missing attribute is left empty and reassigned on the next compile.
fn extract_passages(markup: &str) -> Vec<RawPassage> {
    let mut passages = Vec::new();
    for caps in PASSAGE.captures_iter(markup) {
        let mut attributes = parse_attributes(&caps[1]);

        let name = match attributes.remove("name") {
            Some(name) if !name.is_empty() => name,
            _ => {
                tracing::warn!("skipping passage without a name: <tw-passagedata{}>", &caps[1]);
                continue;
            }
        };

        let mut take = |key: &str| {
            let value = attributes.remove(key);
            if value.is_none() {
                tracing::warn!("passage '{}' has no `{}` attribute, leaving it empty", name, key);
            }
            value
        };
        let pid = take("pid");
        let tags = take("tags");
        let position = take("position");
        let size = take("size");

        passages.push(RawPassage {
            name: Some(name),
            pid,
            tags,
            position,
            size,
            content: decode(&caps[2]),
        });
    }
    passages
}

/// Remove the dev-build session reset so decompiling a dev build does not
/// carry it into the project's script.
fn strip_dev_bootstrap(script: &str) -> &str {
    match script.strip_prefix(CLEAR_SESSION_STORAGE_SCRIPT.trim()) {
        Some(rest) => rest.trim_start(),
        None => script,
    }
}
