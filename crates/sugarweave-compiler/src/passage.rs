/// Passage source files
///
/// A passage file is an optional metadata block followed by the passage body:
///
/// ```text
/// ====================
/// name: Start
/// pid: 1
/// tags: intro
/// position: 0,0
/// size: 100,100
/// ====================
/// Body text...
/// ```
///
/// Only the keys `name`, `pid`, `tags`, `position` and `size` are recognized;
/// anything else in the block is dropped.

use once_cell::sync::Lazy;
use regex::Regex;

static METADATA_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\A=+\r?\n((?s).*?)\r?\n=+\r?\n").unwrap());

/// A passage as read from a source file: every metadata field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawPassage {
    pub name: Option<String>,
    pub pid: Option<String>,
    pub tags: Option<String>,
    pub position: Option<String>,
    pub size: Option<String>,
    pub content: String,
}

/// A passage with every attribute filled in, ready to embed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub pid: u32,
    pub name: String,
    /// Space separated tag names, opaque to the compiler
    pub tags: String,
    /// `x,y`
    pub position: String,
    /// `w,h`
    pub size: String,
    pub content: String,
}

/// Split a passage file into its metadata and body.
///
/// Without a delimited metadata block the whole text is the body.
pub fn parse_passage(text: &str) -> RawPassage {
    let mut passage = RawPassage::default();

    let Some(captures) = METADATA_BLOCK.captures(text) else {
        passage.content = text.to_string();
        return passage;
    };

    let block_end = captures.get(0).map_or(0, |m| m.end());
    passage.content = text[block_end..].to_string();

    let metadata = captures.get(1).map_or("", |m| m.as_str());
    for line in metadata.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = Some(value.trim().to_string());
        match key.trim() {
            "name" => passage.name = value,
            "pid" => passage.pid = value,
            "tags" => passage.tags = value,
            "position" => passage.position = value,
            "size" => passage.size = value,
            _ => {}
        }
    }

    passage
}

impl RawPassage {
    /// Metadata value with empty strings treated as absent.
    pub fn field(value: &Option<String>) -> Option<&str> {
        value.as_deref().filter(|v| !v.is_empty())
    }

    /// Render the passage as a source file with a full metadata block.
    ///
    /// Absent fields are written with an empty value so the file always
    /// lists all five keys.
    pub fn to_source(&self, delimiter: &str) -> String {
        let mut out = String::with_capacity(self.content.len() + 128);
        out.push_str(delimiter);
        out.push('\n');
        for (key, value) in [
            ("name", &self.name),
            ("pid", &self.pid),
            ("tags", &self.tags),
            ("position", &self.position),
            ("size", &self.size),
        ] {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(value.as_deref().unwrap_or(""));
            out.push('\n');
        }
        out.push_str(delimiter);
        out.push('\n');
        out.push_str(&self.content);
        out
    }
}

impl From<Passage> for RawPassage {
    fn from(passage: Passage) -> Self {
        Self {
            name: Some(passage.name),
            pid: Some(passage.pid.to_string()),
            tags: Some(passage.tags),
            position: Some(passage.position),
            size: Some(passage.size),
            content: passage.content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELIM: &str = "====================";

    #[test]
    fn parses_metadata_and_body() {
        let text = "====================\nname: Start\npid: 1\n====================\nHello world.";
        let passage = parse_passage(text);
        assert_eq!(passage.name.as_deref(), Some("Start"));
        assert_eq!(passage.pid.as_deref(), Some("1"));
        assert_eq!(passage.tags, None);
        assert_eq!(passage.position, None);
        assert_eq!(passage.content, "Hello world.");
    }

    #[test]
    fn text_without_block_is_all_content() {
        let passage = parse_passage("Just a body.\nname: not metadata\n");
        assert_eq!(passage.name, None);
        assert_eq!(passage.content, "Just a body.\nname: not metadata\n");
    }

    #[test]
    fn unknown_keys_and_lines_without_colon_are_dropped() {
        let text = "===\nauthor: me\njunk line\n tags :  a b  \n===\nbody";
        let passage = parse_passage(text);
        assert_eq!(passage.tags.as_deref(), Some("a b"));
        assert_eq!(passage.name, None);
        assert_eq!(passage.content, "body");
    }

    #[test]
    fn value_keeps_colons_after_the_first() {
        let passage = parse_passage("=====\nname: Chapter: One\n=====\n");
        assert_eq!(passage.name.as_deref(), Some("Chapter: One"));
        assert_eq!(passage.content, "");
    }

    #[test]
    fn delimiter_lines_need_not_match_in_length() {
        let passage = parse_passage("==\npid: 4\n==========\nx");
        assert_eq!(passage.pid.as_deref(), Some("4"));
        assert_eq!(passage.content, "x");
    }

    #[test]
    fn crlf_files_are_recognized() {
        let passage = parse_passage("===\r\npid: 2\r\n===\r\nbody\r\n");
        assert_eq!(passage.pid.as_deref(), Some("2"));
        assert_eq!(passage.content, "body\r\n");
    }

    #[test]
    fn block_must_start_the_file() {
        let text = "intro\n===\npid: 2\n===\nbody";
        assert_eq!(parse_passage(text).pid, None);
    }

    #[test]
    fn serialize_fills_missing_keys_with_empty_values() {
        let text = "====================\nname: Start\npid: 1\n====================\nHello world.";
        let out = parse_passage(text).to_source(DELIM);
        assert_eq!(
            out,
            "====================\nname: Start\npid: 1\ntags: \nposition: \nsize: \n====================\nHello world."
        );
    }

    #[test]
    fn serialized_passage_parses_back() {
        let passage = Passage {
            pid: 7,
            name: "Cave".into(),
            tags: "dark wet".into(),
            position: "150,300".into(),
            size: "100,100".into(),
            content: "It is dark.\n\n[[Leave]]\n".into(),
        };
        let raw = RawPassage::from(passage);
        assert_eq!(parse_passage(&raw.to_source(DELIM)), raw);
    }

    #[test]
    fn empty_fields_count_as_absent() {
        let passage = parse_passage("===\npid:\nsize: 1,1\n===\n");
        assert_eq!(passage.pid.as_deref(), Some(""));
        assert_eq!(RawPassage::field(&passage.pid), None);
        assert_eq!(RawPassage::field(&passage.size), Some("1,1"));
    }
}
