/// Project info (`_project.json`) model and validation
///
/// The project file carries the story-level attributes of `<tw-storydata>`
/// plus the tag color table. Two keys are hyphenated (`creator-version`,
/// `format-version`) because they mirror the HTML attribute names.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Required length of an IFID (a UUID in its textual form).
pub const IFID_LENGTH: usize = 36;

/// Story-level attributes, in the order they are written to HTML and JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub startnode: u32,
    pub creator: String,
    #[serde(rename = "creator-version")]
    pub creator_version: String,
    pub ifid: String,
    #[serde(serialize_with = "serialize_number")]
    pub zoom: f64,
    pub format: String,
    #[serde(rename = "format-version")]
    pub format_version: String,
    pub options: String,
}

/// A passage tag and its display color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub color: String,
}

/// Contents of `_project.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectFile {
    #[serde(flatten)]
    pub info: ProjectInfo,
    /// Kept in document order; duplicates are preserved
    pub tags: Vec<Tag>,
}

/// First rule a project record breaks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Project info must be a JSON object")]
    NotAnObject,
    #[error("Invalid StoryData format. Supported: {supported}")]
    Format { supported: String },
    #[error("Invalid StoryData format version")]
    FormatVersion,
    #[error("Invalid StoryData options. Should be a string")]
    Options,
    #[error("Invalid StoryData zoom. Should be a number between 0 and 2")]
    Zoom,
    #[error("Invalid StoryData creator")]
    Creator,
    #[error("Invalid StoryData creator version")]
    CreatorVersion,
    #[error("Invalid StoryData ifid: should be a 36-character string")]
    Ifid,
    #[error("Invalid StoryData name: should be a string")]
    Name,
    #[error("Invalid StoryData startnode: should be a positive integer")]
    Startnode,
    #[error("Invalid StoryData tags")]
    Tags,
    #[error("Malformed project info: {0}")]
    Malformed(String),
}

impl ProjectInfo {
    /// Attribute name/value pairs of `<tw-storydata>`, in output order.
    pub fn attributes(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("startnode", self.startnode.to_string()),
            ("creator", self.creator.clone()),
            ("creator-version", self.creator_version.clone()),
            ("ifid", self.ifid.clone()),
            ("zoom", self.zoom.to_string()),
            ("format", self.format.clone()),
            ("format-version", self.format_version.clone()),
            ("options", self.options.clone()),
        ]
    }
}

impl ProjectFile {
    /// Decode and validate a project file.
    pub fn from_json(text: &str, supported_formats: &[String]) -> Result<Self, ValidationError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ValidationError::Malformed(e.to_string()))?;
        validate_project(&value, supported_formats)
    }

    /// Pretty-printed JSON with four-space indentation.
    pub fn to_json_pretty(&self) -> String {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        // Only strings and finite numbers: serialization cannot fail
        if self.serialize(&mut ser).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

/// Check a decoded project record rule by rule, stopping at the first
/// violation, and return the typed project on success.
pub fn validate_project(
    value: &Value,
    supported_formats: &[String],
) -> Result<ProjectFile, ValidationError> {
    let object = value.as_object().ok_or(ValidationError::NotAnObject)?;
    let non_empty = |key: &str| {
        object
            .get(key)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };

    let format_ok = object
        .get("format")
        .and_then(Value::as_str)
        .is_some_and(|f| supported_formats.iter().any(|s| s == f));
    if !format_ok {
        return Err(ValidationError::Format {
            supported: supported_formats.join(", "),
        });
    }
    if !non_empty("format-version") {
        return Err(ValidationError::FormatVersion);
    }
    if !object.get("options").is_some_and(Value::is_string) {
        return Err(ValidationError::Options);
    }
    let zoom_ok = object
        .get("zoom")
        .and_then(Value::as_f64)
        .is_some_and(|z| (0.0..=2.0).contains(&z));
    if !zoom_ok {
        return Err(ValidationError::Zoom);
    }
    if !non_empty("creator") {
        return Err(ValidationError::Creator);
    }
    if !non_empty("creator-version") {
        return Err(ValidationError::CreatorVersion);
    }
    let ifid_ok = object
        .get("ifid")
        .and_then(Value::as_str)
        .is_some_and(|s| s.chars().count() == IFID_LENGTH);
    if !ifid_ok {
        return Err(ValidationError::Ifid);
    }
    if !non_empty("name") {
        return Err(ValidationError::Name);
    }
    if !object.get("startnode").is_some_and(is_positive_integer) {
        return Err(ValidationError::Startnode);
    }
    let tags_ok = object.get("tags").and_then(Value::as_array).is_some_and(|tags| {
        tags.iter().all(|tag| {
            let field = |key: &str| tag.get(key).and_then(Value::as_str).is_some_and(|s| !s.is_empty());
            field("name") && field("color")
        })
    });
    if !tags_ok {
        return Err(ValidationError::Tags);
    }

    // `1.0` passes the integer rule but does not deserialize into u32
    let mut normalized = value.clone();
    if let Some(startnode) = normalized.get_mut("startnode") {
        if let Some(n) = startnode.as_f64() {
            *startnode = Value::from(n as u32);
        }
    }
    serde_json::from_value(normalized).map_err(|e| ValidationError::Malformed(e.to_string()))
}

fn is_positive_integer(value: &Value) -> bool {
    match value.as_f64() {
        Some(n) => n > 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64,
        None => false,
    }
}

/// Write whole numbers without a fractional part, the way JavaScript does.
fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn supported() -> Vec<String> {
        vec!["SugarCube".to_string()]
    }

    fn valid() -> Value {
        json!({
            "name": "The Cave",
            "startnode": 1,
            "creator": "Twine",
            "creator-version": "2.6.2",
            "ifid": "D674C58C-DEFA-4F70-B7A2-27742230C0FC",
            "zoom": 1,
            "format": "SugarCube",
            "format-version": "2.36.1",
            "options": "",
            "tags": [{ "name": "dark", "color": "red" }]
        })
    }

    fn with(key: &str, value: Value) -> Value {
        let mut v = valid();
        v[key] = value;
        v
    }

    fn without(key: &str) -> Value {
        let mut v = valid();
        v.as_object_mut().unwrap().remove(key);
        v
    }

    fn check(v: &Value) -> Result<ProjectFile, ValidationError> {
        validate_project(v, &supported())
    }

    #[test]
    fn valid_project_decodes() {
        let project = check(&valid()).unwrap();
        assert_eq!(project.info.name, "The Cave");
        assert_eq!(project.info.creator_version, "2.6.2");
        assert_eq!(project.tags, vec![Tag { name: "dark".into(), color: "red".into() }]);
    }

    #[test]
    fn zoom_range_is_closed() {
        assert_eq!(check(&with("zoom", json!(2.5))), Err(ValidationError::Zoom));
        assert_eq!(check(&with("zoom", json!(-0.1))), Err(ValidationError::Zoom));
        assert_eq!(check(&with("zoom", json!("1"))), Err(ValidationError::Zoom));
        assert!(check(&with("zoom", json!(2))).is_ok());
        assert!(check(&with("zoom", json!(0))).is_ok());
    }

    #[test]
    fn ifid_must_be_36_characters() {
        let ifid35 = "D674C58C-DEFA-4F70-B7A2-27742230C0F";
        assert_eq!(check(&with("ifid", json!(ifid35))), Err(ValidationError::Ifid));
        assert!(check(&with("ifid", json!(format!("{ifid35}C")))).is_ok());
        assert_eq!(check(&without("ifid")), Err(ValidationError::Ifid));
    }

    #[test]
    fn unsupported_format_is_reported_first() {
        let mut v = with("format", json!("Harlowe"));
        v["zoom"] = json!(9);
        assert_eq!(
            check(&v),
            Err(ValidationError::Format { supported: "SugarCube".into() })
        );
    }

    #[test]
    fn options_may_be_empty_but_not_missing() {
        assert!(check(&with("options", json!(""))).is_ok());
        assert_eq!(check(&without("options")), Err(ValidationError::Options));
        assert_eq!(check(&with("options", Value::Null)), Err(ValidationError::Options));
    }

    #[test]
    fn startnode_must_be_positive_integer() {
        assert_eq!(check(&with("startnode", json!(0))), Err(ValidationError::Startnode));
        assert_eq!(check(&with("startnode", json!(-3))), Err(ValidationError::Startnode));
        assert_eq!(check(&with("startnode", json!(1.5))), Err(ValidationError::Startnode));
        assert_eq!(check(&with("startnode", json!("1"))), Err(ValidationError::Startnode));
        assert_eq!(check(&with("startnode", json!(1.0))).unwrap().info.startnode, 1);
    }

    #[test]
    fn empty_string_fields_fail_in_order() {
        assert_eq!(check(&with("format-version", json!(""))), Err(ValidationError::FormatVersion));
        assert_eq!(check(&with("creator", json!(""))), Err(ValidationError::Creator));
        assert_eq!(check(&with("creator-version", json!(""))), Err(ValidationError::CreatorVersion));
        assert_eq!(check(&with("name", json!(""))), Err(ValidationError::Name));

        let mut v = with("creator", json!(""));
        v["name"] = json!("");
        assert_eq!(check(&v), Err(ValidationError::Creator));
    }

    #[test]
    fn tags_need_name_and_color() {
        assert_eq!(check(&with("tags", json!({}))), Err(ValidationError::Tags));
        assert_eq!(check(&without("tags")), Err(ValidationError::Tags));
        assert_eq!(
            check(&with("tags", json!([{ "name": "a", "color": "" }]))),
            Err(ValidationError::Tags)
        );
        assert!(check(&with("tags", json!([]))).is_ok());
    }

    #[test]
    fn duplicate_tags_are_kept() {
        let v = with(
            "tags",
            json!([{ "name": "a", "color": "red" }, { "name": "a", "color": "blue" }]),
        );
        assert_eq!(check(&v).unwrap().tags.len(), 2);
    }

    #[test]
    fn pretty_json_uses_hyphenated_keys_and_integral_zoom() {
        let project = check(&valid()).unwrap();
        let text = project.to_json_pretty();
        assert!(text.contains("\n    \"creator-version\": \"2.6.2\""));
        assert!(text.contains("\"zoom\": 1,"));
        assert!(text.find("\"name\"").unwrap() < text.find("\"tags\"").unwrap());
        assert_eq!(ProjectFile::from_json(&text, &supported()).unwrap(), project);
    }

    #[test]
    fn fractional_zoom_is_written_as_is() {
        let mut project = check(&valid()).unwrap();
        project.info.zoom = 0.6;
        assert!(project.to_json_pretty().contains("\"zoom\": 0.6"));
        assert_eq!(project.info.attributes()[5], ("zoom", "0.6".to_string()));
    }

    #[test]
    fn invalid_json_is_malformed() {
        assert!(matches!(
            ProjectFile::from_json("{ nope", &supported()),
            Err(ValidationError::Malformed(_))
        ));
    }
}
