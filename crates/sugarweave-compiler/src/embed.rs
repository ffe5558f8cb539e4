/// Story-data markup generation
///
/// Builds the `<tw-storydata>` element Twine and SugarCube read at startup
/// and splices it into an HTML template at the passage data marker.
///
/// Child order is fixed: stylesheet, script, tags, passages.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entities::{encode_attribute, encode_text};
use crate::passage::Passage;
use crate::project::ProjectFile;

pub const STORY_DATA_TAG: &str = "tw-storydata";
pub const PASSAGE_DATA_TAG: &str = "tw-passagedata";
pub const TAG_TAG: &str = "tw-tag";
pub const STYLESHEET_ID: &str = "twine-user-stylesheet";
pub const SCRIPT_ID: &str = "twine-user-script";

/// Prepended to the story script in dev builds so a reload starts the story
/// from scratch instead of restoring the previous session.
pub const CLEAR_SESSION_STORAGE_SCRIPT: &str = "
// ----------------------------------------------
/* script clears sessionStorage on document load
 * to prevent the browser from caching the previous state in watch mode
*/
document.body.onload = () => sessionStorage.clear();
// ----------------------------------------------

";

static CLOSING_STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</(?P<name>style)").unwrap());
static CLOSING_SCRIPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</(?P<name>script)").unwrap());

/// Everything embedded into one compiled story.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryData {
    pub project: ProjectFile,
    pub stylesheet: String,
    /// Bundled story script, without the dev bootstrap
    pub script: String,
    pub passages: Vec<Passage>,
}

#[derive(Debug, Clone)]
enum Node {
    Element(Element),
    /// Escaped on output
    Text(String),
    /// Written verbatim, for `<style>` and `<script>` bodies
    Raw(String),
}

/// Minimal element tree: just enough structure to serialize the story data.
#[derive(Debug, Clone)]
struct Element {
    name: &'static str,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    fn child(mut self, node: Node) -> Self {
        self.children.push(node);
        self
    }

    fn render(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            out.push_str(&encode_attribute(value));
            out.push('"');
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(el) => el.render(out),
                Node::Text(text) => out.push_str(&encode_text(text)),
                Node::Raw(raw) => out.push_str(raw),
            }
        }
        out.push_str("</");
        out.push_str(self.name);
        out.push('>');
    }
}

impl StoryData {
    /// Serialize the `<tw-storydata>` element.
    ///
    /// In dev mode (`build == false`) the script is prefixed with
    /// [`CLEAR_SESSION_STORAGE_SCRIPT`].
    pub fn render(&self, build: bool) -> String {
        let mut root = Element::new(STORY_DATA_TAG);
        for (name, value) in self.project.info.attributes() {
            root = root.attr(name, value);
        }
        root = root.attr("hidden", "");

        let style = Element::new("style")
            .attr("role", "stylesheet")
            .attr("id", STYLESHEET_ID)
            .attr("type", "text/twine-css")
            .child(Node::Raw(guard_raw_text(&self.stylesheet, "style")));
        root = root.child(Node::Element(style));

        let mut script_body = String::new();
        if !build {
            script_body.push_str(CLEAR_SESSION_STORAGE_SCRIPT);
        }
        script_body.push_str(&guard_raw_text(&self.script, "script"));
        let script = Element::new("script")
            .attr("role", "script")
            .attr("id", SCRIPT_ID)
            .attr("type", "text/twine-javascript")
            .child(Node::Raw(script_body));
        root = root.child(Node::Element(script));

        for tag in &self.project.tags {
            let el = Element::new(TAG_TAG)
                .attr("name", tag.name.as_str())
                .attr("color", tag.color.as_str());
            root = root.child(Node::Element(el));
        }

        for passage in &self.passages {
            let el = Element::new(PASSAGE_DATA_TAG)
                .attr("pid", passage.pid.to_string())
                .attr("name", passage.name.as_str())
                .attr("tags", passage.tags.as_str())
                .attr("position", passage.position.as_str())
                .attr("size", passage.size.as_str())
                .child(Node::Text(passage.content.clone()));
            root = root.child(Node::Element(el));
        }

        let mut out = String::new();
        root.render(&mut out);
        out
    }
}

/// A literal `</script` (or `</style`) in any letter case would end the
/// element early. `<\/script` means the same thing inside a JavaScript
/// string, template or regex, and `\/` is an escaped `/` in CSS.
fn guard_raw_text(body: &str, element: &str) -> String {
    let closing = match element {
        "style" => &*CLOSING_STYLE,
        _ => &*CLOSING_SCRIPT,
    };
    if !closing.is_match(body) {
        return body.to_string();
    }
    tracing::warn!("{} contains `</{}`, escaping it as `<\\/{}`", element, element, element);
    closing.replace_all(body, "<\\/$name").into_owned()
}

/// Replace the first occurrence of `marker` in `template` with `markup`.
///
/// Returns `None` when the template has no marker.
pub fn splice_into_template(template: &str, marker: &str, markup: &str) -> Option<String> {
    let start = template.find(marker)?;
    if template[start + marker.len()..].contains(marker) {
        tracing::warn!("template contains '{}' more than once; only the first is replaced", marker);
    }
    let mut out = String::with_capacity(template.len() + markup.len());
    out.push_str(&template[..start]);
    out.push_str(markup);
    out.push_str(&template[start + marker.len()..]);
    Some(out)
}
