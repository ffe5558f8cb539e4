/// HTML entity encoding and decoding for text nodes and attribute values

/// Escape text placed inside an element.
pub fn encode_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape a double-quoted attribute value.
///
/// Angle brackets are escaped as well so an opening tag never contains a
/// literal `>` before its end.
pub fn encode_attribute(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode a text node the way an HTML parser does: the full named
/// reference table, legacy references without a semicolon, and numeric
/// references (NUL, surrogates and out-of-range values become U+FFFD).
/// Anything that is not a reference is kept verbatim.
pub fn decode(s: &str) -> String {
    htmlize::unescape(s).into_owned()
}

/// Decode an attribute value. Unlike text, a legacy reference followed by
/// an alphanumeric or `=` is left alone, so `?a=1&copy=2` survives.
pub fn decode_attribute(s: &str) -> String {
    htmlize::unescape_attribute(s).into_owned()
}
