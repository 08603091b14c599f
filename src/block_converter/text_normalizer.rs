//! Text and entity normalization
//!
//! Turns an HTML fragment into visible plain text:
//! 1. Protect structural line breaks (`<br>`, `</p><p>`) with a placeholder
//! 2. Decode entities
//! 3. Strip tags (after decoding, so entity-encoded tags cannot leak)
//! 4. Collapse whitespace
//! 5. Restore placeholders as real line breaks
//!
//! Angle-bracket placeholders such as `<instance-name>` are documentation
//! content, not markup, and survive step 3. Only tags naming a known HTML
//! element, closing tags of known elements, or tags carrying attributes are
//! stripped.

use html_escape::decode_html_entities;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Private-use character standing in for an intentional line break while
/// whitespace is collapsed. Not whitespace, so collapsing leaves it alone.
pub(crate) const LINE_BREAK_PLACEHOLDER: char = '\u{F8FF}';

static PARAGRAPH_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</p\s*>\s*<p(?:\s[^<>]*)?>")
        .expect("BUG: hardcoded paragraph boundary regex is valid")
});

static BREAK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>").expect("BUG: hardcoded br regex is valid")
});

static COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<!--.*?-->").expect("BUG: hardcoded comment regex is valid")
});

/// Any real tag in undecoded markup.
static RAW_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"</?[a-zA-Z][a-zA-Z0-9:-]*(?:\s[^<>]*)?/?>")
        .expect("BUG: hardcoded raw tag regex is valid")
});

/// Tag-shaped text after decoding; group 1 is the closing slash, 2 the
/// name, 3 the attribute section.
static DECODED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9:-]*)((?:\s[^<>]*)?)/?>")
        .expect("BUG: hardcoded decoded tag regex is valid")
});

static ENCODED_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)&lt;/?[a-z]").expect("BUG: hardcoded encoded tag regex is valid")
});

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("BUG: hardcoded whitespace regex is valid"));

static PLACEHOLDER_WITH_SPACES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(" ?{LINE_BREAK_PLACEHOLDER} ?"))
        .expect("BUG: hardcoded placeholder regex is valid")
});

static EXCESS_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("BUG: hardcoded newline regex is valid"));

const KNOWN_HTML_TAGS: &[&str] = &[
    "a", "abbr", "address", "article", "aside", "audio", "b", "bdi", "bdo", "blockquote", "body",
    "br", "button", "caption", "cite", "code", "col", "colgroup", "dd", "del", "details", "dfn",
    "div", "dl", "dt", "em", "figcaption", "figure", "font", "footer", "form", "h1", "h2", "h3",
    "h4", "h5", "h6", "head", "header", "hr", "html", "i", "iframe", "img", "input", "ins", "kbd",
    "label", "li", "link", "main", "mark", "meta", "nav", "noscript", "ol", "p", "pre", "q", "s",
    "samp", "script", "section", "select", "small", "source", "span", "strike", "strong", "style",
    "sub", "summary", "sup", "svg", "table", "tbody", "td", "template", "tfoot", "th", "thead",
    "time", "title", "tr", "u", "ul", "var", "video", "wbr",
];

/// Normalize an HTML fragment to visible plain text.
///
/// Total and deterministic: malformed markup degrades to best-effort text.
pub fn normalize(html: &str) -> String {
    let protected = protect_line_breaks(html);
    let decoded = decode_entities(&protected);
    let stripped = strip_decoded_tags(&decoded);
    finish_whitespace(&stripped)
}

/// Replace `<br>` and paragraph boundaries with the line-break placeholder
/// and drop comments.
pub(crate) fn protect_line_breaks(html: &str) -> String {
    let placeholder = LINE_BREAK_PLACEHOLDER.to_string();
    let html = COMMENT.replace_all(html, "");
    let html = PARAGRAPH_BOUNDARY.replace_all(&html, placeholder.as_str());
    BREAK_TAG
        .replace_all(&html, placeholder.as_str())
        .into_owned()
}

/// Remove every tag from undecoded markup. Only valid for serialized DOM
/// fragments, where literal angle brackets in text are always encoded.
pub(crate) fn strip_raw_tags(html: &str) -> String {
    RAW_TAG.replace_all(html, "").into_owned()
}

/// Decode HTML entities. A second pass runs only when the first pass
/// exposed another layer of encoded markup (`&amp;lt;div&amp;gt;`).
pub(crate) fn decode_entities(text: &str) -> String {
    let once = decode_html_entities(text).into_owned();
    if ENCODED_TAG.is_match(&once) {
        decode_html_entities(&once).into_owned()
    } else {
        once
    }
}

/// Strip tag-shaped text produced by decoding, keeping placeholder syntax.
pub(crate) fn strip_decoded_tags(text: &str) -> String {
    DECODED_TAG
        .replace_all(text, |caps: &Captures| {
            let name = caps[2].to_ascii_lowercase();
            let has_attributes = caps[3].contains('=');
            if has_attributes || KNOWN_HTML_TAGS.contains(&name.as_str()) {
                String::new()
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Collapse whitespace, restore placeholders as `\n`, trim the ends.
pub(crate) fn finish_whitespace(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let restored = restore_line_breaks(&collapsed);
    restored
        .trim_matches(|c: char| c == ' ' || c == '\n')
        .to_string()
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").into_owned()
}

pub(crate) fn restore_line_breaks(text: &str) -> String {
    let restored = PLACEHOLDER_WITH_SPACES.replace_all(text, "\n");
    EXCESS_NEWLINES.replace_all(&restored, "\n\n").into_owned()
}
