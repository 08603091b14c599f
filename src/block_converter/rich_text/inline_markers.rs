//! Inline tag → private marker rewriting
//!
//! Recognized inline tags are rewritten into paired private-use tokens
//! (`\u{E000}B+\u{E001}` ... `\u{E000}B-\u{E001}`) that carry their meaning
//! through entity decoding and whitespace collapsing. Links capture their
//! `href` into a side table and reference it by index.
//!
//! Elements whose rendering depends on their content shape (`<kbd>`,
//! `span.keyword`, ...) emit a provisional token that is resolved to code or
//! bold once the closing tag is reached and the inner text is known.

use regex::Regex;
use std::sync::LazyLock;

use super::technical::TechnicalHeuristics;
use crate::block_converter::text_normalizer::{decode_entities, strip_raw_tags};

pub(crate) const TOKEN_OPEN: char = '\u{E000}';
pub(crate) const TOKEN_CLOSE: char = '\u{E001}';

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<(/?)([a-zA-Z][a-zA-Z0-9]*)([^<>]*)>").expect("BUG: hardcoded tag regex is valid")
});

static CLASS_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bclass\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("BUG: hardcoded class attribute regex is valid")
});

static HREF_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("BUG: hardcoded href attribute regex is valid")
});

/// Span classes rendered bold (UI labels).
const BOLD_SPAN_CLASSES: &[&str] = &["uicontrol", "wintitle", "menucascade"];

/// Span classes that always name technical identifiers.
const CODE_SPAN_CLASSES: &[&str] = &[
    "codeph",
    "filepath",
    "parmname",
    "varname",
    "cmdname",
    "apiname",
    "userinput",
    "systemoutput",
];

/// Span classes decided by content shape.
const DEFERRED_SPAN_CLASSES: &[&str] = &["keyword"];

/// Semantic meaning of a marker pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mark {
    Bold,
    Italic,
    Code,
    Underline,
    Strike,
    Highlight,
    Link,
}

impl Mark {
    fn letter(self) -> char {
        match self {
            Mark::Bold => 'B',
            Mark::Italic => 'I',
            Mark::Code => 'C',
            Mark::Underline => 'U',
            Mark::Strike => 'S',
            Mark::Highlight => 'Y',
            Mark::Link => 'L',
        }
    }

    pub(crate) fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'B' => Some(Mark::Bold),
            'I' => Some(Mark::Italic),
            'C' => Some(Mark::Code),
            'U' => Some(Mark::Underline),
            'S' => Some(Mark::Strike),
            'Y' => Some(Mark::Highlight),
            'L' => Some(Mark::Link),
            _ => None,
        }
    }
}

/// A decoded marker token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    Start(Mark),
    /// Link start with index into the href table
    LinkStart(usize),
    End(Mark),
}

impl Token {
    pub(crate) fn encode(self) -> String {
        match self {
            Token::Start(mark) => format!("{TOKEN_OPEN}{}+{TOKEN_CLOSE}", mark.letter()),
            Token::LinkStart(idx) => format!("{TOKEN_OPEN}L+{idx}{TOKEN_CLOSE}"),
            Token::End(mark) => format!("{TOKEN_OPEN}{}-{TOKEN_CLOSE}", mark.letter()),
        }
    }

    /// Parse the body between `TOKEN_OPEN` and `TOKEN_CLOSE`.
    pub(crate) fn decode(body: &str) -> Option<Self> {
        let mut chars = body.chars();
        let mark = Mark::from_letter(chars.next()?)?;
        match chars.next()? {
            '+' if mark == Mark::Link => chars.as_str().parse().ok().map(Token::LinkStart),
            '+' => Some(Token::Start(mark)),
            '-' => Some(Token::End(mark)),
            _ => None,
        }
    }
}

/// What an open element turned into, so its closing tag can match it.
#[derive(Debug, Clone, Copy)]
enum Opened {
    Mark(Mark),
    /// Content-shape decision pending; `at` is the byte offset of the
    /// provisional token in the output.
    Deferred { at: usize },
    Nothing,
}

const DEFERRED_TOKEN: &str = "\u{E000}?\u{E001}";

/// Output of the marker rewrite.
#[derive(Debug, Default)]
pub(crate) struct MarkedText {
    pub text: String,
    pub hrefs: Vec<String>,
}

/// Rewrite recognized inline tags of `html` into marker tokens. Unrecognized
/// tags are left for the caller to strip.
pub(crate) fn insert_markers(html: &str, heuristics: &TechnicalHeuristics) -> MarkedText {
    let mut out = MarkedText::default();
    // Per-tag stacks so a closing tag pops what its own opening tag pushed.
    let mut stacks: Vec<(String, Vec<Opened>)> = Vec::new();
    let mut last = 0;

    for caps in TAG.captures_iter(html) {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        out.text.push_str(&html[last..whole.start]);
        last = whole.end;

        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        let attrs = &caps[3];

        if closing {
            let opened = stack_for(&mut stacks, &name).pop();
            match opened {
                Some(Opened::Mark(mark)) => out.text.push_str(&Token::End(mark).encode()),
                Some(Opened::Deferred { at }) => resolve_deferred(&mut out.text, at, heuristics),
                // Unmatched closing tags and no-op openers leave the tag in
                // place; the caller strips it as plain markup.
                Some(Opened::Nothing) | None => out.text.push_str(&html[whole.clone()]),
            }
            continue;
        }

        let opened = classify_open_tag(&name, attrs, &mut out);
        match opened {
            Opened::Mark(Mark::Link) => {}
            Opened::Mark(mark) => out.text.push_str(&Token::Start(mark).encode()),
            Opened::Deferred { .. } => {}
            Opened::Nothing => out.text.push_str(&html[whole.clone()]),
        }
        if !attrs.trim_end().ends_with('/') && !is_void(&name) {
            stack_for(&mut stacks, &name).push(opened);
        }
    }
    out.text.push_str(&html[last..]);
    out
}

fn stack_for<'a>(stacks: &'a mut Vec<(String, Vec<Opened>)>, name: &str) -> &'a mut Vec<Opened> {
    let idx = match stacks.iter().position(|(tag, _)| tag == name) {
        Some(idx) => idx,
        None => {
            stacks.push((name.to_string(), Vec::new()));
            stacks.len() - 1
        }
    };
    &mut stacks[idx].1
}

fn is_void(name: &str) -> bool {
    matches!(
        name,
        "br" | "img" | "hr" | "wbr" | "input" | "meta" | "link" | "source" | "col" | "area"
    )
}

fn classify_open_tag(name: &str, attrs: &str, out: &mut MarkedText) -> Opened {
    match name {
        "b" | "strong" => Opened::Mark(Mark::Bold),
        "i" | "em" | "cite" | "dfn" => Opened::Mark(Mark::Italic),
        "code" | "tt" => Opened::Mark(Mark::Code),
        "u" | "ins" => Opened::Mark(Mark::Underline),
        "s" | "del" | "strike" => Opened::Mark(Mark::Strike),
        "mark" => Opened::Mark(Mark::Highlight),
        "kbd" | "samp" | "var" => open_deferred(out),
        "a" => match attribute(&HREF_ATTR, attrs) {
            Some(href) if !href.trim().is_empty() => {
                out.hrefs.push(decode_entities(href.trim()));
                let idx = out.hrefs.len() - 1;
                out.text.push_str(&Token::LinkStart(idx).encode());
                Opened::Mark(Mark::Link)
            }
            _ => Opened::Nothing,
        },
        "span" => {
            let class = attribute(&CLASS_ATTR, attrs).unwrap_or_default().to_ascii_lowercase();
            let has = |set: &[&str]| class.split_whitespace().any(|c| set.contains(&c));
            if has(CODE_SPAN_CLASSES) {
                Opened::Mark(Mark::Code)
            } else if has(BOLD_SPAN_CLASSES) {
                Opened::Mark(Mark::Bold)
            } else if has(DEFERRED_SPAN_CLASSES) {
                open_deferred(out)
            } else {
                Opened::Nothing
            }
        }
        _ => Opened::Nothing,
    }
}

fn open_deferred(out: &mut MarkedText) -> Opened {
    let at = out.text.len();
    out.text.push_str(DEFERRED_TOKEN);
    Opened::Deferred { at }
}

/// Replace the provisional token at `at` with a code or bold start and close
/// the pair, based on the text written since.
fn resolve_deferred(text: &mut String, at: usize, heuristics: &TechnicalHeuristics) {
    let inner_start = at + DEFERRED_TOKEN.len();
    let inner = text.get(inner_start..).unwrap_or_default();
    let visible: String = decode_entities(&strip_raw_tags(&strip_tokens(inner)));
    let mark = if heuristics.classify(&visible) {
        Mark::Code
    } else {
        Mark::Bold
    };
    text.replace_range(at..inner_start, &Token::Start(mark).encode());
    text.push_str(&Token::End(mark).encode());
}

/// Remove every marker token from `text`.
pub(crate) fn strip_tokens(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_token = false;
    for ch in text.chars() {
        match ch {
            TOKEN_OPEN => in_token = true,
            TOKEN_CLOSE => in_token = false,
            _ if !in_token => out.push(ch),
            _ => {}
        }
    }
    out
}

fn attribute<'a>(re: &Regex, attrs: &'a str) -> Option<&'a str> {
    let caps = re.captures(attrs)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(html: &str) -> String {
        insert_markers(html, &TechnicalHeuristics::default()).text
    }

    #[test]
    fn token_round_trip() {
        for token in [
            Token::Start(Mark::Bold),
            Token::End(Mark::Code),
            Token::LinkStart(12),
            Token::End(Mark::Link),
        ] {
            let encoded = token.encode();
            let body = &encoded[TOKEN_OPEN.len_utf8()..encoded.len() - TOKEN_CLOSE.len_utf8()];
            assert_eq!(Token::decode(body), Some(token));
        }
    }

    #[test]
    fn bold_pair_is_rewritten() {
        let text = marked("a <strong>b</strong> c");
        assert_eq!(strip_tokens(&text), "a b c");
        assert!(text.contains(&Token::Start(Mark::Bold).encode()));
        assert!(text.contains(&Token::End(Mark::Bold).encode()));
    }

    #[test]
    fn link_href_is_captured() {
        let out = insert_markers(
            r#"see <a class="x" href="https://docs.test/a?b=1&amp;c=2">docs</a>"#,
            &TechnicalHeuristics::default(),
        );
        assert_eq!(out.hrefs, vec!["https://docs.test/a?b=1&c=2".to_string()]);
        assert!(out.text.contains(&Token::LinkStart(0).encode()));
    }

    #[test]
    fn plain_span_closing_does_not_close_code_span() {
        let text = marked(r#"<span class="codeph">x<span>y</span>z</span>"#);
        let end = Token::End(Mark::Code).encode();
        assert_eq!(text.matches(&end).count(), 1);
        assert!(text.ends_with(&end));
    }

    #[test]
    fn deferred_kbd_resolves_by_content() {
        let code = marked("<kbd>sys_user.list</kbd>");
        assert!(code.starts_with(&Token::Start(Mark::Code).encode()));
        let bold = marked("<kbd>Save</kbd>");
        assert!(bold.starts_with(&Token::Start(Mark::Bold).encode()));
        assert!(!bold.contains(DEFERRED_TOKEN));
    }

    #[test]
    fn anchor_without_href_is_plain() {
        let out = insert_markers(r#"<a name="top">Top</a>"#, &TechnicalHeuristics::default());
        assert!(out.hrefs.is_empty());
        assert_eq!(strip_raw_tags(&out.text), "Top");
    }
}
