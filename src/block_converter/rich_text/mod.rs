//! Inline HTML → rich-text runs
//!
//! Pipeline:
//! 1. Protect line breaks
//! 2. Rewrite recognized inline tags into private marker tokens
//! 3. Strip remaining tags, decode entities, strip tags the decoding exposed
//! 4. Collapse whitespace and restore line breaks
//! 5. Split on marker tokens, tracking nested activation per annotation
//!
//! For fragments with no inline formatting the concatenated run content is
//! exactly [`normalize`](crate::block_converter::text_normalizer::normalize)
//! of the same input.

mod inline_markers;
pub mod technical;

use url::Url;

use crate::blocks::rich_text::{Annotations, Color, RichTextRun, split_long_runs};
use crate::config::{ConversionConfig, DEFAULT_MAX_RICH_TEXT_CHARS};
use crate::block_converter::text_normalizer::{
    collapse_whitespace, decode_entities, protect_line_breaks, restore_line_breaks,
    strip_decoded_tags, strip_raw_tags,
};

use inline_markers::{Mark, TOKEN_CLOSE, TOKEN_OPEN, Token, insert_markers};
use technical::TechnicalHeuristics;

/// Settings the inline converter needs from the conversion config.
#[derive(Debug, Clone)]
pub struct RichTextOptions {
    pub heuristics: TechnicalHeuristics,
    pub base_url: Option<Url>,
    pub max_chars: usize,
}

impl Default for RichTextOptions {
    fn default() -> Self {
        Self {
            heuristics: TechnicalHeuristics::default(),
            base_url: None,
            max_chars: DEFAULT_MAX_RICH_TEXT_CHARS,
        }
    }
}

impl RichTextOptions {
    /// Derive from a conversion config. An unparsable base URL is ignored;
    /// [`ConversionConfig::validate`] reports it.
    pub fn from_config(config: &ConversionConfig) -> Self {
        Self {
            heuristics: config.technical.clone(),
            base_url: config.base_url.as_deref().and_then(|b| Url::parse(b).ok()),
            max_chars: config.max_rich_text_chars,
        }
    }
}

/// Convert an inline HTML fragment to rich-text runs with default options.
pub fn to_rich_text(html: &str) -> Vec<RichTextRun> {
    to_rich_text_with(html, &RichTextOptions::default())
}

/// Convert an inline HTML fragment to rich-text runs.
///
/// Empty or whitespace-only input yields an empty vector.
pub fn to_rich_text_with(html: &str, options: &RichTextOptions) -> Vec<RichTextRun> {
    let protected = protect_line_breaks(html);
    let marked = insert_markers(&protected, &options.heuristics);
    let untagged = strip_raw_tags(&marked.text);
    let decoded = decode_entities(&untagged);
    let stripped = strip_decoded_tags(&decoded);
    let text = restore_line_breaks(&collapse_whitespace(&stripped));

    let hrefs: Vec<Option<String>> = marked
        .hrefs
        .iter()
        .map(|href| resolve_href(href, options.base_url.as_ref()))
        .collect();

    let runs = split_on_tokens(&text, &hrefs);
    let runs = tidy_runs(runs);
    if runs.iter().all(|run| run.content.trim().is_empty()) {
        return Vec::new();
    }
    split_long_runs(runs, options.max_chars)
}

/// Resolve a link target. Fragment-only, script and unparsable targets
/// produce no link.
fn resolve_href(href: &str, base: Option<&Url>) -> Option<String> {
    let href = href.trim();
    if href.starts_with('#') || href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    let url = match Url::parse(href) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base?.join(href).ok()?,
        Err(_) => return None,
    };
    match url.scheme() {
        "http" | "https" | "mailto" => Some(url.to_string()),
        _ => None,
    }
}

#[derive(Default)]
struct ActiveMarks {
    bold: u32,
    italic: u32,
    code: u32,
    underline: u32,
    strike: u32,
    highlight: u32,
    links: Vec<Option<String>>,
}

impl ActiveMarks {
    fn counter(&mut self, mark: Mark) -> Option<&mut u32> {
        match mark {
            Mark::Bold => Some(&mut self.bold),
            Mark::Italic => Some(&mut self.italic),
            Mark::Code => Some(&mut self.code),
            Mark::Underline => Some(&mut self.underline),
            Mark::Strike => Some(&mut self.strike),
            Mark::Highlight => Some(&mut self.highlight),
            Mark::Link => None,
        }
    }

    fn apply(&mut self, token: Token, hrefs: &[Option<String>]) {
        match token {
            Token::LinkStart(idx) => self.links.push(hrefs.get(idx).cloned().flatten()),
            Token::End(Mark::Link) => {
                self.links.pop();
            }
            Token::Start(mark) => {
                if let Some(count) = self.counter(mark) {
                    *count += 1;
                }
            }
            Token::End(mark) => {
                if let Some(count) = self.counter(mark) {
                    *count = count.saturating_sub(1);
                }
            }
        }
    }

    fn annotations(&self) -> Annotations {
        Annotations {
            bold: self.bold > 0,
            italic: self.italic > 0,
            strikethrough: self.strike > 0,
            underline: self.underline > 0,
            code: self.code > 0,
            color: if self.highlight > 0 {
                Color::YellowBackground
            } else {
                Color::Default
            },
        }
    }

    fn link(&self) -> Option<String> {
        self.links.iter().rev().find_map(Clone::clone)
    }
}

fn split_on_tokens(text: &str, hrefs: &[Option<String>]) -> Vec<RichTextRun> {
    let mut runs = Vec::new();
    let mut marks = ActiveMarks::default();
    let mut rest = text;

    while !rest.is_empty() {
        let Some(open) = rest.find(TOKEN_OPEN) else {
            push_run(&mut runs, rest, &marks);
            break;
        };
        push_run(&mut runs, &rest[..open], &marks);
        let after_open = &rest[open + TOKEN_OPEN.len_utf8()..];
        let Some(close) = after_open.find(TOKEN_CLOSE) else {
            // Dangling opener; drop it and keep the text.
            rest = after_open;
            continue;
        };
        if let Some(token) = Token::decode(&after_open[..close]) {
            marks.apply(token, hrefs);
        }
        rest = &after_open[close + TOKEN_CLOSE.len_utf8()..];
    }
    runs
}

fn push_run(runs: &mut Vec<RichTextRun>, content: &str, marks: &ActiveMarks) {
    let content: String = content
        .chars()
        .filter(|c| *c != TOKEN_OPEN && *c != TOKEN_CLOSE)
        .collect();
    if content.is_empty() {
        return;
    }
    let annotations = marks.annotations();
    let link = marks.link();

    if let Some(last) = runs.last_mut()
        && last.annotations == annotations
        && last.link == link
    {
        last.content.push_str(&content);
        return;
    }
    runs.push(RichTextRun {
        content,
        annotations,
        link,
    });
}

/// Trim the outer edges, avoid doubled spaces at run boundaries, and keep a
/// link from gluing to the following word.
fn tidy_runs(mut runs: Vec<RichTextRun>) -> Vec<RichTextRun> {
    if let Some(first) = runs.first_mut() {
        first.content = first.content.trim_start_matches([' ', '\n']).to_string();
    }
    if let Some(last) = runs.last_mut() {
        last.content = last.content.trim_end_matches([' ', '\n']).to_string();
    }

    for idx in 1..runs.len() {
        let (before, after) = runs.split_at_mut(idx);
        let prev = &before[idx - 1];
        let cur = &mut after[0];

        if prev.content.ends_with([' ', '\n']) && cur.content.starts_with(' ') {
            cur.content = cur.content.trim_start_matches(' ').to_string();
        }

        let leaves_link = prev.link.is_some() && prev.link != cur.link;
        if leaves_link
            && !prev.content.ends_with(char::is_whitespace)
            && cur.content.starts_with(char::is_alphanumeric)
        {
            cur.content.insert(0, ' ');
        }
    }

    runs.retain(|run| !run.content.is_empty());
    runs
}

/// Apply wrapper formatting (e.g. a `<strong>` enclosing block content) to
/// runs produced inside it.
pub(crate) fn apply_wrapper_formatting(runs: &mut [RichTextRun], wrapper: &Annotations) {
    for run in runs {
        run.annotations.bold |= wrapper.bold;
        run.annotations.italic |= wrapper.italic;
        run.annotations.code |= wrapper.code;
        run.annotations.underline |= wrapper.underline;
        run.annotations.strikethrough |= wrapper.strikethrough;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::rich_text::plain_text;

    #[test]
    fn plain_fragment_is_single_run() {
        let runs = to_rich_text("  Hello &amp; welcome  ");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].content, "Hello & welcome");
        assert!(runs[0].annotations.is_plain());
    }

    #[test]
    fn bold_and_italic_runs() {
        let runs = to_rich_text("Click <b>Save</b> then <em>wait</em>.");
        assert_eq!(plain_text(&runs), "Click Save then wait.");
        let save = runs.iter().find(|r| r.content == "Save").expect("bold run");
        assert!(save.annotations.bold);
        let wait = runs.iter().find(|r| r.content == "wait").expect("italic run");
        assert!(wait.annotations.italic);
    }

    #[test]
    fn nested_same_kind_is_one_run() {
        let runs = to_rich_text("<b>a<b>b</b>c</b>");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].content, "abc");
        assert!(runs[0].annotations.bold);
    }

    #[test]
    fn link_gets_separating_space_before_word() {
        let runs = to_rich_text(r#"See <a href="https://a.test/x">docs</a>for more"#);
        assert_eq!(plain_text(&runs), "See docs for more");
        let link = runs.iter().find(|r| r.link.is_some()).expect("link run");
        assert_eq!(link.content, "docs");
        assert_eq!(link.link.as_deref(), Some("https://a.test/x"));
    }

    #[test]
    fn no_space_before_punctuation_after_link() {
        let runs = to_rich_text(r#"<a href="https://a.test/">docs</a>."#);
        assert_eq!(plain_text(&runs), "docs.");
    }

    #[test]
    fn relative_link_resolves_against_base() {
        let options = RichTextOptions {
            base_url: Url::parse("https://docs.example.com/bundle/page.html").ok(),
            ..RichTextOptions::default()
        };
        let runs = to_rich_text_with(r#"<a href="other.html">x</a>"#, &options);
        assert_eq!(
            runs[0].link.as_deref(),
            Some("https://docs.example.com/bundle/other.html")
        );
    }

    #[test]
    fn relative_link_without_base_is_text() {
        let runs = to_rich_text(r#"<a href="other.html">x</a>"#);
        assert_eq!(runs.len(), 1);
        assert!(runs[0].link.is_none());
    }

    #[test]
    fn ui_control_spans_are_bold_and_code_spans_are_code() {
        let runs = to_rich_text(
            r#"Open <span class="ph uicontrol">Settings</span> and set <span class="ph codeph">glide.x</span>"#,
        );
        let settings = runs.iter().find(|r| r.content == "Settings").expect("ui run");
        assert!(settings.annotations.bold && !settings.annotations.code);
        let prop = runs.iter().find(|r| r.content == "glide.x").expect("code run");
        assert!(prop.annotations.code);
    }

    #[test]
    fn kbd_uses_content_heuristic() {
        let runs = to_rich_text("Press <kbd>Save</kbd> or run <kbd>gs.log()</kbd>");
        let save = runs.iter().find(|r| r.content == "Save").expect("save");
        assert!(save.annotations.bold && !save.annotations.code);
        let log = runs.iter().find(|r| r.content == "gs.log()").expect("log");
        assert!(log.annotations.code);
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert!(to_rich_text("   ").is_empty());
        assert!(to_rich_text("<b> </b>").is_empty());
        assert!(to_rich_text("").is_empty());
    }

    #[test]
    fn line_breaks_survive() {
        let runs = to_rich_text("one<br>two");
        assert_eq!(plain_text(&runs), "one\ntwo");
    }

    #[test]
    fn no_double_spaces_across_runs() {
        let runs = to_rich_text("a <b> b</b> c");
        assert_eq!(plain_text(&runs), "a b c");
    }

    #[test]
    fn encoded_placeholder_survives_inside_code() {
        let runs = to_rich_text("<code>&lt;instance&gt;.service-now.com</code>");
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].content, "<instance>.service-now.com");
        assert!(runs[0].annotations.code);
    }

    #[test]
    fn long_runs_are_split() {
        let text = "x".repeat(4500);
        let runs = to_rich_text(&text);
        assert_eq!(runs.len(), 3);
        assert!(runs.iter().all(|r| r.content.chars().count() <= 2000));
        assert_eq!(plain_text(&runs), text);
    }

    #[test]
    fn wrapper_formatting_is_additive() {
        let mut runs = to_rich_text("a <i>b</i>");
        apply_wrapper_formatting(
            &mut runs,
            &Annotations {
                bold: true,
                ..Annotations::default()
            },
        );
        assert!(runs.iter().all(|r| r.annotations.bold));
        assert!(runs.iter().any(|r| r.annotations.italic));
    }
}
