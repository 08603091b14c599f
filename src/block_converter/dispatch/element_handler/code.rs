use scraper::{ElementRef, Selector};
use std::sync::LazyLock;

use super::super::node_util::element_id;
use super::super::{ClassifyContext, Element};
use super::Handlers;
use super::language_inference::{
    extract_language_from_class, infer_language_from_content, normalize_language,
};
use crate::blocks::{Block, RichTextRun, split_long_runs};

static CODE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("code").expect("BUG: hardcoded CSS selector 'code' is invalid")
});

/// `pre` → code block. Whitespace is preserved verbatim; only the leading
/// newline the parser keeps after `<pre>` and trailing whitespace go.
pub(super) fn code_handler(
    _handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    let raw: String = element.node.text().collect();
    let content = raw
        .strip_prefix("\r\n")
        .or_else(|| raw.strip_prefix('\n'))
        .unwrap_or(raw.as_str())
        .trim_end();

    if content.trim().is_empty() {
        return Some(Vec::new());
    }

    let language = detect_language(&element.node, content)
        .unwrap_or(ctx.config.default_code_language.as_str())
        .to_string();

    if ctx.config.verbose {
        tracing::debug!(language = %language, chars = content.len(), "Classified code block");
    }

    let runs = split_long_runs(
        vec![RichTextRun::plain(content)],
        ctx.config.max_rich_text_chars,
    );
    Some(vec![
        Block::code(runs, language).with_source_id(element_id(&element.node)),
    ])
}

fn detect_language(pre: &ElementRef<'_>, content: &str) -> Option<&'static str> {
    let class_hint = std::iter::once(*pre)
        .chain(pre.select(&CODE_SELECTOR))
        .filter_map(|el| el.value().attr("class"))
        .find_map(extract_language_from_class);

    match class_hint {
        Some(hint) => normalize_language(&hint).or_else(|| infer_language_from_content(content)),
        None => infer_language_from_content(content),
    }
}
