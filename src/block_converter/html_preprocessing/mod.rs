//! Source document preprocessing
//!
//! Locates the main content container of a documentation page and decides
//! which elements are non-content chrome. Conversion and validation both
//! scope themselves through [`select_main_content`] so they count the same
//! elements.

mod serialize;

pub(crate) use serialize::{
    is_void_element, serialize_children_excluding, serialize_nodes, write_escaped_text,
    write_start_tag,
};

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

/// Maximum HTML input size accepted by [`convert`](crate::convert) (10 MiB).
pub const MAX_HTML_SIZE: usize = 10 * 1024 * 1024;

/// Maximum DOM depth walked. Deeper branches are truncated with a warning.
pub(crate) const MAX_DOM_DEPTH: usize = 100;

// ============================================================================
// Main content selectors
// ============================================================================

static TOPIC_PAGE_BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".zDocsTopicPageBody")
        .expect("BUG: hardcoded CSS selector '.zDocsTopicPageBody' is invalid")
});

static CONBODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.body.conbody")
        .expect("BUG: hardcoded CSS selector 'div.body.conbody' is invalid")
});

static TASKBODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.body.taskbody")
        .expect("BUG: hardcoded CSS selector 'div.body.taskbody' is invalid")
});

static REFBODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.body.refbody")
        .expect("BUG: hardcoded CSS selector 'div.body.refbody' is invalid")
});

static MAIN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("main").expect("BUG: hardcoded CSS selector 'main' is invalid")
});

static ARTICLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("article").expect("BUG: hardcoded CSS selector 'article' is invalid")
});

static ROLE_MAIN_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("[role='main']")
        .expect("BUG: hardcoded CSS selector \"[role='main']\" is invalid")
});

static CONTENT_ID_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("#content").expect("BUG: hardcoded CSS selector '#content' is invalid")
});

static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("body").expect("BUG: hardcoded CSS selector 'body' is invalid")
});

/// Elements that never carry document content.
const NON_CONTENT_TAGS: &[&str] = &[
    "script", "style", "nav", "button", "form", "input", "select", "textarea", "noscript",
    "iframe", "template", "svg", "head", "title", "meta", "link",
];

/// Find the main content container, trying documentation-specific
/// containers before generic landmarks. Falls back to the document root.
pub fn select_main_content(document: &Html) -> ElementRef<'_> {
    let content_selectors = [
        &*TOPIC_PAGE_BODY_SELECTOR,
        &*CONBODY_SELECTOR,
        &*TASKBODY_SELECTOR,
        &*REFBODY_SELECTOR,
        &*MAIN_SELECTOR,
        &*ARTICLE_SELECTOR,
        &*ROLE_MAIN_SELECTOR,
        &*CONTENT_ID_SELECTOR,
        &*BODY_SELECTOR,
    ];

    for selector in content_selectors {
        if let Some(element) = document.select(selector).next() {
            tracing::debug!(container = element.value().name(), "Selected main content container");
            return element;
        }
    }
    document.root_element()
}

/// Body element if present, otherwise the root.
pub fn select_body(document: &Html) -> ElementRef<'_> {
    document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element())
}

/// `true` for elements that never contribute content.
pub fn is_non_content_tag(tag: &str) -> bool {
    NON_CONTENT_TAGS.contains(&tag)
}

/// `true` when any class of `element` contains one of the chrome fragments.
pub fn is_chrome(element: &ElementRef<'_>, chrome_classes: &[String]) -> bool {
    element.value().classes().any(|class| {
        chrome_classes
            .iter()
            .any(|fragment| !fragment.is_empty() && class.contains(fragment.as_str()))
    })
}

/// Elements skipped entirely during conversion.
pub fn is_skipped(element: &ElementRef<'_>, chrome_classes: &[String]) -> bool {
    is_non_content_tag(element.value().name()) || is_chrome(element, chrome_classes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chrome() -> Vec<String> {
        crate::config::ConversionConfig::default().chrome_classes
    }

    #[test]
    fn prefers_topic_body_over_main() {
        let doc = Html::parse_document(
            r#"<main><p>outer</p><div class="zDocsTopicPageBody"><p>inner</p></div></main>"#,
        );
        let container = select_main_content(&doc);
        assert!(container.value().classes().any(|c| c == "zDocsTopicPageBody"));
    }

    #[test]
    fn finds_dita_body() {
        let doc = Html::parse_document(
            r#"<body><nav>x</nav><div class="body taskbody"><p>Steps</p></div></body>"#,
        );
        let container = select_main_content(&doc);
        assert_eq!(container.value().name(), "div");
    }

    #[test]
    fn falls_back_to_body() {
        let doc = Html::parse_document("<p>only</p>");
        assert_eq!(select_main_content(&doc).value().name(), "body");
    }

    #[test]
    fn detects_chrome_by_class_fragment() {
        let doc = Html::parse_fragment(
            r#"<div class="zDocsFilterTableDiv extra">filters</div><div class="p">text</div>"#,
        );
        let selector = Selector::parse("div").expect("selector");
        let divs: Vec<_> = doc.select(&selector).collect();
        assert!(is_chrome(&divs[0], &chrome()));
        assert!(!is_chrome(&divs[1], &chrome()));
    }

    #[test]
    fn non_content_tags() {
        assert!(is_non_content_tag("script"));
        assert!(is_non_content_tag("nav"));
        assert!(!is_non_content_tag("p"));
    }
}
