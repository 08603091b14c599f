use ego_tree::NodeRef;
use scraper::ElementRef;
use scraper::node::Node;

/// Elements that start a new block when met inside flowing content.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "caption", "center", "dd", "details",
    "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "header", "hr", "img", "li", "main", "ol", "p", "pre", "section", "summary",
    "table", "ul",
];

/// Inline elements whose formatting applies to any blocks they wrap.
const FORMATTING_WRAPPERS: &[&str] = &["b", "strong", "i", "em", "u", "code", "s", "del"];

pub(crate) fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

pub(crate) fn is_formatting_wrapper(tag: &str) -> bool {
    FORMATTING_WRAPPERS.contains(&tag)
}

/// `true` when any descendant element of `element` is block-level.
pub(crate) fn contains_block(element: &ElementRef<'_>) -> bool {
    element
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|el| is_block_tag(el.value().name()))
}

/// Lowercased `class` attribute, empty when absent.
pub(crate) fn class_lower(element: &ElementRef<'_>) -> String {
    element
        .value()
        .attr("class")
        .unwrap_or_default()
        .to_ascii_lowercase()
}

pub(crate) fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c.eq_ignore_ascii_case(class))
}

pub(crate) fn element_id(element: &ElementRef<'_>) -> Option<String> {
    element
        .value()
        .attr("id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

pub(crate) fn parent_tag<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    element
        .parent()
        .and_then(ElementRef::wrap)
        .map(|parent| parent.value().name())
}

/// Text node that holds nothing but whitespace.
pub(crate) fn is_blank_text(node: &NodeRef<'_, Node>) -> bool {
    matches!(node.value(), Node::Text(text) if text.trim().is_empty())
}
