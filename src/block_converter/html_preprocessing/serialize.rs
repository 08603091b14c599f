//! Structural HTML serialization with pruning
//!
//! Inline content is handed to the rich-text converter as serialized HTML.
//! Pruning happens on the tree (by node identity, via the `skip` predicate),
//! never by searching the serialized string for a block's markup.

use ego_tree::NodeRef;
use scraper::ElementRef;
use scraper::node::Node;

use super::MAX_DOM_DEPTH;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Serialize a sequence of sibling nodes, skipping elements for which `skip`
/// returns `true` (and their subtrees).
pub(crate) fn serialize_nodes<'a, F>(nodes: &[NodeRef<'a, Node>], skip: &F, output: &mut String)
where
    F: Fn(&ElementRef<'a>) -> bool,
{
    for node in nodes {
        serialize_node(*node, skip, output, 0);
    }
}

/// Serialize the children of `element`, skipping pruned elements.
pub(crate) fn serialize_children_excluding<'a, F>(
    element: &ElementRef<'a>,
    skip: &F,
    output: &mut String,
) where
    F: Fn(&ElementRef<'a>) -> bool,
{
    for child in element.children() {
        serialize_node(child, skip, output, 0);
    }
}

fn serialize_node<'a, F>(node: NodeRef<'a, Node>, skip: &F, output: &mut String, depth: usize)
where
    F: Fn(&ElementRef<'a>) -> bool,
{
    if depth > MAX_DOM_DEPTH {
        tracing::warn!(
            depth,
            limit = MAX_DOM_DEPTH,
            "Maximum HTML nesting depth exceeded, truncating inline content"
        );
        return;
    }

    match node.value() {
        Node::Text(text) => write_escaped_text(text, output),
        Node::Element(_) => {
            let Some(element) = ElementRef::wrap(node) else {
                return;
            };
            if skip(&element) {
                return;
            }

            let name = element.value().name();
            write_start_tag(&element, output);
            if is_void_element(name) {
                return;
            }

            for child in node.children() {
                serialize_node(child, skip, output, depth + 1);
            }

            output.push_str("</");
            output.push_str(name);
            output.push('>');
        }
        // Comments, doctypes and processing instructions carry no content
        _ => {}
    }
}

pub(crate) fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

/// Escape text content for re-parsing as HTML.
pub(crate) fn write_escaped_text(text: &str, output: &mut String) {
    for ch in text.chars() {
        match ch {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '&' => output.push_str("&amp;"),
            c => output.push(c),
        }
    }
}

/// `<name attr="value" ...>` with escaped attribute values.
pub(crate) fn write_start_tag(element: &ElementRef<'_>, output: &mut String) {
    output.push('<');
    output.push_str(element.value().name());
    for (attr, value) in element.value().attrs() {
        output.push(' ');
        output.push_str(attr);
        output.push_str("=\"");
        for ch in value.chars() {
            match ch {
                '"' => output.push_str("&quot;"),
                '&' => output.push_str("&amp;"),
                '<' => output.push_str("&lt;"),
                '>' => output.push_str("&gt;"),
                c => output.push(c),
            }
        }
        output.push('"');
    }
    output.push('>');
}
