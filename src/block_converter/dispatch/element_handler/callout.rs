//! Callout containers
//!
//! Detection is a substring match per lowercased class token. Source
//! classes are often underscore-joined compounds (`note_note`,
//! `note_warning`), so a fragment matches at the start of a token or right
//! after a `_` or `-`. `tooltip` and `footnotes` are not callouts.

use super::super::dom_walker::item_content;
use super::super::node_util::{class_lower, element_id};
use super::super::{ClassifyContext, Element};
use super::Handlers;
use crate::blocks::{Block, Color, RichTextRun};

/// Class fragment → (icon, color), checked in order.
const CALLOUT_KINDS: &[(&str, &str, Color)] = &[
    ("warning", "⚠️", Color::RedBackground),
    ("danger", "⚠️", Color::RedBackground),
    ("caution", "⚠️", Color::OrangeBackground),
    ("important", "❗", Color::YellowBackground),
    ("attention", "❗", Color::YellowBackground),
    ("tip", "💡", Color::GreenBackground),
    ("note", "ℹ️", Color::BlueBackground),
];

/// Visible labels removed from the start of a callout's text.
const LABELS: &[&str] = &[
    "note:",
    "warning:",
    "tip:",
    "caution:",
    "important:",
    "attention:",
    "danger:",
];

/// Icon and color for a class attribute, if it names a callout.
pub(crate) fn callout_style(class: &str) -> Option<(&'static str, Color)> {
    let class = class.to_ascii_lowercase();
    CALLOUT_KINDS
        .iter()
        .find(|(fragment, _, _)| {
            class
                .split_whitespace()
                .any(|token| names_fragment(token, fragment))
        })
        .map(|(_, icon, color)| (*icon, *color))
}

fn names_fragment(token: &str, fragment: &str) -> bool {
    token
        .match_indices(fragment)
        .any(|(at, _)| at == 0 || matches!(token.as_bytes()[at - 1], b'_' | b'-'))
}

pub(super) fn callout_handler(
    handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    let (icon, color) = callout_style(&class_lower(&element.node))?;

    let (mut runs, children) = item_content(handlers, element.node, ctx);
    strip_label(&mut runs);

    if ctx.config.verbose {
        tracing::debug!(icon, color = color.as_str(), "Classified callout");
    }

    if runs.is_empty() && children.is_empty() {
        return Some(Vec::new());
    }
    Some(vec![
        Block::callout(runs, icon, color)
            .with_children(children)
            .with_source_id(element_id(&element.node)),
    ])
}

/// Remove a leading `Note:`-style label (case-insensitive) and the
/// whitespace after it, across run boundaries.
pub(crate) fn strip_label(runs: &mut Vec<RichTextRun>) {
    let text: String = runs.iter().map(|run| run.content.as_str()).collect();
    let lowered = text.to_lowercase();
    let Some(label) = LABELS.iter().find(|label| lowered.starts_with(*label)) else {
        return;
    };

    let label_chars = label.chars().count();
    let trailing_ws = text
        .chars()
        .skip(label_chars)
        .take_while(|c| c.is_whitespace())
        .count();
    let mut to_remove = label_chars + trailing_ws;

    while to_remove > 0 && !runs.is_empty() {
        let len = runs[0].content.chars().count();
        if len <= to_remove {
            to_remove -= len;
            runs.remove(0);
        } else {
            runs[0].content = runs[0].content.chars().skip(to_remove).collect();
            to_remove = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::plain_text;

    #[test]
    fn substring_matching_across_underscores() {
        assert_eq!(
            callout_style("note note note_note"),
            Some(("ℹ️", Color::BlueBackground))
        );
        assert_eq!(
            callout_style("note_warning"),
            Some(("⚠️", Color::RedBackground))
        );
        assert_eq!(callout_style("p section"), None);
    }

    #[test]
    fn fragment_inside_a_word_is_not_a_callout() {
        assert_eq!(callout_style("tooltip"), None);
        assert_eq!(callout_style("footnotes fn"), None);
        assert_eq!(
            callout_style("callout-tip"),
            Some(("💡", Color::GreenBackground))
        );
    }

    #[test]
    fn severity_wins_over_note() {
        assert_eq!(
            callout_style("note important note_important"),
            Some(("❗", Color::YellowBackground))
        );
    }

    #[test]
    fn label_is_stripped_across_runs() {
        let mut runs = vec![
            RichTextRun::plain("Note:").bold(),
            RichTextRun::plain(" Take note."),
        ];
        strip_label(&mut runs);
        assert_eq!(plain_text(&runs), "Take note.");
        assert_eq!(runs.len(), 1);
    }

    #[test]
    fn text_without_label_is_untouched() {
        let mut runs = vec![RichTextRun::plain("Notes are useful")];
        strip_label(&mut runs);
        assert_eq!(plain_text(&runs), "Notes are useful");
    }
}
