//! Property tests for normalization, rich text, tables and classification

mod common;

use common::max_depth;
use proptest::prelude::*;
use sn2n::blocks::plain_text;
use sn2n::{BlockKind, ConversionConfig, convert, normalize, to_rich_text, to_table_block};

/// Plain text without markup characters or entities.
fn plain_text_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 .,:;()\\-]{0,80}"
}

/// Small fragments that combine into realistic page bodies.
fn fragment_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}".prop_map(|w| format!("<p>{w} text</p>")),
        "[a-z]{1,8}".prop_map(|w| format!("<h3>{w}</h3>")),
        "[a-z]{1,8}".prop_map(|w| format!("<ul><li>{w}<ol><li>{w} sub</li></ol></li></ul>")),
        "[a-z]{1,8}".prop_map(|w| format!("<div class=\"note note_note\">{w}</div>")),
        "[a-z]{1,8}".prop_map(|w| format!("<table><tr><td>{w}</td><td>x</td></tr></table>")),
        "[a-z]{1,8}".prop_map(|w| format!("<pre>{w}();</pre>")),
        Just("<ul><li>a<ul><li>b<ul><li>c<ul><li>d</li></ul></li></ul></li></ul></li></ul>".to_string()),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_normalize_is_idempotent(text in plain_text_strategy()) {
        let once = normalize(&text);
        prop_assert_eq!(normalize(&once), once);
    }

    #[test]
    fn prop_plain_text_round_trips_through_rich_text(text in plain_text_strategy()) {
        let runs = to_rich_text(&text);
        prop_assert_eq!(plain_text(&runs), normalize(&text));
    }

    #[test]
    fn prop_tables_are_rectangular(
        rows in prop::collection::vec(prop::collection::vec("[a-z]{1,6}", 1..6), 1..8)
    ) {
        let body: String = rows
            .iter()
            .map(|cells| {
                let cells: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
                format!("<tr>{cells}</tr>")
            })
            .collect();
        let html = format!("<table>{body}</table>");

        let conversion = to_table_block(&html).expect("table has rows");
        let BlockKind::Table { width, .. } = conversion.table.kind else {
            panic!("expected a table block");
        };
        prop_assert_eq!(width, rows.iter().map(Vec::len).max().unwrap_or(0));
        prop_assert_eq!(conversion.table.children.len(), rows.len());
        for row in &conversion.table.children {
            let BlockKind::TableRow { cells } = &row.kind else {
                panic!("expected a table row");
            };
            prop_assert_eq!(cells.len(), width);
        }
    }

    #[test]
    fn prop_classification_is_stable_and_bounded(
        fragments in prop::collection::vec(fragment_strategy(), 0..8)
    ) {
        let html = fragments.concat();
        let config = ConversionConfig::default();
        let first = convert(&html, &config).expect("conversion");
        let second = convert(&html, &config).expect("conversion");

        prop_assert!(max_depth(&first.blocks) <= config.max_nesting_depth);
        prop_assert_eq!(first.blocks.len(), second.blocks.len());
        prop_assert_eq!(first.marker_map.len(), second.marker_map.len());
        prop_assert_eq!(first.total_blocks(), second.total_blocks());
        if first.marker_map.is_empty() {
            prop_assert_eq!(first.blocks, second.blocks);
        }
    }
}
