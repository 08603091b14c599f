//! Deduplication and noise filtering over converted pages

mod common;

use common::{all_text, convert_default};
use sn2n::blocks::{Block, Color, ImageSource, RichTextRun};
use sn2n::{DedupeConfig, dedupe_and_filter};

fn image(source: ImageSource) -> Block {
    Block::image(source, vec![])
}

#[test]
fn test_repeated_list_items_survive() {
    let result = convert_default(
        "<ol><li>Click Save.</li></ol><p>Then, in the other form:</p><ol><li>Click Save.</li></ol>",
    );
    let outcome = dedupe_and_filter(&result.blocks, &DedupeConfig::default());
    assert_eq!(outcome.duplicates_removed, 0);
    assert_eq!(outcome.blocks, result.blocks);
}

#[test]
fn test_same_upload_is_kept_once() {
    let blocks = vec![
        image(ImageSource::FileUpload { id: "file-1".into() }),
        image(ImageSource::FileUpload { id: "file-1".into() }),
    ];
    let outcome = dedupe_and_filter(&blocks, &DedupeConfig::default());
    assert_eq!(outcome.blocks.len(), 1);
    assert_eq!(outcome.duplicates_removed, 1);
}

#[test]
fn test_external_images_are_never_merged() {
    let blocks = vec![
        image(ImageSource::External {
            url: "https://cdn.example.org/a.png".into(),
        }),
        image(ImageSource::External {
            url: "https://cdn.example.org/b.png".into(),
        }),
        image(ImageSource::External {
            url: "https://cdn.example.org/a.png".into(),
        }),
    ];
    let outcome = dedupe_and_filter(&blocks, &DedupeConfig::default());
    assert_eq!(outcome.blocks.len(), 3);
}

#[test]
fn test_repeated_callout_is_dropped() {
    let html = r#"
        <div class="note note_warning">Back up the instance first.</div>
        <div class="note note_warning">Back up the instance first.</div>
        <div class="note note_tip">Back up the instance first.</div>
    "#;
    let result = convert_default(html);
    assert_eq!(result.blocks.len(), 3);

    let outcome = dedupe_and_filter(&result.blocks, &DedupeConfig::default());
    // Same text but a different style is not a duplicate
    assert_eq!(outcome.blocks.len(), 2);
    assert_eq!(outcome.duplicates_removed, 1);
}

#[test]
fn test_noise_callouts_follow_configuration() {
    let blocks = vec![
        Block::callout(vec![RichTextRun::plain("Info")], "ℹ️", Color::GrayBackground),
        Block::callout(vec![RichTextRun::plain("Careful")], "⚠️", Color::RedBackground),
        Block::paragraph(vec![RichTextRun::plain("Body")]),
    ];

    let outcome = dedupe_and_filter(&blocks, &DedupeConfig::default());
    assert_eq!(outcome.callouts_filtered, 1);
    assert_eq!(
        all_text(&outcome.blocks),
        vec!["Careful".to_string(), "Body".to_string()]
    );

    let config = DedupeConfig::from_json_str(
        r#"{"noise_callouts": [{"icon": "⚠️", "color": "red_background"}]}"#,
    )
    .expect("valid config");
    let outcome = dedupe_and_filter(&blocks, &config);
    assert_eq!(
        all_text(&outcome.blocks),
        vec!["Info".to_string(), "Body".to_string()]
    );
}

#[test]
fn test_input_is_left_untouched() {
    let blocks = vec![
        Block::paragraph(vec![RichTextRun::plain("Same")]),
        Block::paragraph(vec![RichTextRun::plain("Same")]),
    ];
    let before = blocks.clone();
    let outcome = dedupe_and_filter(&blocks, &DedupeConfig::default());
    assert_eq!(outcome.blocks.len(), 1);
    assert_eq!(blocks, before);
}

#[test]
fn test_same_lead_sentence_keeps_both_procedures() {
    let html = r#"
        <div class="p">Do this:<ol><li>Open incidents</li></ol></div>
        <div class="p">Do this:<ol><li>Open problems</li></ol></div>
    "#;
    let result = convert_default(html);
    let outcome = dedupe_and_filter(&result.blocks, &DedupeConfig::default());

    assert_eq!(outcome.duplicates_removed, 0);
    assert_eq!(all_text(&outcome.blocks), all_text(&result.blocks));
    assert!(all_text(&outcome.blocks).contains(&"Open problems".to_string()));
}

#[test]
fn test_tables_holding_markers_survive() {
    let rows: String = (0..150).map(|i| format!("<tr><td>row {i}</td></tr>")).collect();
    let html = format!("<table><tbody>{rows}</tbody></table><table><tbody>{rows}</tbody></table>");
    let result = convert_default(&html);
    assert_eq!(result.marker_map.len(), 2);

    let outcome = dedupe_and_filter(&result.blocks, &DedupeConfig::default());
    assert_eq!(outcome.blocks.len(), 2);
    assert_eq!(outcome.duplicates_removed, 0);
    for table in &outcome.blocks {
        let last_row = table.children.last().map(Block::plain_text).unwrap_or_default();
        assert!(last_row.contains("sn2n:"));
    }
}
