//! Convert → publish → orchestrate against the in-memory store

mod common;

use common::{all_text, convert_default, max_depth, topic_page};
use sn2n::block_converter::deep_nesting::contains_marker;
use sn2n::blocks::{Block, RichTextRun};
use sn2n::orchestration::sweep_markers;
use sn2n::validation::FindingKind;
use sn2n::{
    ConversionConfig, DocumentMetadata, DocumentStore, Marker, MarkerMap, MemoryDocumentStore,
    OrchestratorConfig, PublishConfig, convert, orchestrate, publish, validate,
};

const PROCEDURE: &str = r#"
<h2 id="configure">Configure the scope</h2>
<ol id="steps">
  <li>Open the settings.
    <ol>
      <li>Choose a scope.
        <ul>
          <li>Global scope
            <ul><li>Applies everywhere.</li></ul>
          </li>
        </ul>
        <table>
          <tr><th>Field</th><th>Value</th></tr>
          <tr><td>Name</td><td>Required</td></tr>
        </table>
      </li>
    </ol>
  </li>
  <li>Save the record.</li>
</ol>
<p>The scope is now active.</p>
"#;

fn unlimited() -> ConversionConfig {
    ConversionConfig {
        max_nesting_depth: 64,
        ..ConversionConfig::default()
    }
}

#[tokio::test]
async fn test_published_tree_matches_unlimited_conversion() -> anyhow::Result<()> {
    let html = topic_page("Configure", PROCEDURE);
    let result = convert_default(&html);
    assert_eq!(max_depth(&result.blocks), 2);
    assert_eq!(result.marker_map.len(), 2);

    let expected = convert(&html, &unlimited())?;
    assert!(expected.marker_map.is_empty());

    let store = MemoryDocumentStore::new().with_page_size(2);
    let report = publish(
        &store,
        result,
        &DocumentMetadata::titled("Configure"),
        &PublishConfig::default(),
    )
    .await?;

    assert_eq!(report.orchestration.markers_processed, 2);
    assert_eq!(report.orchestration.fallbacks, 0);
    assert_eq!(report.orchestration.failures, 0);
    assert_eq!(report.orchestration.swept, 0);

    let tree = store.fetch_tree(&report.document_id)?;
    assert_eq!(tree, expected.blocks);
    Ok(())
}

#[tokio::test]
async fn test_no_marker_survives_publishing() -> anyhow::Result<()> {
    let html = topic_page("Configure", PROCEDURE);
    let result = convert_default(&html);

    let store = MemoryDocumentStore::new();
    let report = publish(
        &store,
        result,
        &DocumentMetadata::titled("Configure"),
        &PublishConfig::default(),
    )
    .await?;
    let tree = store.fetch_tree(&report.document_id)?;

    assert!(all_text(&tree).iter().all(|text| !contains_marker(text)));

    let validation = validate(&html, &tree, None);
    assert!(
        !validation
            .issues
            .iter()
            .any(|issue| matches!(issue.kind, FindingKind::MarkerLeak { .. }))
    );
    assert!(validation.is_clean(), "{:?}", validation);
    Ok(())
}

#[tokio::test]
async fn test_unanchored_content_lands_at_root() -> anyhow::Result<()> {
    let store = MemoryDocumentStore::new();
    let doc = store
        .create_document(
            &[Block::paragraph(vec![RichTextRun::plain("intro")])],
            &DocumentMetadata::titled("t"),
        )
        .await?;

    let mut map = MarkerMap::new();
    map.insert(
        Marker::new("lost"),
        vec![Block::bulleted(vec![RichTextRun::plain("kept anyway")])],
    );
    let report = orchestrate(&store, &doc, map, &OrchestratorConfig::default()).await;

    assert_eq!(report.fallbacks, 1);
    assert_eq!(report.appended, 1);
    assert_eq!(report.warnings.len(), 1);
    let tree = store.fetch_tree(&doc)?;
    assert_eq!(
        all_text(&tree),
        vec!["intro".to_string(), "kept anyway".to_string()]
    );
    Ok(())
}

#[tokio::test]
async fn test_similar_marker_ids_anchor_separately() -> anyhow::Result<()> {
    let x = Marker::new("x");
    let x2 = Marker::new("x-2");
    let store = MemoryDocumentStore::new();
    let doc = store
        .create_document(
            &[
                Block::bulleted(vec![RichTextRun::plain(format!("second {}", x2.visible()))]),
                Block::bulleted(vec![RichTextRun::plain(format!("first {}", x.visible()))]),
            ],
            &DocumentMetadata::titled("t"),
        )
        .await?;

    let mut map = MarkerMap::new();
    map.insert(x, vec![Block::paragraph(vec![RichTextRun::plain("under first")])]);
    map.insert(x2, vec![Block::paragraph(vec![RichTextRun::plain("under second")])]);
    let report = orchestrate(&store, &doc, map, &OrchestratorConfig::default()).await;
    assert_eq!(report.fallbacks, 0);

    let tree = store.fetch_tree(&doc)?;
    assert_eq!(tree[0].plain_text(), "second");
    assert_eq!(tree[0].children[0].plain_text(), "under second");
    assert_eq!(tree[1].plain_text(), "first");
    assert_eq!(tree[1].children[0].plain_text(), "under first");
    Ok(())
}

#[tokio::test]
async fn test_sweep_cleans_orphaned_markers() -> anyhow::Result<()> {
    let store = MemoryDocumentStore::new().with_page_size(1);
    let doc = store
        .create_document(
            &[
                Block::paragraph(vec![RichTextRun::plain("left (sn2n:orphan)")]),
                Block::bulleted(vec![RichTextRun::plain("clean")]),
            ],
            &DocumentMetadata::titled("t"),
        )
        .await?;

    let outcome = sweep_markers(&store, &doc).await;
    assert_eq!(outcome.stripped, 1);
    assert_eq!(outcome.failures, 0);
    assert_eq!(
        all_text(&store.fetch_tree(&doc)?),
        vec!["left".to_string(), "clean".to_string()]
    );
    Ok(())
}
