//! Breadth-first search for a marker's anchor block
//!
//! Markers are written into list-item-shaped parents, so at every level list
//! items are inspected first, together with their direct children, before
//! any other block. The search stops after `max_search_nodes` blocks.

use std::collections::{HashMap, VecDeque};

use super::store::{DocumentStore, RemoteBlock, list_all_children};
use crate::block_converter::deep_nesting::Marker;
use crate::blocks::BlockKind;
use crate::config::OrchestratorConfig;
use crate::error::StoreError;

/// Where a marker was found.
#[derive(Debug, Clone)]
pub(crate) struct Anchor {
    /// Block the deferred content is appended to
    pub target_id: String,
    /// Block whose text holds the marker
    pub holder: RemoteBlock,
}

/// Children listings fetched during one search.
#[derive(Default)]
struct Listings {
    cache: HashMap<String, Vec<RemoteBlock>>,
}

impl Listings {
    async fn get<S: DocumentStore>(
        &mut self,
        store: &S,
        block_id: &str,
    ) -> Result<Vec<RemoteBlock>, StoreError> {
        if let Some(children) = self.cache.get(block_id) {
            return Ok(children.clone());
        }
        let children = list_all_children(store, block_id).await?;
        self.cache.insert(block_id.to_string(), children.clone());
        Ok(children)
    }
}

/// Matches the parenthesized form so `x` never matches the holder of `x-2`.
fn holds(remote: &RemoteBlock, visible: &str) -> bool {
    remote.block.plain_text().contains(visible)
}

/// Resolve the append target for a holder found among the children of
/// `parent_id`. Markers in table rows anchor the table itself.
fn anchor_for(holder: &RemoteBlock, parent_id: &str) -> Anchor {
    let target_id = if matches!(holder.block.kind, BlockKind::TableRow { .. }) {
        parent_id.to_string()
    } else {
        holder.id.clone()
    };
    Anchor {
        target_id,
        holder: holder.clone(),
    }
}

/// Find the block holding `marker` below `root_id`. `Ok(None)` when the tree
/// (or the search budget) is exhausted without a match.
pub(crate) async fn find_anchor<S: DocumentStore>(
    store: &S,
    root_id: &str,
    marker: &Marker,
    config: &OrchestratorConfig,
) -> Result<Option<Anchor>, StoreError> {
    let visible = marker.visible();
    let mut listings = Listings::default();
    let mut queue = VecDeque::from([root_id.to_string()]);
    let mut inspected = 0usize;

    while let Some(parent_id) = queue.pop_front() {
        let children = listings.get(store, &parent_id).await?;

        // List items and one level of their children first.
        for item in children.iter().filter(|child| child.block.is_list_item()) {
            inspected += 1;
            if config.verbose {
                tracing::debug!(block_id = %item.id, marker = %marker, "Inspecting list item");
            }
            if holds(item, &visible) {
                return Ok(Some(anchor_for(item, &parent_id)));
            }
            if item.has_children {
                for child in listings.get(store, &item.id).await? {
                    inspected += 1;
                    if holds(&child, &visible) {
                        return Ok(Some(anchor_for(&child, &item.id)));
                    }
                }
            }
        }

        for block in children.iter().filter(|child| !child.block.is_list_item()) {
            inspected += 1;
            if config.verbose {
                tracing::debug!(
                    block_id = %block.id,
                    block_type = block.block.type_name(),
                    marker = %marker,
                    "Inspecting block"
                );
            }
            if holds(block, &visible) {
                return Ok(Some(anchor_for(block, &parent_id)));
            }
        }

        if inspected >= config.max_search_nodes {
            tracing::warn!(
                inspected,
                limit = config.max_search_nodes,
                marker = %marker,
                "Anchor search budget exhausted"
            );
            return Ok(None);
        }

        queue.extend(
            children
                .into_iter()
                .filter(|child| child.has_children)
                .map(|child| child.id),
        );
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{Block, RichTextRun};
    use crate::orchestration::memory_store::MemoryDocumentStore;
    use crate::orchestration::store::DocumentMetadata;

    fn item(text: &str) -> Block {
        Block::bulleted(vec![RichTextRun::plain(text)])
    }

    #[tokio::test]
    async fn finds_marker_in_nested_item() -> Result<(), StoreError> {
        let marker = Marker::new("m1");
        let store = MemoryDocumentStore::new();
        let tree = vec![
            Block::paragraph(vec![RichTextRun::plain("intro")]),
            item("a").with_children(vec![
                item("b").with_children(vec![item(&format!("c {}", marker.visible()))]),
            ]),
        ];
        let doc = store
            .create_document(&tree, &DocumentMetadata::titled("t"))
            .await?;
        let anchor = find_anchor(&store, &doc, &marker, &OrchestratorConfig::default())
            .await?
            .expect("anchor");
        assert!(anchor.holder.block.plain_text().starts_with("c "));
        assert_eq!(anchor.target_id, anchor.holder.id);
        Ok(())
    }

    #[tokio::test]
    async fn table_row_marker_targets_table() -> Result<(), StoreError> {
        let marker = Marker::new("rows");
        let store = MemoryDocumentStore::new();
        let table = Block::new(BlockKind::Table {
            width: 1,
            has_header: false,
        })
        .with_children(vec![Block::new(BlockKind::TableRow {
            cells: vec![vec![RichTextRun::plain(format!("v {}", marker.visible()))]],
        })]);
        let doc = store
            .create_document(&[table], &DocumentMetadata::titled("t"))
            .await?;
        let anchor = find_anchor(&store, &doc, &marker, &OrchestratorConfig::default())
            .await?
            .expect("anchor");
        assert_ne!(anchor.target_id, anchor.holder.id);
        let tree = store.fetch_tree(&doc)?;
        assert_eq!(tree[0].type_name(), "table");
        Ok(())
    }

    #[tokio::test]
    async fn missing_marker_is_none() -> Result<(), StoreError> {
        let store = MemoryDocumentStore::new();
        let doc = store
            .create_document(&[item("a")], &DocumentMetadata::titled("t"))
            .await?;
        let found = find_anchor(
            &store,
            &doc,
            &Marker::new("absent"),
            &OrchestratorConfig::default(),
        )
        .await?;
        assert!(found.is_none());
        Ok(())
    }
}
