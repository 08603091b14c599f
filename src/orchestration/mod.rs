//! Marker orchestration
//!
//! Runs after the document has been created. Each deferred subtree is
//! attached below the block holding its marker, then the marker is erased.
//! Markers are drained in registration order and one at a time: an inner
//! marker lives inside an outer marker's subtree, which must exist before
//! the inner anchor can be found.
//!
//! Every per-marker failure is soft. Content whose anchor cannot be found or
//! written to is appended to the document root instead, and a final sweep
//! strips any marker still visible.

mod anchor_search;
pub mod marker_sweep;
pub mod memory_store;
pub mod publish;
pub mod store;

pub use marker_sweep::{SweepOutcome, sweep_markers};
pub use memory_store::MemoryDocumentStore;
pub use publish::{PublishConfig, PublishReport, publish};
pub use store::{
    AppendOutcome, BlockText, ChildrenPage, DocumentMetadata, DocumentStore, FileHandle,
    RemoteBlock, UploadSource, append_chunked, list_all_children,
};

use serde::Serialize;

use crate::block_converter::deep_nesting::{Marker, MarkerMap, strip_markers};
use crate::blocks::{Block, BlockKind};
use crate::config::OrchestratorConfig;
use crate::error::StoreError;
use anchor_search::{Anchor, find_anchor};
use marker_sweep::stripped_text;

/// Outcome of one orchestration run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestrationReport {
    /// Top-level deferred blocks appended (at anchors or the root)
    pub appended: usize,
    pub markers_processed: usize,
    /// Markers whose content went to the root
    pub fallbacks: usize,
    /// Failed store calls
    pub failures: usize,
    /// Blocks cleaned by the final sweep
    pub swept: usize,
    /// Deferred tables already present at their anchor
    pub skipped_tables: usize,
    pub warnings: Vec<String>,
}

impl OrchestrationReport {
    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Attach every deferred subtree of `marker_map` inside the document
/// `root_id`, then sweep leaked markers.
///
/// Takes the map by value: it is drained here and must not be reused.
pub async fn orchestrate<S: DocumentStore>(
    store: &S,
    root_id: &str,
    marker_map: MarkerMap,
    config: &OrchestratorConfig,
) -> OrchestrationReport {
    let mut report = OrchestrationReport::default();
    let chunk_size = config.max_children_per_request.max(1);

    for (marker, blocks) in marker_map {
        report.markers_processed += 1;
        if blocks.is_empty() {
            continue;
        }

        let anchor = match find_anchor(store, root_id, &marker, config).await {
            Ok(anchor) => anchor,
            Err(e) => {
                report.failures += 1;
                report.warn(format!("Anchor search for {marker} failed: {e}"));
                None
            }
        };

        match anchor {
            Some(anchor) => {
                attach_at_anchor(store, root_id, &marker, anchor, blocks, chunk_size, &mut report)
                    .await;
            }
            None => {
                report.warn(format!(
                    "No anchor found for {marker}; appending {} block(s) to the document root",
                    blocks.len()
                ));
                append_to_root(store, root_id, &marker, &blocks, chunk_size, &mut report).await;
            }
        }
    }

    let sweep = sweep_markers(store, root_id).await;
    report.swept = sweep.stripped;
    report.failures += sweep.failures;
    if sweep.stripped > 0 {
        tracing::info!(stripped = sweep.stripped, "Final sweep removed leaked markers");
    }

    tracing::info!(
        markers = report.markers_processed,
        appended = report.appended,
        fallbacks = report.fallbacks,
        failures = report.failures,
        "Orchestration finished"
    );
    report
}

async fn attach_at_anchor<S: DocumentStore>(
    store: &S,
    root_id: &str,
    marker: &Marker,
    anchor: Anchor,
    blocks: Vec<Block>,
    chunk_size: usize,
    report: &mut OrchestrationReport,
) {
    let blocks = match skip_present_tables(store, &anchor.target_id, blocks).await {
        Ok((blocks, skipped)) => {
            report.skipped_tables += skipped;
            blocks
        }
        Err((blocks, e)) => {
            report.failures += 1;
            report.warn(format!(
                "Could not read existing children of {}: {e}",
                anchor.target_id
            ));
            blocks
        }
    };

    if !blocks.is_empty() {
        match append_chunked(store, &anchor.target_id, &blocks, chunk_size).await {
            Ok(appended) => {
                tracing::debug!(marker = %marker, target = %anchor.target_id, appended, "Attached deferred blocks");
                report.appended += appended;
            }
            Err(partial) => {
                report.failures += 1;
                report.appended += partial.appended;
                let rest = &blocks[partial.appended..];
                report.warn(format!(
                    "Append for {marker} at {} failed: {partial}; appending the remaining {} block(s) to the document root",
                    anchor.target_id,
                    rest.len()
                ));
                append_to_root(store, root_id, marker, rest, chunk_size, report).await;
            }
        }
    }

    if let Some(text) = stripped_text(&anchor.holder.block)
        && let Err(e) = store.update_block_text(&anchor.holder.id, &text).await
    {
        report.failures += 1;
        report.warn(format!("Could not strip {marker} from {}: {e}", anchor.holder.id));
    }
}

async fn append_to_root<S: DocumentStore>(
    store: &S,
    root_id: &str,
    marker: &Marker,
    blocks: &[Block],
    chunk_size: usize,
    report: &mut OrchestrationReport,
) {
    report.fallbacks += 1;
    match append_chunked(store, root_id, blocks, chunk_size).await {
        Ok(appended) => report.appended += appended,
        Err(partial) => {
            report.failures += 1;
            report.appended += partial.appended;
            report.warn(format!(
                "Root append for {marker} failed: {partial}; {} deferred block(s) were not written",
                blocks.len() - partial.appended
            ));
        }
    }
}

/// Width, row count and first-row text of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableSignature {
    width: usize,
    rows: usize,
    first_row: String,
}

impl TableSignature {
    pub(crate) fn of(table: &Block, rows: &[Block]) -> Option<Self> {
        let BlockKind::Table { width, .. } = table.kind else {
            return None;
        };
        Some(Self {
            width,
            rows: rows.len(),
            first_row: rows
                .first()
                .map(|row| strip_markers(&row.plain_text()).trim().to_string())
                .unwrap_or_default(),
        })
    }
}

/// Drop deferred tables identical to a table already below `target_id`.
async fn skip_present_tables<S: DocumentStore>(
    store: &S,
    target_id: &str,
    blocks: Vec<Block>,
) -> Result<(Vec<Block>, usize), (Vec<Block>, StoreError)> {
    if !blocks
        .iter()
        .any(|block| matches!(block.kind, BlockKind::Table { .. }))
    {
        return Ok((blocks, 0));
    }

    let mut existing = Vec::new();
    let children = match list_all_children(store, target_id).await {
        Ok(children) => children,
        Err(e) => return Err((blocks, e)),
    };
    for child in children
        .iter()
        .filter(|child| matches!(child.block.kind, BlockKind::Table { .. }))
    {
        let rows = match list_all_children(store, &child.id).await {
            Ok(rows) => rows,
            Err(e) => return Err((blocks, e)),
        };
        let rows: Vec<Block> = rows.into_iter().map(|row| row.block).collect();
        existing.extend(TableSignature::of(&child.block, &rows));
    }

    if existing.is_empty() {
        return Ok((blocks, 0));
    }

    let before = blocks.len();
    let kept: Vec<Block> = blocks
        .into_iter()
        .filter(|block| {
            TableSignature::of(block, &block.children)
                .is_none_or(|signature| !existing.contains(&signature))
        })
        .collect();
    let skipped = before - kept.len();
    if skipped > 0 {
        tracing::info!(target_id, skipped, "Skipped deferred tables already present");
    }
    Ok((kept, skipped))
}
