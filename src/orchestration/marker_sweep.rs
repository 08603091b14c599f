//! Final marker sweep
//!
//! Walks the whole created tree once and strips every marker-shaped
//! substring still visible, whichever marker it belongs to.

use std::collections::VecDeque;

use super::store::{BlockText, DocumentStore, list_all_children};
use crate::block_converter::deep_nesting::{contains_marker, strip_marker_from_runs};

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub inspected: usize,
    /// Blocks whose text was rewritten
    pub stripped: usize,
    /// Listing or update calls that failed
    pub failures: usize,
}

/// Strip leaked markers from every block below `root_id`.
pub async fn sweep_markers<S: DocumentStore>(store: &S, root_id: &str) -> SweepOutcome {
    let mut outcome = SweepOutcome::default();
    let mut queue = VecDeque::from([root_id.to_string()]);

    while let Some(parent_id) = queue.pop_front() {
        let children = match list_all_children(store, &parent_id).await {
            Ok(children) => children,
            Err(e) => {
                tracing::warn!(block_id = %parent_id, error = %e, "Marker sweep could not list children");
                outcome.failures += 1;
                continue;
            }
        };

        for remote in children {
            outcome.inspected += 1;
            if contains_marker(&remote.block.plain_text())
                && let Some(text) = stripped_text(&remote.block)
            {
                match store.update_block_text(&remote.id, &text).await {
                    Ok(()) => {
                        tracing::info!(block_id = %remote.id, "Stripped leaked marker");
                        outcome.stripped += 1;
                    }
                    Err(e) => {
                        tracing::warn!(block_id = %remote.id, error = %e, "Failed to strip leaked marker");
                        outcome.failures += 1;
                    }
                }
            }
            if remote.has_children {
                queue.push_back(remote.id);
            }
        }
    }
    outcome
}

/// Block text with all markers removed, `None` when nothing changed.
pub(crate) fn stripped_text(block: &crate::blocks::Block) -> Option<BlockText> {
    let mut text = BlockText::of(block)?;
    let changed = match &mut text {
        BlockText::RichText(runs) => strip_marker_from_runs(runs, None),
        BlockText::Cells(cells) => cells
            .iter_mut()
            .fold(false, |changed, cell| strip_marker_from_runs(cell, None) | changed),
    };
    changed.then_some(text)
}
