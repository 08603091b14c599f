//! Duplicate and noise removal
//!
//! Each block gets a content key by type: callouts by (text, icon, color),
//! images by uploaded file id, tables by width, row count and the text of
//! their first three rows, paragraphs and code by text. Outside tables the
//! key also covers the whole `children` subtree, so two blocks only collide
//! when everything they would remove is identical. A block whose key was
//! already seen among its siblings is dropped. List items, dividers,
//! headings and external images have no key and always survive.
//!
//! A block whose subtree holds a marker anchors deferred content and is
//! never dropped. Table keys ignore marker tokens, so a plain copy of a
//! table that holds one still matches it.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

use crate::block_converter::deep_nesting::{contains_marker, strip_markers};
use crate::blocks::{Block, BlockKind, Color, ImageSource, walk_blocks};
use crate::error::Result;

/// Rows of a table included in its key.
const TABLE_KEY_ROWS: usize = 3;

/// A callout style removed by the noise filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoiseCallout {
    pub icon: String,
    pub color: Color,
}

/// Options for [`dedupe_and_filter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupeConfig {
    /// Callout styles dropped regardless of duplication
    pub noise_callouts: Vec<NoiseCallout>,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            noise_callouts: vec![NoiseCallout {
                icon: "ℹ️".to_string(),
                color: Color::GrayBackground,
            }],
        }
    }
}

impl DedupeConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Filtered blocks and what was removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DedupeOutcome {
    pub blocks: Vec<Block>,
    pub callouts_filtered: usize,
    pub duplicates_removed: usize,
}

/// Removal counts, accumulated across several passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DedupeStats {
    pub callouts_filtered: usize,
    pub duplicates_removed: usize,
}

impl DedupeStats {
    pub fn add(&mut self, outcome: &DedupeOutcome) {
        self.callouts_filtered += outcome.callouts_filtered;
        self.duplicates_removed += outcome.duplicates_removed;
    }
}

/// Remove noise callouts and duplicate siblings, recursively. The input is
/// not modified.
pub fn dedupe_and_filter(blocks: &[Block], config: &DedupeConfig) -> DedupeOutcome {
    let mut stats = DedupeStats::default();
    let blocks = filter_siblings(blocks, config, &mut stats);
    if stats.callouts_filtered > 0 || stats.duplicates_removed > 0 {
        tracing::debug!(
            callouts_filtered = stats.callouts_filtered,
            duplicates_removed = stats.duplicates_removed,
            "Deduplicated blocks"
        );
    }
    DedupeOutcome {
        blocks,
        callouts_filtered: stats.callouts_filtered,
        duplicates_removed: stats.duplicates_removed,
    }
}

fn filter_siblings(blocks: &[Block], config: &DedupeConfig, outcome: &mut DedupeStats) -> Vec<Block> {
    let mut seen: HashSet<u64> = HashSet::new();
    let mut kept = Vec::with_capacity(blocks.len());

    for block in blocks {
        if is_noise(block, config) {
            outcome.callouts_filtered += 1;
            continue;
        }
        if let Some(key) = dedupe_key(block)
            && !seen.insert(key)
            && !holds_marker(block)
        {
            tracing::debug!(block_type = block.type_name(), "Dropping duplicate block");
            outcome.duplicates_removed += 1;
            continue;
        }

        let mut copy = block.clone();
        if !matches!(block.kind, BlockKind::Table { .. }) {
            copy.children = filter_siblings(&block.children, config, outcome);
        }
        kept.push(copy);
    }
    kept
}

fn is_noise(block: &Block, config: &DedupeConfig) -> bool {
    let BlockKind::Callout { icon, color, .. } = &block.kind else {
        return false;
    };
    config
        .noise_callouts
        .iter()
        .any(|noise| noise.icon == *icon && noise.color == *color)
}

fn holds_marker(block: &Block) -> bool {
    let mut found = false;
    walk_blocks(std::slice::from_ref(block), &mut |node, _| {
        found = found || contains_marker(&node.plain_text());
    });
    found
}

/// Type and text of every block below, in order.
fn subtree_text(blocks: &[Block]) -> String {
    let mut out = String::new();
    walk_blocks(blocks, &mut |block, depth| {
        out.push_str(&format!(
            "{depth}\u{1}{}\u{1}{}\u{2}",
            block.type_name(),
            normalized(&block.plain_text())
        ));
    });
    out
}

fn normalized(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

/// Content key of a block, or `None` for blocks that are never deduplicated.
pub fn dedupe_key(block: &Block) -> Option<u64> {
    let canonical = match &block.kind {
        BlockKind::Callout { icon, color, .. } => {
            format!("callout\u{0}{}\u{0}{icon}\u{0}{}", normalized(&block.plain_text()), color.as_str())
        }
        BlockKind::Image { source, .. } => match source {
            ImageSource::FileUpload { id } => format!("image\u{0}file\u{0}{id}"),
            ImageSource::PendingUpload { url } => format!("image\u{0}pending\u{0}{url}"),
            ImageSource::External { .. } => return None,
        },
        BlockKind::Table { width, .. } => {
            let rows: Vec<String> = block
                .children
                .iter()
                .take(TABLE_KEY_ROWS)
                .map(|row| normalized(&strip_markers(&row.plain_text())))
                .collect();
            format!(
                "table\u{0}{width}\u{0}{}\u{0}{}",
                block.children.len(),
                rows.join("\u{1}")
            )
        }
        BlockKind::Paragraph { .. } | BlockKind::Code { .. } => {
            let text = normalized(&block.plain_text());
            if text.is_empty() {
                return None;
            }
            format!("{}\u{0}{text}", block.type_name())
        }
        BlockKind::BulletedListItem { .. }
        | BlockKind::NumberedListItem { .. }
        | BlockKind::Heading { .. }
        | BlockKind::TableRow { .. }
        | BlockKind::Divider => return None,
    };
    if block.children.is_empty() || matches!(block.kind, BlockKind::Table { .. }) {
        return Some(xxh3_64(canonical.as_bytes()));
    }
    let children = xxh3_64(subtree_text(&block.children).as_bytes());
    Some(xxh3_64(format!("{canonical}\u{0}{children:016x}").as_bytes()))
}
