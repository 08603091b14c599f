//! Deep-nesting deferral
//!
//! The target format accepts at most `max_nesting_depth` levels of children
//! below a top-level block, and at most `max_children_per_request` children
//! per block, in one request. This pass walks the classified tree and cuts
//! everything beyond those limits. Each cut subtree is stored in a
//! [`MarkerMap`] under a fresh [`Marker`] whose visible form is appended to
//! the parent's text. Orchestration later finds the marker in the created
//! document, attaches the subtree there and erases the marker.
//!
//! Deferred subtrees are limited again with their depth reset to zero, since
//! they are attached by separate requests. Markers are registered outer
//! before inner so that draining the map in order always finds an anchor
//! that already exists.

use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use crate::blocks::{Block, BlockKind, RichTextRun, count_blocks};
use crate::config::ConversionConfig;

/// Prefix of every marker token.
pub const MARKER_PREFIX: &str = "sn2n:";

/// Visible marker form, `(sn2n:<id>)`, with the whitespace before it.
static VISIBLE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*\(sn2n:[A-Za-z0-9_-]+\)")
        .expect("BUG: hardcoded visible marker regex is invalid")
});

/// Any marker-shaped substring.
static MARKER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"sn2n:[A-Za-z0-9_-]+").expect("BUG: hardcoded marker token regex is invalid")
});

// ============================================================================
// Marker
// ============================================================================

/// Anchor token for a deferred subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Marker {
    id: String,
}

impl Marker {
    /// Marker with the given id. The id is sanitized to `[A-Za-z0-9_-]`.
    pub fn new(id: &str) -> Self {
        Self { id: sanitize_id(id) }
    }

    /// Marker with a time-and-random id.
    pub fn generate() -> Self {
        let millis = chrono::Utc::now().timestamp_millis().unsigned_abs();
        let salt: u32 = rand::random();
        Self {
            id: format!("{}-{}", to_base36(millis), to_base36(u64::from(salt))),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `sn2n:<id>`
    pub fn token(&self) -> String {
        format!("{MARKER_PREFIX}{}", self.id)
    }

    /// `(sn2n:<id>)`, the form written into block text.
    pub fn visible(&self) -> String {
        format!("({})", self.token())
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{MARKER_PREFIX}{}", self.id)
    }
}

fn sanitize_id(raw: &str) -> String {
    let mapped: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    mapped.trim_matches('-').to_string()
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

// ============================================================================
// Marker text helpers
// ============================================================================

/// `true` when `text` contains a marker-shaped substring.
pub fn contains_marker(text: &str) -> bool {
    MARKER_TOKEN.is_match(text)
}

/// Every marker token (`sn2n:<id>`) found in `text`.
pub fn find_markers(text: &str) -> Vec<&str> {
    MARKER_TOKEN.find_iter(text).map(|m| m.as_str()).collect()
}

/// Remove visible markers, then any bare marker tokens left behind.
pub fn strip_markers(text: &str) -> Cow<'_, str> {
    if !contains_marker(text) {
        return Cow::Borrowed(text);
    }
    let without_visible = VISIBLE_MARKER.replace_all(text, "");
    Cow::Owned(MARKER_TOKEN.replace_all(&without_visible, "").into_owned())
}

/// Remove one specific marker from a run list. Returns `true` when anything
/// changed. Runs left empty (and not links) are dropped.
pub fn strip_marker_from_runs(runs: &mut Vec<RichTextRun>, marker: Option<&Marker>) -> bool {
    let mut changed = false;
    for run in runs.iter_mut() {
        let stripped = match marker {
            Some(marker) => strip_one(&run.content, marker),
            None => strip_markers(&run.content),
        };
        if let Cow::Owned(stripped) = stripped {
            run.content = stripped;
            changed = true;
        }
    }
    if changed {
        runs.retain(|run| !run.content.is_empty() || run.link.is_some());
        if let Some(last) = runs.last_mut()
            && last.link.is_none()
        {
            let trimmed_len = last.content.trim_end().len();
            last.content.truncate(trimmed_len);
        }
        runs.retain(|run| !run.content.is_empty() || run.link.is_some());
    }
    changed
}

fn strip_one<'t>(text: &'t str, marker: &Marker) -> Cow<'t, str> {
    let token = marker.token();
    if !text.contains(&token) {
        return Cow::Borrowed(text);
    }
    let visible = marker.visible();
    let without_visible = match text.find(&visible) {
        Some(at) => {
            let head = text[..at].trim_end();
            format!("{head}{}", &text[at + visible.len()..])
        }
        None => text.to_string(),
    };
    Cow::Owned(without_visible.replace(&token, ""))
}

// ============================================================================
// MarkerMap
// ============================================================================

/// Deferred subtrees keyed by marker, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerMap {
    entries: Vec<(Marker, Vec<Block>)>,
}

impl MarkerMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, marker: Marker, blocks: Vec<Block>) {
        match self.entries.iter_mut().find(|(m, _)| *m == marker) {
            Some((_, existing)) => *existing = blocks,
            None => self.entries.push((marker, blocks)),
        }
    }

    pub fn get(&self, marker: &Marker) -> Option<&[Block]> {
        self.entries
            .iter()
            .find(|(m, _)| m == marker)
            .map(|(_, blocks)| blocks.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Marker, &[Block])> {
        self.entries
            .iter()
            .map(|(marker, blocks)| (marker, blocks.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Marker, &mut Vec<Block>)> {
        self.entries
            .iter_mut()
            .map(|(marker, blocks)| (&*marker, blocks))
    }

    /// Blocks held across all entries, descendants included.
    pub fn total_blocks(&self) -> usize {
        self.entries.iter().map(|(_, blocks)| count_blocks(blocks)).sum()
    }

    fn reserve(&mut self, marker: Marker) -> usize {
        self.entries.push((marker, Vec::new()));
        self.entries.len() - 1
    }

    fn fill(&mut self, slot: usize, blocks: Vec<Block>) {
        if let Some((_, entry)) = self.entries.get_mut(slot) {
            *entry = blocks;
        }
    }
}

impl IntoIterator for MarkerMap {
    type Item = (Marker, Vec<Block>);
    type IntoIter = std::vec::IntoIter<(Marker, Vec<Block>)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl Serialize for MarkerMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (marker, blocks) in &self.entries {
            map.serialize_entry(&marker.token(), blocks)?;
        }
        map.end()
    }
}

// ============================================================================
// Limit enforcement
// ============================================================================

struct Deferral<'w> {
    max_depth: usize,
    max_children: usize,
    max_chars: usize,
    map: MarkerMap,
    used_ids: HashSet<String>,
    warnings: &'w mut Vec<String>,
    verbose: bool,
}

/// Cut the tree to the configured depth and fan-out limits.
///
/// Returns the blocks to create directly and the deferred subtrees. Content
/// is never dropped: a parent that cannot carry a marker gets its deferred
/// children hoisted as siblings instead, with a warning.
pub fn enforce_limits(
    blocks: Vec<Block>,
    config: &ConversionConfig,
    warnings: &mut Vec<String>,
) -> (Vec<Block>, MarkerMap) {
    let mut deferral = Deferral {
        max_depth: config.max_nesting_depth.max(1),
        max_children: config.max_children_per_request.max(1),
        max_chars: config.max_rich_text_chars.max(1),
        map: MarkerMap::new(),
        used_ids: HashSet::new(),
        warnings,
        verbose: config.verbose,
    };
    let blocks = deferral.limit(blocks, 0);
    if !deferral.map.is_empty() {
        tracing::debug!(
            markers = deferral.map.len(),
            deferred_blocks = deferral.map.total_blocks(),
            "Deferred nested content"
        );
    }
    (blocks, deferral.map)
}

impl Deferral<'_> {
    /// Limit a sibling list whose members sit at `depth`.
    fn limit(&mut self, blocks: Vec<Block>, depth: usize) -> Vec<Block> {
        let mut out = Vec::with_capacity(blocks.len());
        for mut block in blocks {
            let children = std::mem::take(&mut block.children);
            let (keep, deferred) = self.partition(children, depth);
            block.children = self.limit(keep, depth + 1);

            if deferred.is_empty() {
                out.push(block);
                continue;
            }

            let marker = self.next_marker(block.source_id.as_deref());
            if attach_marker(&mut block, &marker, self.max_chars) {
                if self.verbose {
                    tracing::debug!(
                        marker = %marker,
                        block_type = block.type_name(),
                        depth,
                        deferred = deferred.len(),
                        "Deferring children"
                    );
                }
                let slot = self.map.reserve(marker);
                let deferred = self.limit(deferred, 0);
                self.map.fill(slot, deferred);
                out.push(block);
            } else {
                let message = format!(
                    "{} block cannot carry a marker; {} nested blocks moved to its level",
                    block.type_name(),
                    deferred.len()
                );
                tracing::warn!("{}", message);
                self.warnings.push(message);
                out.push(block);
                out.extend(self.limit(deferred, depth));
            }
        }
        out
    }

    /// Split the children of a block at `depth` into the part created with
    /// it and the part deferred.
    fn partition(&self, mut children: Vec<Block>, depth: usize) -> (Vec<Block>, Vec<Block>) {
        if children.is_empty() {
            return (children, Vec::new());
        }
        if depth >= self.max_depth {
            return (Vec::new(), children);
        }

        let mut split_at = children.len().min(self.max_children);
        // Tables need their rows in the same request; a table on the last
        // level would push its rows past the limit.
        if depth + 1 == self.max_depth
            && let Some(first_table) = children
                .iter()
                .position(|child| matches!(child.kind, BlockKind::Table { .. }))
        {
            split_at = split_at.min(first_table);
        }
        let deferred = children.split_off(split_at);
        (children, deferred)
    }

    fn next_marker(&mut self, source_id: Option<&str>) -> Marker {
        let base = source_id
            .map(sanitize_id)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| Marker::generate().id);

        let mut id = base.clone();
        let mut n = 2;
        while self.used_ids.contains(&id) {
            id = format!("{base}-{n}");
            n += 1;
        }
        self.used_ids.insert(id.clone());
        Marker { id }
    }
}

/// Append the visible marker to the block's text: the last run of its rich
/// text, or the last cell of its last row for tables.
fn attach_marker(block: &mut Block, marker: &Marker, max_chars: usize) -> bool {
    let visible = marker.visible();

    if let Some(runs) = block.rich_text_mut() {
        append_to_runs(runs, &visible, max_chars);
        return true;
    }

    if matches!(block.kind, BlockKind::Table { .. })
        && let Some(row) = block.children.last_mut()
        && let BlockKind::TableRow { cells } = &mut row.kind
        && let Some(cell) = cells.last_mut()
    {
        append_to_runs(cell, &visible, max_chars);
        return true;
    }
    false
}

fn append_to_runs(runs: &mut Vec<RichTextRun>, visible: &str, max_chars: usize) {
    match runs.last_mut() {
        Some(last)
            if last.link.is_none()
                && last.content.chars().count() + visible.chars().count() < max_chars =>
        {
            last.content.push(' ');
            last.content.push_str(visible);
        }
        Some(_) => runs.push(RichTextRun::plain(format!(" {visible}"))),
        None => runs.push(RichTextRun::plain(visible)),
    }
}
