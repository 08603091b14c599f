//! Target-format block model
//!
//! [`Block`] is one node of the output document tree. Its variant lives in
//! [`BlockKind`]; nesting lives in `children`. Blocks serialize to the target
//! format's JSON shape (`{"object":"block","type":"paragraph",...}`).

pub mod rich_text;

pub use rich_text::{Annotations, Color, RichTextRun, plain_text, split_long_runs};

use serde::{Serialize, Serializer};
use serde_json::{Value, json};

/// Where an image's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImageSource {
    /// Already uploaded; identified by the store's file handle.
    FileUpload { id: String },
    /// Third-party image linked in place.
    External { url: String },
    /// Source-site image that must be uploaded before the page is created.
    PendingUpload { url: String },
}

impl ImageSource {
    pub fn url(&self) -> Option<&str> {
        match self {
            ImageSource::External { url } | ImageSource::PendingUpload { url } => Some(url),
            ImageSource::FileUpload { .. } => None,
        }
    }
}

/// Block variants of the target format.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Paragraph {
        rich_text: Vec<RichTextRun>,
    },
    /// Level is always within `1..=3`.
    Heading {
        level: u8,
        rich_text: Vec<RichTextRun>,
    },
    BulletedListItem {
        rich_text: Vec<RichTextRun>,
    },
    /// `number` is the item's ordinal within its own list. The target format
    /// numbers positionally, so it is not serialized.
    NumberedListItem {
        rich_text: Vec<RichTextRun>,
        number: u32,
    },
    Callout {
        rich_text: Vec<RichTextRun>,
        icon: String,
        color: Color,
    },
    Code {
        rich_text: Vec<RichTextRun>,
        language: String,
    },
    Table {
        width: usize,
        has_header: bool,
    },
    TableRow {
        cells: Vec<Vec<RichTextRun>>,
    },
    Image {
        source: ImageSource,
        caption: Vec<RichTextRun>,
    },
    Divider,
}

/// One node of the output tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub children: Vec<Block>,
    /// `id` attribute of the source element, used to derive stable markers.
    pub source_id: Option<String>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            source_id: None,
        }
    }

    pub fn paragraph(rich_text: Vec<RichTextRun>) -> Self {
        Self::new(BlockKind::Paragraph { rich_text })
    }

    pub fn heading(level: u8, rich_text: Vec<RichTextRun>) -> Self {
        Self::new(BlockKind::Heading {
            level: level.clamp(1, 3),
            rich_text,
        })
    }

    pub fn bulleted(rich_text: Vec<RichTextRun>) -> Self {
        Self::new(BlockKind::BulletedListItem { rich_text })
    }

    pub fn numbered(rich_text: Vec<RichTextRun>, number: u32) -> Self {
        Self::new(BlockKind::NumberedListItem { rich_text, number })
    }

    pub fn callout(rich_text: Vec<RichTextRun>, icon: impl Into<String>, color: Color) -> Self {
        Self::new(BlockKind::Callout {
            rich_text,
            icon: icon.into(),
            color,
        })
    }

    pub fn code(rich_text: Vec<RichTextRun>, language: impl Into<String>) -> Self {
        Self::new(BlockKind::Code {
            rich_text,
            language: language.into(),
        })
    }

    pub fn image(source: ImageSource, caption: Vec<RichTextRun>) -> Self {
        Self::new(BlockKind::Image { source, caption })
    }

    pub fn divider() -> Self {
        Self::new(BlockKind::Divider)
    }

    pub fn with_children(mut self, children: Vec<Block>) -> Self {
        self.children = children;
        self
    }

    pub fn with_source_id(mut self, id: Option<String>) -> Self {
        self.source_id = id;
        self
    }

    /// Wire type name (`paragraph`, `heading_2`, `table_row`, ...).
    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            BlockKind::Paragraph { .. } => "paragraph",
            BlockKind::Heading { level: 1, .. } => "heading_1",
            BlockKind::Heading { level: 2, .. } => "heading_2",
            BlockKind::Heading { .. } => "heading_3",
            BlockKind::BulletedListItem { .. } => "bulleted_list_item",
            BlockKind::NumberedListItem { .. } => "numbered_list_item",
            BlockKind::Callout { .. } => "callout",
            BlockKind::Code { .. } => "code",
            BlockKind::Table { .. } => "table",
            BlockKind::TableRow { .. } => "table_row",
            BlockKind::Image { .. } => "image",
            BlockKind::Divider => "divider",
        }
    }

    /// The block's own rich text, for variants that carry one.
    pub fn rich_text(&self) -> Option<&[RichTextRun]> {
        match &self.kind {
            BlockKind::Paragraph { rich_text }
            | BlockKind::Heading { rich_text, .. }
            | BlockKind::BulletedListItem { rich_text }
            | BlockKind::NumberedListItem { rich_text, .. }
            | BlockKind::Callout { rich_text, .. }
            | BlockKind::Code { rich_text, .. } => Some(rich_text),
            BlockKind::Image { caption, .. } => Some(caption),
            BlockKind::Table { .. } | BlockKind::TableRow { .. } | BlockKind::Divider => None,
        }
    }

    pub fn rich_text_mut(&mut self) -> Option<&mut Vec<RichTextRun>> {
        match &mut self.kind {
            BlockKind::Paragraph { rich_text }
            | BlockKind::Heading { rich_text, .. }
            | BlockKind::BulletedListItem { rich_text }
            | BlockKind::NumberedListItem { rich_text, .. }
            | BlockKind::Callout { rich_text, .. }
            | BlockKind::Code { rich_text, .. } => Some(rich_text),
            BlockKind::Image { caption, .. } => Some(caption),
            BlockKind::Table { .. } | BlockKind::TableRow { .. } | BlockKind::Divider => None,
        }
    }

    /// Every text-bearing run list of the block: its rich text, or each
    /// cell of a table row.
    pub fn text_runs(&self) -> Vec<&[RichTextRun]> {
        match &self.kind {
            BlockKind::TableRow { cells } => cells.iter().map(Vec::as_slice).collect(),
            _ => self.rich_text().into_iter().collect(),
        }
    }

    /// Visible plain text (cells joined by ` | ` for table rows).
    pub fn plain_text(&self) -> String {
        match &self.kind {
            BlockKind::TableRow { cells } => cells
                .iter()
                .map(|cell| plain_text(cell))
                .collect::<Vec<_>>()
                .join(" | "),
            _ => self.rich_text().map(plain_text).unwrap_or_default(),
        }
    }

    pub fn is_list_item(&self) -> bool {
        matches!(
            self.kind,
            BlockKind::BulletedListItem { .. } | BlockKind::NumberedListItem { .. }
        )
    }

    /// Blocks whose target representation requires children to exist.
    pub fn requires_children(&self) -> bool {
        matches!(self.kind, BlockKind::Table { .. })
    }

    /// Number of blocks in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(Block::subtree_len).sum::<usize>()
    }

    /// Depth of the deepest descendant (0 for a leaf).
    pub fn nesting_depth(&self) -> usize {
        self.children
            .iter()
            .map(|child| 1 + child.nesting_depth())
            .max()
            .unwrap_or(0)
    }

    /// Target-format JSON, children included.
    pub fn to_notion_value(&self) -> Value {
        let runs = |runs: &[RichTextRun]| -> Value {
            Value::Array(runs.iter().map(RichTextRun::to_notion_value).collect())
        };

        let mut body = match &self.kind {
            BlockKind::Paragraph { rich_text }
            | BlockKind::BulletedListItem { rich_text }
            | BlockKind::NumberedListItem { rich_text, .. } => {
                json!({ "rich_text": runs(rich_text), "color": "default" })
            }
            BlockKind::Heading { rich_text, .. } => {
                json!({ "rich_text": runs(rich_text), "is_toggleable": false })
            }
            BlockKind::Callout {
                rich_text,
                icon,
                color,
            } => json!({
                "rich_text": runs(rich_text),
                "icon": { "type": "emoji", "emoji": icon },
                "color": color.as_str(),
            }),
            BlockKind::Code {
                rich_text,
                language,
            } => json!({ "rich_text": runs(rich_text), "language": language, "caption": [] }),
            BlockKind::Table { width, has_header } => json!({
                "table_width": width,
                "has_column_header": has_header,
                "has_row_header": false,
            }),
            BlockKind::TableRow { cells } => json!({
                "cells": cells.iter().map(|cell| runs(cell)).collect::<Vec<_>>(),
            }),
            BlockKind::Image { source, caption } => match source {
                ImageSource::FileUpload { id } => json!({
                    "type": "file_upload",
                    "file_upload": { "id": id },
                    "caption": runs(caption),
                }),
                ImageSource::External { url } | ImageSource::PendingUpload { url } => json!({
                    "type": "external",
                    "external": { "url": url },
                    "caption": runs(caption),
                }),
            },
            BlockKind::Divider => json!({}),
        };

        if !self.children.is_empty()
            && let Value::Object(map) = &mut body
        {
            map.insert(
                "children".to_string(),
                Value::Array(self.children.iter().map(Block::to_notion_value).collect()),
            );
        }

        let type_name = self.type_name();
        let mut block = serde_json::Map::new();
        block.insert("object".to_string(), Value::from("block"));
        block.insert("type".to_string(), Value::from(type_name));
        block.insert(type_name.to_string(), body);
        Value::Object(block)
    }
}

impl Serialize for Block {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_notion_value().serialize(serializer)
    }
}

/// Total number of blocks across a forest.
pub fn count_blocks(blocks: &[Block]) -> usize {
    blocks.iter().map(Block::subtree_len).sum()
}

/// Depth-first, pre-order visit of every block in a forest.
pub fn walk_blocks<'a>(blocks: &'a [Block], visit: &mut impl FnMut(&'a Block, usize)) {
    fn inner<'a>(blocks: &'a [Block], depth: usize, visit: &mut impl FnMut(&'a Block, usize)) {
        for block in blocks {
            visit(block, depth);
            inner(&block.children, depth + 1, visit);
        }
    }
    inner(blocks, 0, visit);
}
