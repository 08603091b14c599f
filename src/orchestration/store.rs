//! Document-store capability
//!
//! The remote document service is an external collaborator. The crate only
//! needs the handful of calls below; transport, authentication, retry and
//! timeouts belong to the implementation.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::blocks::{Block, BlockKind, RichTextRun};
use crate::error::{PartialAppend, StoreError};

/// Metadata of a document being created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: String,
    /// Parent page or database the document is created under
    pub parent_id: Option<String>,
    /// Page the content was converted from
    pub source_url: Option<String>,
}

impl DocumentMetadata {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// Result of one append call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendOutcome {
    pub appended: usize,
    /// Ids of the appended top-level blocks, in order
    pub block_ids: Vec<String>,
}

/// A block as stored remotely. `block.children` is always empty; use
/// [`DocumentStore::list_children`] to read below it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteBlock {
    pub id: String,
    pub block: Block,
    pub has_children: bool,
}

/// One page of a children listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChildrenPage {
    pub results: Vec<RemoteBlock>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

/// Replacement text content of a block.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockText {
    RichText(Vec<RichTextRun>),
    Cells(Vec<Vec<RichTextRun>>),
}

impl BlockText {
    /// Text content of `block`, or `None` for blocks without text.
    pub fn of(block: &Block) -> Option<Self> {
        match &block.kind {
            BlockKind::TableRow { cells } => Some(Self::Cells(cells.clone())),
            _ => block.rich_text().map(|runs| Self::RichText(runs.to_vec())),
        }
    }

    /// Write this text into `block`. Mismatched shapes are ignored.
    pub fn apply_to(&self, block: &mut Block) {
        match (self, &mut block.kind) {
            (Self::Cells(new_cells), BlockKind::TableRow { cells }) => {
                cells.clone_from(new_cells);
            }
            (Self::RichText(runs), _) => {
                if let Some(slot) = block.rich_text_mut() {
                    slot.clone_from(runs);
                }
            }
            (Self::Cells(_), _) => {}
        }
    }
}

/// Source of a binary upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    /// Let the store fetch the file from a URL
    Url(String),
    Bytes {
        filename: String,
        content_type: String,
        data: Vec<u8>,
    },
}

/// Handle of an uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileHandle {
    pub id: String,
}

/// Remote document store.
///
/// Callers respect the per-call children cap; implementations are not
/// required to chunk.
pub trait DocumentStore: Send + Sync {
    /// Create a document holding `blocks` and return its id.
    fn create_document(
        &self,
        blocks: &[Block],
        metadata: &DocumentMetadata,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Append `blocks` as the last children of `target_id`.
    fn append_children(
        &self,
        target_id: &str,
        blocks: &[Block],
    ) -> impl Future<Output = Result<AppendOutcome, StoreError>> + Send;

    /// One page of the children of `block_id`.
    fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<ChildrenPage, StoreError>> + Send;

    /// Replace the text content of a block.
    fn update_block_text(
        &self,
        block_id: &str,
        text: &BlockText,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Upload a binary and return its handle.
    fn upload_binary(
        &self,
        source: &UploadSource,
    ) -> impl Future<Output = Result<FileHandle, StoreError>> + Send;
}

/// Every child of `block_id`, following pagination.
pub async fn list_all_children<S: DocumentStore>(
    store: &S,
    block_id: &str,
) -> Result<Vec<RemoteBlock>, StoreError> {
    let mut out = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store.list_children(block_id, cursor.as_deref()).await?;
        out.extend(page.results);
        match page.next_cursor {
            Some(next) if page.has_more => cursor = Some(next),
            _ => break,
        }
    }
    Ok(out)
}

/// Append `blocks` in order, at most `chunk_size` per call. On failure the
/// error says how many leading blocks made it.
pub async fn append_chunked<S: DocumentStore>(
    store: &S,
    target_id: &str,
    blocks: &[Block],
    chunk_size: usize,
) -> Result<usize, PartialAppend> {
    let mut appended = 0;
    for chunk in blocks.chunks(chunk_size.max(1)) {
        match store.append_children(target_id, chunk).await {
            Ok(_) => appended += chunk.len(),
            Err(source) => return Err(PartialAppend { appended, source }),
        }
    }
    Ok(appended)
}
