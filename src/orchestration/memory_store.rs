//! In-memory [`DocumentStore`]
//!
//! Enforces the same per-request limits as the real service (children per
//! call, nesting per call), paginates listings, and can be told to fail
//! appends to given targets. Backs the tests and the binary's dry run.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::store::{
    AppendOutcome, BlockText, ChildrenPage, DocumentMetadata, DocumentStore, FileHandle,
    RemoteBlock, UploadSource,
};
use crate::blocks::Block;
use crate::config::{DEFAULT_MAX_CHILDREN_PER_REQUEST, DEFAULT_MAX_NESTING_DEPTH};
use crate::error::StoreError;

#[derive(Debug)]
struct Node {
    /// `None` for document roots
    block: Option<Block>,
    children: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<String, Node>,
    titles: HashMap<String, String>,
    next_id: u64,
    uploads: Vec<UploadSource>,
    append_calls: usize,
    update_calls: usize,
}

impl State {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{}", self.next_id)
    }

    fn insert_tree(&mut self, block: &Block) -> String {
        let id = self.fresh_id("blk");
        let child_ids = block
            .children
            .iter()
            .map(|child| self.insert_tree(child))
            .collect();
        let mut stored = block.clone();
        stored.children.clear();
        self.nodes.insert(
            id.clone(),
            Node {
                block: Some(stored),
                children: child_ids,
            },
        );
        id
    }

    fn materialize(&self, id: &str) -> Option<Block> {
        let node = self.nodes.get(id)?;
        let mut block = node.block.clone()?;
        block.children = node
            .children
            .iter()
            .filter_map(|child| self.materialize(child))
            .collect();
        Some(block)
    }
}

/// Thread-safe in-memory document store.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    state: Mutex<State>,
    page_size: usize,
    max_children: usize,
    max_depth: usize,
    /// Target → appends still allowed before each further one fails
    failing_targets: Mutex<HashMap<String, usize>>,
    fail_uploads: bool,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 100,
            max_children: DEFAULT_MAX_CHILDREN_PER_REQUEST,
            max_depth: DEFAULT_MAX_NESTING_DEPTH,
            failing_targets: Mutex::new(HashMap::new()),
            fail_uploads: false,
        }
    }

    /// Children returned per listing page.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make every upload fail.
    #[must_use]
    pub fn with_failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    /// Make appends to `target_id` fail from now on.
    pub fn fail_appends_to(&self, target_id: impl Into<String>) {
        self.fail_appends_after(target_id, 0);
    }

    /// Let `successes` more appends to `target_id` through, then fail every
    /// further one.
    pub fn fail_appends_after(&self, target_id: impl Into<String>, successes: usize) {
        self.failing_targets.lock().insert(target_id.into(), successes);
    }

    /// Full tree under `root_id`, children included.
    pub fn fetch_tree(&self, root_id: &str) -> Result<Vec<Block>, StoreError> {
        let state = self.state.lock();
        let node = state
            .nodes
            .get(root_id)
            .ok_or_else(|| StoreError::NotFound(root_id.to_string()))?;
        Ok(node
            .children
            .iter()
            .filter_map(|child| state.materialize(child))
            .collect())
    }

    pub fn title(&self, document_id: &str) -> Option<String> {
        self.state.lock().titles.get(document_id).cloned()
    }

    pub fn uploads(&self) -> Vec<UploadSource> {
        self.state.lock().uploads.clone()
    }

    pub fn append_calls(&self) -> usize {
        self.state.lock().append_calls
    }

    pub fn update_calls(&self) -> usize {
        self.state.lock().update_calls
    }

    fn check_request(&self, blocks: &[Block]) -> Result<(), StoreError> {
        if blocks.len() > self.max_children {
            return Err(StoreError::Rejected(format!(
                "{} children exceed the limit of {}",
                blocks.len(),
                self.max_children
            )));
        }
        for block in blocks {
            if block.nesting_depth() > self.max_depth {
                return Err(StoreError::Rejected(format!(
                    "{} block nests {} levels, limit is {}",
                    block.type_name(),
                    block.nesting_depth(),
                    self.max_depth
                )));
            }
            if block.children.len() > self.max_children {
                return Err(StoreError::Rejected(format!(
                    "{} block carries {} children, limit is {}",
                    block.type_name(),
                    block.children.len(),
                    self.max_children
                )));
            }
            self.check_request(&block.children)?;
        }
        Ok(())
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn create_document(
        &self,
        blocks: &[Block],
        metadata: &DocumentMetadata,
    ) -> Result<String, StoreError> {
        self.check_request(blocks)?;
        let mut state = self.state.lock();
        let id = state.fresh_id("doc");
        let children = blocks.iter().map(|block| state.insert_tree(block)).collect();
        state.nodes.insert(
            id.clone(),
            Node {
                block: None,
                children,
            },
        );
        state.titles.insert(id.clone(), metadata.title.clone());
        Ok(id)
    }

    async fn append_children(
        &self,
        target_id: &str,
        blocks: &[Block],
    ) -> Result<AppendOutcome, StoreError> {
        if let Some(remaining) = self.failing_targets.lock().get_mut(target_id) {
            if *remaining == 0 {
                return Err(StoreError::Request(format!(
                    "injected append failure for {target_id}"
                )));
            }
            *remaining -= 1;
        }
        self.check_request(blocks)?;

        let mut state = self.state.lock();
        state.append_calls += 1;
        if !state.nodes.contains_key(target_id) {
            return Err(StoreError::NotFound(target_id.to_string()));
        }
        let block_ids: Vec<String> = blocks.iter().map(|block| state.insert_tree(block)).collect();
        if let Some(target) = state.nodes.get_mut(target_id) {
            target.children.extend(block_ids.iter().cloned());
        }
        Ok(AppendOutcome {
            appended: block_ids.len(),
            block_ids,
        })
    }

    async fn list_children(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage, StoreError> {
        let state = self.state.lock();
        let node = state
            .nodes
            .get(block_id)
            .ok_or_else(|| StoreError::NotFound(block_id.to_string()))?;

        let start = match cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| StoreError::Rejected(format!("invalid cursor '{cursor}'")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(node.children.len());
        let results = node
            .children
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| {
                let child = state.nodes.get(id)?;
                Some(RemoteBlock {
                    id: id.clone(),
                    block: child.block.clone()?,
                    has_children: !child.children.is_empty(),
                })
            })
            .collect();
        let has_more = end < node.children.len();
        Ok(ChildrenPage {
            results,
            has_more,
            next_cursor: has_more.then(|| end.to_string()),
        })
    }

    async fn update_block_text(&self, block_id: &str, text: &BlockText) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        state.update_calls += 1;
        let block = state
            .nodes
            .get_mut(block_id)
            .and_then(|node| node.block.as_mut())
            .ok_or_else(|| StoreError::NotFound(block_id.to_string()))?;
        text.apply_to(block);
        Ok(())
    }

    async fn upload_binary(&self, source: &UploadSource) -> Result<FileHandle, StoreError> {
        if self.fail_uploads {
            let source_url = match source {
                UploadSource::Url(url) => url.clone(),
                UploadSource::Bytes { filename, .. } => filename.clone(),
            };
            return Err(StoreError::Upload {
                source_url,
                reason: "injected upload failure".to_string(),
            });
        }
        let mut state = self.state.lock();
        state.uploads.push(source.clone());
        let id = state.fresh_id("file");
        Ok(FileHandle { id })
    }
}
