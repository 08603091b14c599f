//! Publishing a conversion result
//!
//! Composes the store capabilities in order: upload source-site images,
//! deduplicate, create the document with the first chunk of blocks, append
//! the remaining chunks, then orchestrate the deferred subtrees.

use std::collections::HashMap;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::store::{DocumentMetadata, DocumentStore, UploadSource, append_chunked};
use super::{OrchestrationReport, orchestrate};
use crate::block_converter::ConversionResult;
use crate::block_converter::deep_nesting::MarkerMap;
use crate::blocks::{Block, BlockKind, ImageSource};
use crate::config::OrchestratorConfig;
use crate::dedupe::{DedupeConfig, DedupeStats, dedupe_and_filter};
use crate::error::Result;

/// Options for [`publish`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub orchestrator: OrchestratorConfig,
    pub dedupe: DedupeConfig,
}

impl PublishConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Outcome of one publish.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PublishReport {
    pub document_id: String,
    /// Top-level blocks sent with the create call
    pub created: usize,
    /// Top-level blocks sent in follow-up append calls
    pub appended: usize,
    pub uploads: usize,
    pub upload_failures: usize,
    pub dedupe: DedupeStats,
    pub orchestration: OrchestrationReport,
    pub warnings: Vec<String>,
}

impl PublishReport {
    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Publish `result` as a new document.
///
/// Fails only when the document itself cannot be created. Later failures
/// are counted in the report.
pub async fn publish<S: DocumentStore>(
    store: &S,
    result: ConversionResult,
    metadata: &DocumentMetadata,
    config: &PublishConfig,
) -> Result<PublishReport> {
    let ConversionResult {
        mut blocks,
        mut marker_map,
        warnings,
    } = result;
    let mut report = PublishReport {
        warnings,
        ..PublishReport::default()
    };

    resolve_uploads(store, &mut blocks, &mut marker_map, &mut report).await;

    let top = dedupe_and_filter(&blocks, &config.dedupe);
    report.dedupe.add(&top);
    let blocks = top.blocks;
    for (_, deferred) in marker_map.iter_mut() {
        let outcome = dedupe_and_filter(deferred, &config.dedupe);
        report.dedupe.add(&outcome);
        *deferred = outcome.blocks;
    }

    let chunk_size = config.orchestrator.max_children_per_request.max(1);
    let (first, rest) = blocks.split_at(chunk_size.min(blocks.len()));

    let document_id = store.create_document(first, metadata).await?;
    tracing::info!(document_id = %document_id, created = first.len(), "Created document");
    report.document_id = document_id.clone();
    report.created = first.len();

    if !rest.is_empty() {
        match append_chunked(store, &document_id, rest, chunk_size).await {
            Ok(appended) => report.appended = appended,
            Err(partial) => {
                report.appended = partial.appended;
                report.warn(format!(
                    "Appending {} remaining top-level block(s) failed: {partial}",
                    rest.len() - partial.appended
                ));
            }
        }
    }

    report.orchestration = orchestrate(store, &document_id, marker_map, &config.orchestrator).await;
    Ok(report)
}

/// Upload every distinct pending image concurrently and rewrite its source. A failed upload
/// leaves the image linked externally.
async fn resolve_uploads<S: DocumentStore>(
    store: &S,
    blocks: &mut [Block],
    marker_map: &mut MarkerMap,
    report: &mut PublishReport,
) {
    let mut pending = Vec::new();
    collect_pending(blocks, &mut pending);
    for (_, deferred) in marker_map.iter() {
        collect_pending(deferred, &mut pending);
    }
    if pending.is_empty() {
        return;
    }

    let mut distinct = Vec::with_capacity(pending.len());
    for url in pending {
        if !distinct.contains(&url) {
            distinct.push(url);
        }
    }

    let uploads = distinct.into_iter().map(|url| async move {
        let outcome = store.upload_binary(&UploadSource::Url(url.clone())).await;
        (url, outcome)
    });

    let mut resolved: HashMap<String, ImageSource> = HashMap::new();
    for (url, outcome) in join_all(uploads).await {
        let source = match outcome {
            Ok(handle) => {
                report.uploads += 1;
                ImageSource::FileUpload { id: handle.id }
            }
            Err(e) => {
                report.upload_failures += 1;
                report.warn(format!("Image upload failed, linking externally: {e}"));
                ImageSource::External { url: url.clone() }
            }
        };
        resolved.insert(url, source);
    }

    rewrite_sources(blocks, &resolved);
    for (_, deferred) in marker_map.iter_mut() {
        rewrite_sources(deferred, &resolved);
    }
}

fn collect_pending(blocks: &[Block], out: &mut Vec<String>) {
    for block in blocks {
        if let BlockKind::Image {
            source: ImageSource::PendingUpload { url },
            ..
        } = &block.kind
        {
            out.push(url.clone());
        }
        collect_pending(&block.children, out);
    }
}

fn rewrite_sources(blocks: &mut [Block], resolved: &HashMap<String, ImageSource>) {
    for block in blocks {
        if let BlockKind::Image { source, .. } = &mut block.kind {
            let replacement = match source {
                ImageSource::PendingUpload { url } => resolved.get(url.as_str()).cloned(),
                _ => None,
            };
            if let Some(replacement) = replacement {
                *source = replacement;
            }
        }
        rewrite_sources(&mut block.children, resolved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::RichTextRun;
    use crate::orchestration::MemoryDocumentStore;

    fn pending(url: &str) -> Block {
        Block::image(ImageSource::PendingUpload { url: url.into() }, vec![])
    }

    #[tokio::test]
    async fn uploads_each_image_once() -> Result<()> {
        let store = MemoryDocumentStore::new();
        let result = ConversionResult {
            blocks: vec![
                pending("https://docs.servicenow.com/a.png"),
                Block::paragraph(vec![RichTextRun::plain("between")]),
                pending("https://docs.servicenow.com/a.png"),
            ],
            ..ConversionResult::default()
        };
        let report = publish(
            &store,
            result,
            &DocumentMetadata::titled("t"),
            &PublishConfig::default(),
        )
        .await?;

        assert_eq!(report.uploads, 1);
        assert_eq!(store.uploads().len(), 1);
        // Both now reference the same file and the second is a duplicate.
        assert_eq!(report.dedupe.duplicates_removed, 1);
        let tree = store.fetch_tree(&report.document_id)?;
        assert_eq!(tree.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn failed_upload_degrades_to_external() -> Result<()> {
        let store = MemoryDocumentStore::new().with_failing_uploads();
        let result = ConversionResult {
            blocks: vec![pending("https://docs.servicenow.com/a.png")],
            ..ConversionResult::default()
        };
        let report = publish(
            &store,
            result,
            &DocumentMetadata::titled("t"),
            &PublishConfig::default(),
        )
        .await?;
        assert_eq!(report.upload_failures, 1);
        let tree = store.fetch_tree(&report.document_id)?;
        assert!(matches!(
            &tree[0].kind,
            BlockKind::Image {
                source: ImageSource::External { .. },
                ..
            }
        ));
        Ok(())
    }

    #[tokio::test]
    async fn long_documents_are_chunked() -> Result<()> {
        let store = MemoryDocumentStore::new();
        let result = ConversionResult {
            blocks: (0..230)
                .map(|i| Block::bulleted(vec![RichTextRun::plain(i.to_string())]))
                .collect(),
            ..ConversionResult::default()
        };
        let report = publish(
            &store,
            result,
            &DocumentMetadata::titled("t"),
            &PublishConfig::default(),
        )
        .await?;
        assert_eq!(report.created, 100);
        assert_eq!(report.appended, 130);
        assert_eq!(store.fetch_tree(&report.document_id)?.len(), 230);
        Ok(())
    }
}
