//! ServiceNow documentation HTML → Notion block trees
//!
//! Conversion is pure and synchronous: [`convert`] turns a page into an
//! ordered list of blocks no deeper than the target API accepts, plus a
//! [`MarkerMap`] of deferred subtrees. Publishing is asynchronous and goes
//! through the [`DocumentStore`] seam: [`publish`] creates the document and
//! [`orchestrate`] attaches each deferred subtree at its marker. [`validate`]
//! compares the created tree with the source page.

pub mod block_converter;
pub mod blocks;
pub mod config;
pub mod dedupe;
pub mod error;
pub mod orchestration;
pub mod validation;

pub use block_converter::deep_nesting::{Marker, MarkerMap};
pub use block_converter::rich_text::technical::is_technical;
pub use block_converter::rich_text::{to_rich_text, to_rich_text_with};
pub use block_converter::table::{TableConversion, to_table_block, to_table_block_with};
pub use block_converter::text_normalizer::normalize;
pub use block_converter::{ConversionResult, convert};
pub use blocks::{Annotations, Block, BlockKind, Color, ImageSource, RichTextRun};
pub use config::{ConversionConfig, OrchestratorConfig};
pub use dedupe::{DedupeConfig, DedupeOutcome, dedupe_and_filter};
pub use error::{PartialAppend, Result, Sn2nError, StoreError};
pub use orchestration::{
    DocumentMetadata, DocumentStore, MemoryDocumentStore, OrchestrationReport, PublishConfig,
    PublishReport, orchestrate, publish,
};
pub use validation::{Expectations, ValidationReport, validate};
