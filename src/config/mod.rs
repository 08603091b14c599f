//! Configuration module
//!
//! Explicit configuration for conversion and orchestration. Every entry point
//! takes its config by reference; there are no global flags.

pub mod types;

pub use types::{
    ConversionConfig, DEFAULT_MAX_CHILDREN_PER_REQUEST, DEFAULT_MAX_NESTING_DEPTH,
    DEFAULT_MAX_RICH_TEXT_CHARS, DEFAULT_MAX_SEARCH_NODES, OrchestratorConfig,
};
