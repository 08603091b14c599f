//! Core configuration types
//!
//! Conversion and orchestration behaviour is configured explicitly through
//! these structs and passed into each call. Nothing in the crate reads
//! ambient or global state.

use serde::{Deserialize, Serialize};

use crate::block_converter::rich_text::technical::TechnicalHeuristics;
use crate::error::{Result, Sn2nError};

/// Nesting levels the target format accepts below a block in one request.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 2;

/// Children the target format accepts in a single create/append call.
pub const DEFAULT_MAX_CHILDREN_PER_REQUEST: usize = 100;

/// Characters the target format accepts in a single text run.
pub const DEFAULT_MAX_RICH_TEXT_CHARS: usize = 2000;

/// Blocks the orchestrator inspects before giving up on an anchor search.
pub const DEFAULT_MAX_SEARCH_NODES: usize = 5000;

/// Options for the HTML→block conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Emit per-node dispatch traces at `debug` level
    pub verbose: bool,

    /// Scope conversion to the main content container (default: true)
    pub extract_main_content: bool,

    /// Base URL used to resolve relative `href` and `src` attributes
    pub base_url: Option<String>,

    /// Hosts whose images are uploaded instead of linked. Subdomains match.
    pub upload_hosts: Vec<String>,

    /// Class-name fragments of non-content wrapper chrome to skip
    pub chrome_classes: Vec<String>,

    /// Maximum nesting below a top-level block materialized in one request
    pub max_nesting_depth: usize,

    /// Maximum children carried by one block in one request
    pub max_children_per_request: usize,

    /// Maximum characters per rich-text run
    pub max_rich_text_chars: usize,

    /// Language used for code blocks without a recognizable hint
    pub default_code_language: String,

    /// Tuning of the code-vs-label heuristic for ambiguous inline elements
    pub technical: TechnicalHeuristics,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            extract_main_content: true,
            base_url: None,
            upload_hosts: vec!["servicenow.com".to_string(), "service-now.com".to_string()],
            chrome_classes: vec![
                "zDocsFilterTableDiv".to_string(),
                "zDocsFilterColumnsTableDiv".to_string(),
                "zDocsDropdownMenu".to_string(),
                "zDocsTopicPageTableExportButton".to_string(),
                "miniTOC".to_string(),
                "contentPlaceholder".to_string(),
            ],
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            max_children_per_request: DEFAULT_MAX_CHILDREN_PER_REQUEST,
            max_rich_text_chars: DEFAULT_MAX_RICH_TEXT_CHARS,
            default_code_language: "plain text".to_string(),
            technical: TechnicalHeuristics::default(),
        }
    }
}

impl ConversionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the conversion cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_nesting_depth == 0 {
            return Err(Sn2nError::Config(
                "max_nesting_depth must be at least 1".to_string(),
            ));
        }
        if self.max_children_per_request == 0 {
            return Err(Sn2nError::Config(
                "max_children_per_request must be at least 1".to_string(),
            ));
        }
        if self.max_rich_text_chars == 0 {
            return Err(Sn2nError::Config(
                "max_rich_text_chars must be at least 1".to_string(),
            ));
        }
        if let Some(base) = &self.base_url {
            url::Url::parse(base)
                .map_err(|e| Sn2nError::Config(format!("Invalid base_url '{base}': {e}")))?;
        }
        Ok(())
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    #[must_use]
    pub fn with_main_content_extraction(mut self, enabled: bool) -> Self {
        self.extract_main_content = enabled;
        self
    }

    #[must_use]
    pub fn with_upload_hosts(mut self, hosts: Vec<String>) -> Self {
        self.upload_hosts = hosts;
        self
    }

    #[must_use]
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    #[must_use]
    pub fn with_max_children_per_request(mut self, max: usize) -> Self {
        self.max_children_per_request = max;
        self
    }
}

/// Options for marker orchestration and publishing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Emit per-block search traces at `debug` level
    pub verbose: bool,

    /// Maximum children sent in one append call
    pub max_children_per_request: usize,

    /// Blocks inspected per anchor search before falling back to the root
    pub max_search_nodes: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            max_children_per_request: DEFAULT_MAX_CHILDREN_PER_REQUEST,
            max_search_nodes: DEFAULT_MAX_SEARCH_NODES,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.max_children_per_request == 0 {
            return Err(Sn2nError::Config(
                "max_children_per_request must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_target_limits() {
        let config = ConversionConfig::default();
        assert_eq!(config.max_nesting_depth, 2);
        assert_eq!(config.max_children_per_request, 100);
        assert_eq!(config.max_rich_text_chars, 2000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_fills_missing_fields() -> Result<()> {
        let config = ConversionConfig::from_json_str(r#"{"verbose": true}"#)?;
        assert!(config.verbose);
        assert!(config.extract_main_content);
        Ok(())
    }

    #[test]
    fn rejects_zero_depth() {
        let err = ConversionConfig::from_json_str(r#"{"max_nesting_depth": 0}"#);
        assert!(matches!(err, Err(Sn2nError::Config(_))));
    }

    #[test]
    fn rejects_bad_base_url() {
        let config = ConversionConfig::default().with_base_url("not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn orchestrator_json() -> Result<()> {
        let config = OrchestratorConfig::from_json_str(r#"{"max_search_nodes": 10}"#)?;
        assert_eq!(config.max_search_nodes, 10);
        assert_eq!(config.max_children_per_request, 100);
        Ok(())
    }
}
