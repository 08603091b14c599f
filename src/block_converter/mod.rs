//! HTML → block conversion
//!
//! [`convert`] is pure: it parses the document, scopes it to the main
//! content container, classifies the DOM in document order and finally cuts
//! the block tree to the target format's nesting and fan-out limits.

pub mod deep_nesting;
pub mod dispatch;
pub mod html_preprocessing;
pub mod rich_text;
pub mod table;
pub mod text_normalizer;

use scraper::Html;
use serde::Serialize;

use crate::blocks::{Block, count_blocks};
use crate::config::ConversionConfig;
use crate::error::{Result, Sn2nError};
use deep_nesting::{MarkerMap, enforce_limits};
use dispatch::{ClassifyContext, classify_children};
use html_preprocessing::{MAX_HTML_SIZE, select_body, select_main_content};

/// Output of one conversion.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    /// Blocks to create, in document order
    pub blocks: Vec<Block>,
    /// Subtrees deferred past the nesting or fan-out limits
    pub marker_map: MarkerMap,
    pub warnings: Vec<String>,
}

impl ConversionResult {
    /// Blocks across the tree and the marker map.
    pub fn total_blocks(&self) -> usize {
        count_blocks(&self.blocks) + self.marker_map.total_blocks()
    }
}

/// Convert a documentation page to blocks.
///
/// Fails only when the input exceeds [`MAX_HTML_SIZE`] or the configuration
/// is invalid. Everything else degrades to best-effort output plus warnings.
pub fn convert(html: &str, config: &ConversionConfig) -> Result<ConversionResult> {
    if html.len() > MAX_HTML_SIZE {
        return Err(Sn2nError::InputTooLarge {
            size: html.len(),
            max: MAX_HTML_SIZE,
        });
    }
    config.validate()?;

    let document = Html::parse_document(html);
    let mut ctx = ClassifyContext::new(config);

    if !document.errors.is_empty() {
        ctx.warn(format!(
            "HTML parser recovered from {} error(s)",
            document.errors.len()
        ));
    }

    let container = if config.extract_main_content {
        select_main_content(&document)
    } else {
        select_body(&document)
    };

    let blocks = classify_children(container, &mut ctx);
    let mut warnings = ctx.into_warnings();
    let (blocks, marker_map) = enforce_limits(blocks, config, &mut warnings);

    tracing::debug!(
        blocks = count_blocks(&blocks),
        markers = marker_map.len(),
        warnings = warnings.len(),
        "Converted document"
    );

    Ok(ConversionResult {
        blocks,
        marker_map,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockKind;

    #[test]
    fn rejects_oversized_input() {
        let html = "a".repeat(MAX_HTML_SIZE + 1);
        let err = convert(&html, &ConversionConfig::default());
        assert!(matches!(err, Err(Sn2nError::InputTooLarge { .. })));
    }

    #[test]
    fn empty_document_has_no_blocks() -> Result<()> {
        let result = convert("", &ConversionConfig::default())?;
        assert!(result.blocks.is_empty());
        assert!(result.marker_map.is_empty());
        Ok(())
    }

    #[test]
    fn keeps_document_order() -> Result<()> {
        let result = convert(
            "<h2>Title</h2><p>First</p><pre>code()</pre><p>Last</p>",
            &ConversionConfig::default(),
        )?;
        let types: Vec<_> = result.blocks.iter().map(Block::type_name).collect();
        assert_eq!(types, vec!["heading_2", "paragraph", "code", "paragraph"]);
        Ok(())
    }

    #[test]
    fn main_content_scoping_drops_chrome() -> Result<()> {
        let result = convert(
            r#"<body><nav>Menu</nav><p>outside</p><div class="zDocsTopicPageBody"><p>inside</p></div></body>"#,
            &ConversionConfig::default(),
        )?;
        assert_eq!(result.blocks.len(), 1);
        assert_eq!(result.blocks[0].plain_text(), "inside");
        Ok(())
    }

    #[test]
    fn without_scoping_uses_body() -> Result<()> {
        let config = ConversionConfig::default().with_main_content_extraction(false);
        let result = convert(
            r#"<body><p>outside</p><div class="zDocsTopicPageBody"><p>inside</p></div></body>"#,
            &config,
        )?;
        assert_eq!(result.blocks.len(), 2);
        Ok(())
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = ConversionConfig::default().with_max_nesting_depth(0);
        assert!(matches!(
            convert("<p>x</p>", &config),
            Err(Sn2nError::Config(_))
        ));
    }

    #[test]
    fn divider() -> Result<()> {
        let result = convert("<p>a</p><hr><p>b</p>", &ConversionConfig::default())?;
        assert_eq!(result.blocks[1].kind, BlockKind::Divider);
        Ok(())
    }
}
