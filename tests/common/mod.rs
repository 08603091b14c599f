//! Shared helpers for the sn2n integration tests

use sn2n::blocks::walk_blocks;
use sn2n::{Block, BlockKind, ConversionConfig, ConversionResult, convert};

/// Wraps `body` in a ServiceNow-style topic page with site chrome around it.
#[allow(dead_code)]
pub fn topic_page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>{}</title><script>window.dataLayer = [];</script></head>
<body>
  <nav class="zDocsTopNav"><ul><li><a href="/">Home</a></li></ul></nav>
  <div class="zDocsTopicPageBody">
    <div class="zDocsFilterTableDiv"><input type="text" placeholder="Filter"></div>
    {}
  </div>
  <footer><p>Copyright</p></footer>
</body>
</html>"#,
        html_escape::encode_text(title),
        body
    )
}

/// Converts with the default configuration.
#[allow(dead_code)]
pub fn convert_default(html: &str) -> ConversionResult {
    convert(html, &ConversionConfig::default()).expect("conversion should succeed")
}

/// Deepest block depth in the tree, top level being 0.
#[allow(dead_code)]
pub fn max_depth(blocks: &[Block]) -> usize {
    let mut max = 0;
    walk_blocks(blocks, &mut |_, depth| max = max.max(depth));
    max
}

/// Blocks of one wire type anywhere in the tree.
#[allow(dead_code)]
pub fn blocks_of_type<'a>(blocks: &'a [Block], type_name: &str) -> Vec<&'a Block> {
    let mut found = Vec::new();
    walk_blocks(blocks, &mut |block, _| {
        if block.type_name() == type_name {
            found.push(block);
        }
    });
    found
}

/// Visible text of each block in the tree, in document order.
#[allow(dead_code)]
pub fn all_text(blocks: &[Block]) -> Vec<String> {
    let mut texts = Vec::new();
    walk_blocks(blocks, &mut |block, _| texts.push(block.plain_text()));
    texts
}

/// Ordinals of numbered list items in a sibling list.
#[allow(dead_code)]
pub fn numbers(blocks: &[Block]) -> Vec<u32> {
    blocks
        .iter()
        .filter_map(|block| match block.kind {
            BlockKind::NumberedListItem { number, .. } => Some(number),
            _ => None,
        })
        .collect()
}
