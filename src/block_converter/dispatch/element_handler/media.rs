use scraper::ElementRef;
use url::Url;

use super::super::node_util::parent_tag;
use super::super::{ClassifyContext, Element};
use super::Handlers;
use crate::block_converter::html_preprocessing::serialize_children_excluding;
use crate::blocks::{Block, BlockKind, ImageSource};

/// `img` → image block. This is the only path that emits images; inline
/// text extraction never does.
pub(super) fn img_handler(
    _handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    let attrs = element.node.value();
    let src = attrs.attr("src").or_else(|| attrs.attr("data-src"));
    Some(
        qualify_image(src, ctx)
            .map(|source| Block::image(source, Vec::new()))
            .into_iter()
            .collect(),
    )
}

/// `figure` → its blocks, with the `figcaption` text as the caption of the
/// first image.
pub(super) fn figure_handler(
    handlers: &dyn Handlers,
    element: Element<'_>,
    ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    let caption = element
        .node
        .children()
        .filter_map(ElementRef::wrap)
        .find(|child| child.value().name() == "figcaption")
        .map(|figcaption| {
            let mut html = String::new();
            serialize_children_excluding(
                &figcaption,
                &|el: &ElementRef<'_>| ctx.is_skipped(el),
                &mut html,
            );
            ctx.runs_from_html(&html)
        })
        .unwrap_or_default();

    let mut blocks = handlers.walk_children(element.node, ctx);
    if caption.is_empty() {
        return Some(blocks);
    }

    let image = blocks
        .iter()
        .position(|block| matches!(block.kind, BlockKind::Image { .. }));
    match image {
        Some(idx) => {
            if let BlockKind::Image { caption: slot, .. } = &mut blocks[idx].kind {
                *slot = caption;
            }
        }
        None => blocks.push(Block::paragraph(caption)),
    }
    Some(blocks)
}

/// `figcaption` inside a `figure` is consumed by [`figure_handler`].
pub(super) fn figcaption_handler(
    _handlers: &dyn Handlers,
    element: Element<'_>,
    _ctx: &mut ClassifyContext<'_>,
) -> Option<Vec<Block>> {
    (parent_tag(&element.node) == Some("figure")).then(Vec::new)
}

/// Decide how an image source is carried. Source-site images are uploaded,
/// third-party images are linked, unrepresentable sources are skipped.
fn qualify_image(src: Option<&str>, ctx: &mut ClassifyContext<'_>) -> Option<ImageSource> {
    let Some(src) = src.map(str::trim).filter(|s| !s.is_empty()) else {
        ctx.warn("Image without src skipped");
        return None;
    };

    if src.starts_with("data:") {
        ctx.warn("Inline data: URI image skipped; it cannot be referenced by URL");
        return None;
    }

    let url = match Url::parse(src) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let joined = ctx.rich_text.base_url.as_ref().map(|base| base.join(src));
            match joined {
                Some(Ok(url)) => url,
                _ => {
                    ctx.warn(format!("Relative image URL '{src}' cannot be resolved, skipped"));
                    return None;
                }
            }
        }
        Err(e) => {
            ctx.warn(format!("Invalid image URL '{src}' skipped: {e}"));
            return None;
        }
    };

    if !matches!(url.scheme(), "http" | "https") {
        ctx.warn(format!("Unsupported image URL scheme '{}' skipped", url.scheme()));
        return None;
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    let uploads = ctx.config.upload_hosts.iter().any(|allowed| {
        let allowed = allowed.to_ascii_lowercase();
        host == allowed || host.ends_with(&format!(".{allowed}"))
    });

    let url = url.to_string();
    Some(if uploads {
        ImageSource::PendingUpload { url }
    } else {
        ImageSource::External { url }
    })
}
