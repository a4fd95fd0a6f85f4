//! # Quire
//!
//! A page-native block layout engine.
//!
//! Quire lays a tree of content blocks into a sequence of fixed-size
//! pages. Parents and children negotiate size through a proposal protocol,
//! configuration cascades down the tree through an immutable environment,
//! and content that cannot fit one page is measured once and re-rendered
//! split across page and column boundaries: repeated running headers,
//! page counters, balanced column heights.
//!
//! ## Architecture
//!
//! ```text
//! Block tree (API)
//!       |
//!   [model]    - blocks, resolution, transparent group flattening
//!       |
//!   [env]      - cascading configuration, functional overrides
//!       |
//!   [layout]   - size negotiation, stacks/grids/columns/tables,
//!                the pagination engine and its wrap phases
//!       |
//!   [render]   - the Renderer seam; recorded draw ops and bytes
//! ```
//!
//! Drawing is delegated to a [`render::Renderer`] implementation; the
//! engine itself never touches glyphs, paths or file formats. The built-in
//! [`render::RecordingRenderer`] records draw ops with deterministic text
//! metrics and serializes them to JSON bytes.

pub mod env;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod model;
pub mod render;
pub mod style;

use env::{Environment, RenderMode};
use error::LayoutError;
use geometry::{Edges, Proposal, Rect, Size};
use layout::{draw, measure, RenderContext};
use model::{flatten, resolve, Block, PageGeometry, PageSize};
use render::{RecordingRenderer, RenderLayer, Renderer};

/// Summary of a completed render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Total pages emitted.
    pub pages: usize,
}

/// Render a block tree through the given renderer.
///
/// The document is traversed twice: a measured pass that performs full
/// pagination with every draw op suppressed (establishing the page count),
/// then a committed pass that emits. If the root resolves to nothing but
/// page blocks, each renders as its own page sequence; otherwise the whole
/// root is wrapped in one implicit page using `geometry`.
///
/// The renderer's bytes are retrieved separately via
/// [`render::Renderer::finish`]; see [`render_to_bytes`] for the one-call
/// form.
pub fn render(
    geometry: &PageGeometry,
    root: &Block,
    renderer: &mut dyn Renderer,
) -> Result<RenderStats, LayoutError> {
    validate(geometry)?;

    renderer.set_layer(RenderLayer::Measured);
    let pages = run_pass(geometry, root, renderer, RenderLayer::Measured, None);

    renderer.set_layer(RenderLayer::Committed);
    let pages = run_pass(geometry, root, renderer, RenderLayer::Committed, Some(pages));

    Ok(RenderStats { pages })
}

/// Render through the built-in [`RecordingRenderer`] and return the
/// serialized document bytes.
pub fn render_to_bytes(geometry: &PageGeometry, root: &Block) -> Result<Vec<u8>, LayoutError> {
    let mut renderer = RecordingRenderer::new();
    render(geometry, root, &mut renderer)?;
    renderer.finish()
}

fn validate(geometry: &PageGeometry) -> Result<(), LayoutError> {
    let (w, h) = geometry.size.dimensions();
    if w <= 0.0 || h <= 0.0 {
        return Err(LayoutError::InvalidGeometry(format!(
            "page size must be positive, got {w} x {h}"
        )));
    }
    if geometry.margin.horizontal() >= w || geometry.margin.vertical() >= h {
        return Err(LayoutError::InvalidGeometry(format!(
            "margins leave no content area on a {w} x {h} page"
        )));
    }
    Ok(())
}

/// One full document traversal at the given layer.
fn run_pass(
    geometry: &PageGeometry,
    root: &Block,
    renderer: &mut dyn Renderer,
    layer: RenderLayer,
    page_count: Option<usize>,
) -> usize {
    let env = Environment::default().with(|e| {
        e.render_mode = match layer {
            RenderLayer::Measured => RenderMode::Measured,
            RenderLayer::Committed => RenderMode::Committed,
        };
    });

    let pages = page_sequence(geometry, root, &env);
    let mut ctx = RenderContext::new(renderer, layer, page_count);
    for (size, margin, content) in pages {
        render_page(&mut ctx, &env, size, margin, content);
    }
    ctx.pages_emitted
}

/// Split the root into page-declaring blocks, or wrap it in one implicit
/// page.
fn page_sequence(
    geometry: &PageGeometry,
    root: &Block,
    env: &Environment,
) -> Vec<(PageSize, Edges, Block)> {
    let unwrap_page = |block: Block| -> (PageSize, Edges, Block) {
        match block {
            Block::Page {
                size,
                margin,
                content,
            } => (
                size.unwrap_or(geometry.size),
                margin.unwrap_or(geometry.margin),
                *content,
            ),
            other => (geometry.size, geometry.margin, other),
        }
    };

    match resolve(root.clone(), env) {
        page @ Block::Page { .. } => vec![unwrap_page(page)],
        Block::Group(children) => {
            let flat = flatten(&children, env);
            if flat.is_empty() {
                Vec::new()
            } else if flat.iter().all(|b| matches!(b, Block::Page { .. })) {
                flat.into_iter().map(unwrap_page).collect()
            } else {
                vec![(geometry.size, geometry.margin, Block::Group(flat))]
            }
        }
        other => vec![(geometry.size, geometry.margin, other)],
    }
}

fn render_page(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    size: PageSize,
    margin: Edges,
    content: Block,
) {
    let (w, h) = size.dimensions();
    let page = Size::new(w, h);
    let content_rect = Rect::new(
        margin.left,
        margin.top,
        (w - margin.horizontal()).max(0.0),
        (h - margin.vertical()).max(0.0),
    );
    ctx.begin_page(page, content_rect);
    ctx.deferred = None;

    let proposal = Proposal::from_size(content_rect.size());
    let size = measure(&content, ctx, env, proposal);
    let cw = size.max.width.min(content_rect.width);
    let ch = size.max.height.min(content_rect.height);
    draw(
        &content,
        ctx,
        env,
        Rect::new(content_rect.x, content_rect.y, cw, ch),
    );

    // Wrap phase: the page-wrap region registered during the traversal
    // above now consumes the rest of the document flow, turning pages as
    // needed.
    while let Some(deferred) = ctx.deferred.take() {
        deferred(ctx);
    }
}
