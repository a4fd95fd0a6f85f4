//! # Pagination Context and the Wrap Engine
//!
//! The mutable state threaded through one render pass, and the consumption
//! loop that streams a child sequence across pages.
//!
//! A page-wrapping container encountered during normal drawing does not
//! draw its children. It records its rectangle as the active page-wrap
//! region and registers a deferred callback; after the page's surrounding
//! content has been placed, the callback consumes the child sequence
//! against that rectangle, turning pages as it fills them. Containers met
//! while that consumption is running are in secondary position: they fill
//! the rectangle they are given and hand back a remainder block for the
//! queue instead of turning pages themselves.

use std::collections::VecDeque;
use std::rc::Rc;

use crate::env::Environment;
use crate::geometry::{approx, fits, Proposal, Rect, Size};
use crate::model::{flatten, resolve, Block};
use crate::render::{RenderLayer, Renderer};
use crate::style::HorizontalAlignment;

use super::{draw, measure};

/// Builds a block for a given page index. Used for content repeated at the
/// top or bottom of every page a wrap region touches.
pub type PageBlockBuilder = Rc<dyn Fn(usize) -> Block>;

/// Repeat-on-page content registered while a wrap region is active.
#[derive(Clone, Default)]
pub struct PageOrnament {
    pub header: Option<PageBlockBuilder>,
    pub footer: Option<PageBlockBuilder>,
}

/// The deferred second-pass callback registered by a primary wrap region.
pub type DeferredWrap = Box<dyn FnOnce(&mut RenderContext<'_>)>;

/// How a container participates in pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WrapMode {
    /// Single region; overflow is clipped.
    Atomic,
    /// Owns page turns for the whole document flow.
    Primary,
    /// Fills one rectangle and returns the rest as a remainder.
    Secondary,
}

/// Per-render mutable state. Created once per top-level render call, owned
/// exclusively by it, and discarded when the document has been emitted.
/// Starting a nested render while one is in progress is not supported.
pub struct RenderContext<'r> {
    pub renderer: &'r mut dyn Renderer,
    pub layer: RenderLayer,
    /// 1-based index of the page currently being drawn.
    pub page_index: usize,
    /// Total page count, known on the committed pass.
    pub page_count: Option<usize>,
    pub page_size: Size,
    pub content_rect: Rect,
    /// Consumed vertical extent within the active wrap region.
    pub cursor: f64,
    /// True while a wrap consumption loop is running.
    pub in_wrap: bool,
    /// True when the block being drawn sits at the top of a fresh region,
    /// meaning a page turn cannot give it more room than it already has.
    pub fresh_region: bool,
    pub wrap_region: Option<Rect>,
    pub deferred: Option<DeferredWrap>,
    pub ornaments: Vec<PageOrnament>,
    pub pages_emitted: usize,
}

impl<'r> RenderContext<'r> {
    pub fn new(
        renderer: &'r mut dyn Renderer,
        layer: RenderLayer,
        page_count: Option<usize>,
    ) -> Self {
        RenderContext {
            renderer,
            layer,
            page_index: 0,
            page_count,
            page_size: Size::ZERO,
            content_rect: Rect::new(0.0, 0.0, 0.0, 0.0),
            cursor: 0.0,
            in_wrap: false,
            fresh_region: true,
            wrap_region: None,
            deferred: None,
            ornaments: Vec::new(),
            pages_emitted: 0,
        }
    }

    /// Open a fresh top-level page.
    pub fn begin_page(&mut self, size: Size, content_rect: Rect) {
        self.renderer.start_page(size);
        self.page_index += 1;
        self.pages_emitted += 1;
        self.page_size = size;
        self.content_rect = content_rect;
        self.cursor = 0.0;
        self.wrap_region = None;
    }

    /// Draw the registered page-start ornaments at the top of `region` and
    /// measure the page-end ones. Returns `(content_top, usable_height)`.
    pub(crate) fn open_wrap_page(&mut self, env: &Environment, region: Rect) -> (f64, f64) {
        let ornaments = self.ornaments.clone();
        let mut top = 0.0;
        for ornament in &ornaments {
            if let Some(build) = &ornament.header {
                let block = build(self.page_index);
                let size = measure(
                    &block,
                    self,
                    env,
                    Proposal::new(region.width, f64::INFINITY),
                );
                let h = size.max.height;
                draw(
                    &block,
                    self,
                    env,
                    Rect::new(region.x, region.y + top, region.width, h),
                );
                top += h;
            }
        }
        let mut footer_height = 0.0;
        for ornament in &ornaments {
            if let Some(build) = &ornament.footer {
                let block = build(self.page_index);
                footer_height += measure(
                    &block,
                    self,
                    env,
                    Proposal::new(region.width, f64::INFINITY),
                )
                .max
                .height;
            }
        }
        (top, (region.height - footer_height).max(top))
    }

    /// Draw the page-end ornaments at the bottom of `region`.
    pub(crate) fn close_wrap_page(&mut self, env: &Environment, region: Rect) {
        let ornaments = self.ornaments.clone();
        let mut y = region.bottom();
        for ornament in ornaments.iter().rev() {
            if let Some(build) = &ornament.footer {
                let block = build(self.page_index);
                let h = measure(
                    &block,
                    self,
                    env,
                    Proposal::new(region.width, f64::INFINITY),
                )
                .max
                .height;
                y -= h;
                draw(
                    &block,
                    self,
                    env,
                    Rect::new(region.x, y, region.width, h),
                );
            }
        }
    }

    /// Finish the current page of a wrap region and open the next one,
    /// re-invoking the repeat-on-page ornaments.
    pub(crate) fn advance_wrap_page(&mut self, env: &Environment, region: Rect) -> (f64, f64) {
        self.close_wrap_page(env, region);
        self.renderer.start_page(self.page_size);
        self.page_index += 1;
        self.pages_emitted += 1;
        self.cursor = 0.0;
        self.open_wrap_page(env, region)
    }
}

/// Drop spacers that would open a fresh page. They are blank by definition,
/// so carrying them over a page turn only wastes space.
fn skip_leading_spacers(queue: &mut VecDeque<Block>, env: &Environment) {
    while queue.front().is_some_and(|b| b.is_spacer(env)) {
        queue.pop_front();
    }
}

/// Stream `items` into `region`, top to bottom, turning pages in
/// [`WrapMode::Primary`] and returning a remainder in
/// [`WrapMode::Secondary`]. `rebuild` reconstitutes the remainder container
/// from leftover items.
pub fn consume(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    items: Vec<Block>,
    region: Rect,
    spacing: f64,
    alignment: HorizontalAlignment,
    mode: WrapMode,
    rebuild: &dyn Fn(Vec<Block>) -> Block,
) -> Option<Block> {
    let mut queue: VecDeque<Block> = flatten(&items, env).into();
    let was_in_wrap = ctx.in_wrap;
    let parent_fresh = if mode == WrapMode::Primary {
        true
    } else {
        ctx.fresh_region
    };
    ctx.in_wrap = true;

    let (mut top, mut usable) = if mode == WrapMode::Primary {
        ctx.open_wrap_page(env, region)
    } else {
        (0.0, region.height)
    };
    let mut cursor = top;

    let remainder = loop {
        let Some(next) = queue.pop_front() else {
            break None;
        };
        let block = resolve(next, env);
        if let Block::Group(inner) = block {
            for b in flatten(&inner, env).into_iter().rev() {
                queue.push_front(b);
            }
            continue;
        }
        if matches!(block, Block::PageBreak) {
            match mode {
                WrapMode::Primary => {
                    let (t, u) = ctx.advance_wrap_page(env, region);
                    top = t;
                    usable = u;
                    cursor = top;
                    skip_leading_spacers(&mut queue, env);
                }
                WrapMode::Secondary => break Some(remainder_of(queue, env, rebuild)),
                WrapMode::Atomic => break None,
            }
            continue;
        }

        let remaining = (usable - cursor).max(0.0);
        ctx.fresh_region = parent_fresh && approx(cursor, top);
        let size = measure(&block, ctx, env, Proposal::new(region.width, remaining));
        let item_height = size.max.height;

        if fits(item_height, remaining) {
            let width = size.max.width.min(region.width);
            let x = region.x + (region.width - width) * alignment.fraction();
            let rest = draw(
                &block,
                ctx,
                env,
                Rect::new(x, region.y + cursor, width, item_height),
            );
            cursor += item_height + spacing;
            if mode == WrapMode::Primary {
                ctx.cursor = cursor;
            }
            if let Some(rest) = rest {
                // The child reported a fit but still held content back.
                // Treat the page as full and re-queue the tail.
                queue.push_front(rest);
                match mode {
                    WrapMode::Primary => {
                        let (t, u) = ctx.advance_wrap_page(env, region);
                        top = t;
                        usable = u;
                        cursor = top;
                        skip_leading_spacers(&mut queue, env);
                    }
                    WrapMode::Secondary => break Some(remainder_of(queue, env, rebuild)),
                    WrapMode::Atomic => break None,
                }
            }
            continue;
        }

        // Splittable child: fill what is left of this page and re-queue the
        // undrawn tail as the next item.
        if block.wants_page_wrap(env) && env.allow_page_wrap && remaining > 0.0 {
            let rect = Rect::new(region.x, region.y + cursor, region.width, remaining);
            if let Some(rest) = draw(&block, ctx, env, rect) {
                queue.push_front(rest);
            }
            match mode {
                WrapMode::Primary => {
                    let (t, u) = ctx.advance_wrap_page(env, region);
                    top = t;
                    usable = u;
                    cursor = top;
                    skip_leading_spacers(&mut queue, env);
                }
                WrapMode::Secondary => break Some(remainder_of(queue, env, rebuild)),
                WrapMode::Atomic => break None,
            }
            continue;
        }

        if !approx(cursor, top) {
            // Mid-page: retry the same item on a fresh page.
            queue.push_front(block);
            match mode {
                WrapMode::Primary => {
                    let (t, u) = ctx.advance_wrap_page(env, region);
                    top = t;
                    usable = u;
                    cursor = top;
                    skip_leading_spacers(&mut queue, env);
                }
                WrapMode::Secondary => break Some(remainder_of(queue, env, rebuild)),
                WrapMode::Atomic => break None,
            }
            continue;
        }

        // Top of a fresh region and still too tall. In secondary position a
        // page turn may yet give the item more room; otherwise draw it and
        // let the page clip the overflow.
        if mode == WrapMode::Secondary && !parent_fresh {
            queue.push_front(block);
            break Some(remainder_of(queue, env, rebuild));
        }
        let width = size.max.width.min(region.width);
        let x = region.x + (region.width - width) * alignment.fraction();
        draw(
            &block,
            ctx,
            env,
            Rect::new(x, region.y + cursor, width, item_height),
        );
        cursor = usable;
        if mode == WrapMode::Primary {
            ctx.cursor = cursor;
        }
    };

    if mode == WrapMode::Primary {
        ctx.close_wrap_page(env, region);
    }
    ctx.in_wrap = was_in_wrap;
    ctx.fresh_region = parent_fresh;
    remainder
}

/// Build the remainder block for a secondary region, dropping spacers that
/// would otherwise lead the next page.
fn remainder_of(
    mut queue: VecDeque<Block>,
    env: &Environment,
    rebuild: &dyn Fn(Vec<Block>) -> Block,
) -> Block {
    skip_leading_spacers(&mut queue, env);
    rebuild(queue.into_iter().collect())
}

/// Natural stacked height of a prebuilt item sequence at `width`. Used by
/// page-wrapping containers to report how much content they still hold.
pub fn natural_sequence_height(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    items: &[Block],
    width: f64,
    spacing: f64,
) -> f64 {
    let flat = flatten(items, env);
    if flat.is_empty() {
        return 0.0;
    }
    let mut total = spacing * (flat.len() - 1) as f64;
    for item in &flat {
        total += measure(item, ctx, env, Proposal::new(width, f64::INFINITY))
            .max
            .height;
    }
    total
}
