//! # Page-Aware Layout Engine
//!
//! The size negotiation and drawing dispatch over the block tree.
//!
//! Every block answers two calls. `measure` reports the (min, max) size
//! range it can render at for a proposal, without drawing anything, and is
//! idempotent: containers re-measure freely during multi-pass algorithms.
//! `draw` commits the block to a concrete rectangle through the renderer
//! and may return a remainder: the undrawn tail of a page-wrapping
//! container, re-queued by the pagination engine for the next page.
//!
//! Layout never fails. A page-wrapping container nested under an ancestor
//! that cannot re-propose space across a page boundary (frame, clip,
//! overlay, background, padding) renders as an inline error marker naming
//! both constructs, so a malformed document still produces a diagnosable
//! artifact instead of a crash.

pub mod columns;
pub mod grid;
pub mod stack;
pub mod table;
pub mod wrap;

use crate::env::Environment;
use crate::geometry::{BlockSize, Edges, Proposal, Rect, Size};
use crate::model::{resolve, Block, Spacing};
use crate::render::StateChange;
use crate::style::{Axis, Color, HorizontalAlignment};

pub use wrap::{PageOrnament, RenderContext, WrapMode};

/// How a wrap-enabled container participates in the current traversal.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Disposition {
    /// Not page-wrapping: ordinary negotiated layout.
    Inline,
    /// Wrapping is forbidden by the named ancestor construct.
    Forbidden(&'static str),
    /// First wrap container on the page: claims the wrap region and defers
    /// its drawing to the wrap phase.
    Primary,
    /// Inside an active wrap consumption: fills its rectangle and returns
    /// a remainder.
    Secondary,
    /// A primary region already exists on this page: render in place,
    /// overflow clipped.
    Atomic,
}

fn disposition(ctx: &RenderContext<'_>, env: &Environment, wants_wrap: bool) -> Disposition {
    if !wants_wrap {
        Disposition::Inline
    } else if let Some(outer) = env.wrap_barrier {
        Disposition::Forbidden(outer)
    } else if ctx.in_wrap {
        Disposition::Secondary
    } else if ctx.deferred.is_some() {
        Disposition::Atomic
    } else {
        Disposition::Primary
    }
}

/// "All available space": what a primary wrap region reports so ancestor
/// layout treats it as filling whatever remains. Unbounded proposals stay
/// unbounded, keeping the region greedy in stack negotiation.
fn fill_size(proposal: Proposal) -> BlockSize {
    BlockSize::new(Size::ZERO, Size::new(proposal.width, proposal.height))
}

/// The inline error marker substituted for an invalid composition:
/// bordered red text naming the wrapping block and the forbidding ancestor.
fn invalid_wrap_block(inner: &'static str, outer: &'static str) -> Block {
    Block::text(format!(
        "layout error: {inner} cannot wrap across pages inside {outer}"
    ))
    .modified(|e| e.foreground = Color::RED)
    .padding(Edges::uniform(4.0))
    .border(Color::RED, 1.0)
}

// ── Measurement ─────────────────────────────────────────────────

/// Report the achievable size range for `block` under `proposal`. Pure
/// with respect to drawing; identical inputs yield identical output.
pub fn measure(
    block: &Block,
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    proposal: Proposal,
) -> BlockSize {
    match block {
        Block::Empty | Block::PageBreak => BlockSize::ZERO,

        Block::Text(content) => ctx.renderer.measure_text(content, env, proposal),

        Block::PageNumber(format) => {
            let content = (format.0)(ctx.page_index.max(1), ctx.page_count);
            ctx.renderer.measure_text(&content, env, proposal)
        }

        // Shapes are fully flexible: they fill whatever they are offered.
        Block::Shape(_) => BlockSize::new(
            Size::ZERO,
            Size::new(proposal.width, proposal.height),
        ),

        Block::Divider => {
            let thickness = env.stroke.width;
            match env.layout_axis {
                Axis::Vertical => BlockSize::new(
                    Size::new(0.0, thickness),
                    Size::new(Proposal::bounded(proposal.width, 0.0), thickness),
                ),
                Axis::Horizontal => BlockSize::new(
                    Size::new(thickness, 0.0),
                    Size::new(thickness, Proposal::bounded(proposal.height, 0.0)),
                ),
            }
        }

        Block::Spacer { min_length } => {
            let size = match env.layout_axis {
                Axis::Vertical => Size::new(0.0, *min_length),
                Axis::Horizontal => Size::new(*min_length, 0.0),
            };
            BlockSize::fixed(size)
        }

        Block::Image { width, height, .. } => {
            let mut scale: f64 = 1.0;
            let pw = Proposal::bounded(proposal.width, *width);
            let ph = Proposal::bounded(proposal.height, *height);
            if *width > 0.0 {
                scale = scale.min(pw / width);
            }
            if *height > 0.0 {
                scale = scale.min(ph / height);
            }
            let scale = scale.min(1.0).max(0.0);
            BlockSize::fixed(Size::new(width * scale, height * scale))
        }

        Block::VStack {
            children,
            spacing,
            wrap,
            ..
        } => {
            let env2 = env.with_axis(Axis::Vertical);
            match disposition(ctx, env, *wrap) {
                Disposition::Forbidden(outer) => {
                    let marker = invalid_wrap_block(block.kind_name(), outer);
                    measure(&marker, ctx, env, proposal)
                }
                Disposition::Primary => fill_size(proposal),
                Disposition::Secondary | Disposition::Atomic => {
                    stack::natural_stack_size(ctx, &env2, children, Axis::Vertical, *spacing, proposal)
                }
                Disposition::Inline => {
                    stack::measure_stack(ctx, &env2, children, Axis::Vertical, *spacing, proposal)
                }
            }
        }

        Block::HStack {
            children, spacing, ..
        } => {
            let env2 = env.with_axis(Axis::Horizontal);
            stack::measure_stack(ctx, &env2, children, Axis::Horizontal, *spacing, proposal)
        }

        Block::ZStack { children, .. } => {
            let env2 = env.with_wrap_barrier("overlay");
            let flat = crate::model::flatten(children, &env2);
            let mut min = Size::ZERO;
            let mut max = Size::ZERO;
            for child in &flat {
                let m = measure(child, ctx, &env2, proposal);
                min.width = min.width.max(m.min.width);
                min.height = min.height.max(m.min.height);
                max.width = max.width.max(m.max.width);
                max.height = max.height.max(m.max.height);
            }
            BlockSize::new(min, max)
        }

        Block::Grid {
            children,
            columns,
            column_spacing,
            row_spacing,
            wrap,
        } => match disposition(ctx, env, *wrap) {
            Disposition::Forbidden(outer) => {
                let marker = invalid_wrap_block(block.kind_name(), outer);
                measure(&marker, ctx, env, proposal)
            }
            Disposition::Primary => fill_size(proposal),
            Disposition::Secondary | Disposition::Atomic => grid::measure_grid(
                ctx,
                env,
                children,
                *columns,
                *column_spacing,
                *row_spacing,
                proposal,
                false,
            ),
            Disposition::Inline => grid::measure_grid(
                ctx,
                env,
                children,
                *columns,
                *column_spacing,
                *row_spacing,
                proposal,
                true,
            ),
        },

        Block::Columns {
            children,
            count,
            spacing,
            wrap,
        } => match disposition(ctx, env, *wrap) {
            Disposition::Forbidden(outer) => {
                let marker = invalid_wrap_block(block.kind_name(), outer);
                measure(&marker, ctx, env, proposal)
            }
            Disposition::Primary => fill_size(proposal),
            other => {
                let flat = crate::model::flatten(children, env);
                let width = Proposal::bounded(proposal.width, 0.0);
                let col_w = columns::column_width(width, *count, *spacing);
                let heights = columns::natural_heights(ctx, env, &flat, col_w);
                let total: f64 = heights.iter().sum();
                let mut height = columns::balanced_height(&heights, *count, total);
                if other == Disposition::Inline {
                    height = height.min(Proposal::bounded(proposal.height, height));
                }
                BlockSize::fixed(Size::new(width, height))
            }
        },

        Block::Table(def) => {
            let env2 = table::table_env(def, env);
            match disposition(ctx, env, true) {
                Disposition::Forbidden(outer) => {
                    let marker = invalid_wrap_block(block.kind_name(), outer);
                    measure(&marker, ctx, env, proposal)
                }
                Disposition::Primary => fill_size(proposal),
                _ => {
                    let items = table::inline_items(def);
                    let width = Proposal::bounded(proposal.width, 0.0);
                    let height = wrap::natural_sequence_height(
                        ctx,
                        &env2,
                        &items,
                        width,
                        table::ROW_SPACING,
                    );
                    BlockSize::new(Size::ZERO, Size::new(width, height))
                }
            }
        }

        Block::Group(children) => {
            let env2 = env.with_axis(Axis::Vertical);
            stack::measure_stack(
                ctx,
                &env2,
                children,
                Axis::Vertical,
                Spacing::Fixed(0.0),
                proposal,
            )
        }

        Block::Page { content, .. } => measure(content, ctx, env, proposal),

        Block::Padding { insets, child } => {
            let env2 = env.with_wrap_barrier("padding");
            let inner = Proposal::new(
                (proposal.width - insets.horizontal()).max(0.0),
                (proposal.height - insets.vertical()).max(0.0),
            );
            let c = measure(child, ctx, &env2, inner);
            BlockSize::new(
                Size::new(
                    c.min.width + insets.horizontal(),
                    c.min.height + insets.vertical(),
                ),
                Size::new(
                    c.max.width + insets.horizontal(),
                    c.max.height + insets.vertical(),
                ),
            )
        }

        Block::Frame {
            width,
            height,
            child,
            ..
        } => {
            let env2 = env.with_wrap_barrier("frame");
            let inner = Proposal::new(
                width.unwrap_or(proposal.width),
                height.unwrap_or(proposal.height),
            );
            let c = measure(child, ctx, &env2, inner);
            let (w_min, w_max) = match width {
                Some(w) => (*w, *w),
                None => (c.min.width, c.max.width),
            };
            let (h_min, h_max) = match height {
                Some(h) => (*h, *h),
                None => (c.min.height, c.max.height),
            };
            BlockSize::new(Size::new(w_min, h_min), Size::new(w_max, h_max))
        }

        Block::Background { child, .. } => {
            let env2 = env.with_wrap_barrier("background");
            measure(child, ctx, &env2, proposal)
        }

        Block::Overlay { child, .. } => {
            let env2 = env.with_wrap_barrier("overlay");
            measure(child, ctx, &env2, proposal)
        }

        Block::Clipped { child } => {
            let env2 = env.with_wrap_barrier("clip");
            measure(child, ctx, &env2, proposal)
        }

        Block::Border { child, .. }
        | Block::Offset { child, .. }
        | Block::Opacity { child, .. }
        | Block::Rotation { child, .. }
        | Block::Proportional { child, .. } => measure(child, ctx, env, proposal),

        Block::Modified { apply, child } => {
            let apply = apply.clone();
            let env2 = env.with(move |e| apply(e));
            measure(child, ctx, &env2, proposal)
        }

        Block::Composite(_) => {
            let body = resolve(block.clone(), env);
            measure(&body, ctx, env, proposal)
        }
    }
}

// ── Drawing ─────────────────────────────────────────────────────

/// Draw `block` into `rect`. Returns the remainder: content held back by a
/// page-wrapping container in secondary position, to be re-queued by the
/// caller for the next page.
pub fn draw(
    block: &Block,
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    rect: Rect,
) -> Option<Block> {
    match block {
        Block::Empty | Block::PageBreak | Block::Spacer { .. } => None,

        Block::Text(content) => {
            ctx.renderer.draw_text(content, env, rect);
            None
        }

        Block::PageNumber(format) => {
            let content = (format.0)(ctx.page_index.max(1), ctx.page_count);
            ctx.renderer.draw_text(&content, env, rect);
            None
        }

        Block::Shape(kind) => {
            ctx.renderer.draw_shape(*kind, env, rect);
            None
        }

        Block::Divider => {
            let (from, to) = match env.layout_axis {
                Axis::Vertical => (
                    crate::geometry::Point::new(rect.x, rect.center().y),
                    crate::geometry::Point::new(rect.right(), rect.center().y),
                ),
                Axis::Horizontal => (
                    crate::geometry::Point::new(rect.center().x, rect.y),
                    crate::geometry::Point::new(rect.center().x, rect.bottom()),
                ),
            };
            ctx.renderer.draw_line(env, from, to);
            None
        }

        Block::Image { name, .. } => {
            ctx.renderer.draw_image(name, env, rect);
            None
        }

        Block::VStack {
            children,
            spacing,
            alignment,
            wrap,
        } => {
            let env2 = env.with_axis(Axis::Vertical);
            match disposition(ctx, env, *wrap) {
                Disposition::Forbidden(outer) => {
                    let marker = invalid_wrap_block(block.kind_name(), outer);
                    draw(&marker, ctx, env, rect);
                    None
                }
                Disposition::Inline => {
                    stack::draw_stack(
                        ctx,
                        &env2,
                        children,
                        Axis::Vertical,
                        *spacing,
                        alignment.fraction(),
                        rect,
                    );
                    None
                }
                Disposition::Primary => {
                    let children = children.clone();
                    let spacing = spacing.minimum();
                    let alignment = *alignment;
                    ctx.wrap_region = Some(rect);
                    ctx.deferred = Some(Box::new(move |ctx| {
                        let rebuild = move |rest: Vec<Block>| Block::VStack {
                            children: rest,
                            spacing: Spacing::Fixed(spacing),
                            alignment,
                            wrap: true,
                        };
                        wrap::consume(
                            ctx,
                            &env2,
                            children,
                            rect,
                            spacing,
                            alignment,
                            WrapMode::Primary,
                            &rebuild,
                        );
                    }));
                    None
                }
                Disposition::Secondary | Disposition::Atomic => {
                    let mode = if ctx.in_wrap {
                        WrapMode::Secondary
                    } else {
                        WrapMode::Atomic
                    };
                    let spacing_v = spacing.minimum();
                    let align = *alignment;
                    let rebuild = move |rest: Vec<Block>| Block::VStack {
                        children: rest,
                        spacing: Spacing::Fixed(spacing_v),
                        alignment: align,
                        wrap: true,
                    };
                    wrap::consume(
                        ctx,
                        &env2,
                        children.clone(),
                        rect,
                        spacing_v,
                        align,
                        mode,
                        &rebuild,
                    )
                }
            }
        }

        Block::HStack {
            children,
            spacing,
            alignment,
        } => {
            let env2 = env.with_axis(Axis::Horizontal);
            stack::draw_stack(
                ctx,
                &env2,
                children,
                Axis::Horizontal,
                *spacing,
                alignment.fraction(),
                rect,
            );
            None
        }

        Block::ZStack {
            children,
            alignment,
        } => {
            let env2 = env.with_wrap_barrier("overlay");
            let flat = crate::model::flatten(children, &env2);
            for child in &flat {
                let m = measure(child, ctx, &env2, Proposal::from_size(rect.size()));
                let w = m.max.width.min(rect.width);
                let h = m.max.height.min(rect.height);
                let x = rect.x + (rect.width - w) * alignment.horizontal.fraction();
                let y = rect.y + (rect.height - h) * alignment.vertical.fraction();
                draw(child, ctx, &env2, Rect::new(x, y, w, h));
            }
            None
        }

        Block::Grid {
            children,
            columns,
            column_spacing,
            row_spacing,
            wrap,
        } => match disposition(ctx, env, *wrap) {
            Disposition::Forbidden(outer) => {
                let marker = invalid_wrap_block(block.kind_name(), outer);
                draw(&marker, ctx, env, rect);
                None
            }
            Disposition::Inline => {
                grid::draw_grid(
                    ctx,
                    env,
                    children,
                    *columns,
                    *column_spacing,
                    *row_spacing,
                    rect,
                );
                None
            }
            Disposition::Primary => {
                let rows = grid::row_blocks(children, *columns, *column_spacing, rect.width, env);
                let row_spacing = *row_spacing;
                let env2 = env.clone();
                ctx.wrap_region = Some(rect);
                ctx.deferred = Some(Box::new(move |ctx| {
                    wrap::consume(
                        ctx,
                        &env2,
                        rows,
                        rect,
                        row_spacing,
                        HorizontalAlignment::Leading,
                        WrapMode::Primary,
                        &Block::group,
                    );
                }));
                None
            }
            Disposition::Secondary | Disposition::Atomic => {
                let mode = if ctx.in_wrap {
                    WrapMode::Secondary
                } else {
                    WrapMode::Atomic
                };
                let rows = grid::row_blocks(children, *columns, *column_spacing, rect.width, env);
                wrap::consume(
                    ctx,
                    env,
                    rows,
                    rect,
                    *row_spacing,
                    HorizontalAlignment::Leading,
                    mode,
                    &Block::group,
                )
            }
        },

        Block::Columns {
            children,
            count,
            spacing,
            wrap,
        } => match disposition(ctx, env, *wrap) {
            Disposition::Forbidden(outer) => {
                let marker = invalid_wrap_block(block.kind_name(), outer);
                draw(&marker, ctx, env, rect);
                None
            }
            Disposition::Inline | Disposition::Atomic => {
                columns::flow(ctx, env, children, *count, *spacing, *wrap, rect, true)
            }
            Disposition::Secondary => {
                columns::flow(ctx, env, children, *count, *spacing, *wrap, rect, false)
            }
            Disposition::Primary => {
                let children = children.clone();
                let count = *count;
                let spacing = *spacing;
                let env2 = env.clone();
                ctx.wrap_region = Some(rect);
                ctx.deferred = Some(Box::new(move |ctx| {
                    let was_in_wrap = ctx.in_wrap;
                    ctx.in_wrap = true;
                    let (mut top, mut usable) = ctx.open_wrap_page(&env2, rect);
                    let mut pending = children;
                    loop {
                        let page_rect =
                            Rect::new(rect.x, rect.y + top, rect.width, (usable - top).max(0.0));
                        match columns::flow(
                            ctx, &env2, &pending, count, spacing, true, page_rect, false,
                        ) {
                            Some(Block::Columns { children: rest, .. }) => {
                                pending = rest;
                                let (t, u) = ctx.advance_wrap_page(&env2, rect);
                                top = t;
                                usable = u;
                            }
                            _ => break,
                        }
                    }
                    ctx.close_wrap_page(&env2, rect);
                    ctx.in_wrap = was_in_wrap;
                }));
                None
            }
        },

        Block::Table(def) => {
            let env2 = table::table_env(def, env);
            match disposition(ctx, env, true) {
                Disposition::Forbidden(outer) => {
                    let marker = invalid_wrap_block(block.kind_name(), outer);
                    draw(&marker, ctx, env, rect);
                    None
                }
                Disposition::Primary => {
                    let items = table::row_items(def);
                    let ornament = table::ornament(def);
                    ctx.wrap_region = Some(rect);
                    ctx.deferred = Some(Box::new(move |ctx| {
                        let pushed = ornament.is_some();
                        if let Some(ornament) = ornament {
                            ctx.ornaments.push(ornament);
                        }
                        wrap::consume(
                            ctx,
                            &env2,
                            items,
                            rect,
                            table::ROW_SPACING,
                            HorizontalAlignment::Leading,
                            WrapMode::Primary,
                            &Block::group,
                        );
                        if pushed {
                            ctx.ornaments.pop();
                        }
                    }));
                    None
                }
                _ => {
                    let mode = if ctx.in_wrap {
                        WrapMode::Secondary
                    } else {
                        WrapMode::Atomic
                    };
                    wrap::consume(
                        ctx,
                        &env2,
                        table::inline_items(def),
                        rect,
                        table::ROW_SPACING,
                        HorizontalAlignment::Leading,
                        mode,
                        &Block::group,
                    )
                }
            }
        }

        Block::Group(children) => {
            let env2 = env.with_axis(Axis::Vertical);
            stack::draw_stack(
                ctx,
                &env2,
                children,
                Axis::Vertical,
                Spacing::Fixed(0.0),
                0.0,
                rect,
            );
            None
        }

        Block::Page { content, .. } => draw(content, ctx, env, rect),

        Block::Padding { insets, child } => {
            let env2 = env.with_wrap_barrier("padding");
            draw(child, ctx, &env2, rect.inset(insets));
            None
        }

        Block::Frame {
            alignment, child, ..
        } => {
            let env2 = env.with_wrap_barrier("frame");
            let m = measure(child, ctx, &env2, Proposal::from_size(rect.size()));
            let w = m.max.width.min(rect.width);
            let h = m.max.height.min(rect.height);
            let x = rect.x + (rect.width - w) * alignment.horizontal.fraction();
            let y = rect.y + (rect.height - h) * alignment.vertical.fraction();
            draw(child, ctx, &env2, Rect::new(x, y, w, h));
            None
        }

        Block::Background { background, child } => {
            let env2 = env.with_wrap_barrier("background");
            draw(background, ctx, &env2, rect);
            draw(child, ctx, &env2, rect);
            None
        }

        Block::Overlay { overlay, child } => {
            let env2 = env.with_wrap_barrier("overlay");
            draw(child, ctx, &env2, rect);
            draw(overlay, ctx, &env2, rect);
            None
        }

        Block::Border {
            color,
            width,
            child,
        } => {
            let rest = draw(child, ctx, env, rect);
            ctx.renderer.draw_border(*color, *width, rect);
            rest.map(|r| Block::Border {
                color: *color,
                width: *width,
                child: Box::new(r),
            })
        }

        Block::Offset { dx, dy, child } => {
            ctx.renderer.push_state(StateChange::translate(*dx, *dy));
            let rest = draw(child, ctx, env, rect);
            ctx.renderer.pop_state();
            rest.map(|r| Block::Offset {
                dx: *dx,
                dy: *dy,
                child: Box::new(r),
            })
        }

        Block::Opacity { value, child } => {
            ctx.renderer.push_state(StateChange::opacity(*value));
            let rest = draw(child, ctx, env, rect);
            ctx.renderer.pop_state();
            rest.map(|r| Block::Opacity {
                value: *value,
                child: Box::new(r),
            })
        }

        Block::Rotation { degrees, child } => {
            ctx.renderer
                .push_state(StateChange::rotate(*degrees, rect.center()));
            let rest = draw(child, ctx, env, rect);
            ctx.renderer.pop_state();
            rest.map(|r| Block::Rotation {
                degrees: *degrees,
                child: Box::new(r),
            })
        }

        Block::Clipped { child } => {
            let env2 = env.with_wrap_barrier("clip");
            ctx.renderer.push_state(StateChange::clip(rect));
            draw(child, ctx, &env2, rect);
            ctx.renderer.pop_state();
            None
        }

        Block::Proportional { factor, child } => {
            let rest = draw(child, ctx, env, rect);
            rest.map(|r| Block::Proportional {
                factor: *factor,
                child: Box::new(r),
            })
        }

        Block::Modified { apply, child } => {
            let change = apply.clone();
            let env2 = env.with({
                let change = change.clone();
                move |e| change(e)
            });
            let rest = draw(child, ctx, &env2, rect);
            rest.map(|r| Block::Modified {
                apply: change,
                child: Box::new(r),
            })
        }

        Block::Composite(_) => {
            let body = resolve(block.clone(), env);
            draw(&body, ctx, env, rect)
        }
    }
}
