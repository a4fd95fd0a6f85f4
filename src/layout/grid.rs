//! # Fixed-Column Grid
//!
//! A grid with a fixed column count: every child is measured at the shared
//! column width, children chunk into rows of `columns`, each row is as tall
//! as its tallest child, and rows stack with row spacing. When the grid is
//! page-wrapping, whole rows are the pagination unit.

use crate::env::Environment;
use crate::geometry::{BlockSize, Proposal, Rect, Size};
use crate::model::{flatten, Block, Spacing};
use crate::style::VerticalAlignment;

use super::wrap::RenderContext;
use super::{draw, measure};

/// Shared column width for a grid of `columns` in `available` space.
pub fn column_width(available: f64, columns: usize, spacing: f64) -> f64 {
    let columns = columns.max(1);
    ((available - spacing * (columns - 1) as f64) / columns as f64).max(0.0)
}

/// Row-major chunks of child indices.
fn rows(count: usize, columns: usize) -> impl Iterator<Item = std::ops::Range<usize>> {
    let columns = columns.max(1);
    (0..count.div_ceil(columns)).map(move |r| {
        let start = r * columns;
        start..(start + columns).min(count)
    })
}

/// Measure the grid as a rigid block: full proposal width, stacked row
/// heights. `clamp_height` bounds the result to the proposal for inline
/// placement; page-wrapping measurement passes `false` to learn the true
/// remaining extent.
pub fn measure_grid(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    children: &[Block],
    columns: usize,
    column_spacing: f64,
    row_spacing: f64,
    proposal: Proposal,
    clamp_height: bool,
) -> BlockSize {
    let flat = flatten(children, env);
    if flat.is_empty() {
        return BlockSize::ZERO;
    }
    let avail = Proposal::bounded(proposal.width, 0.0);
    let col_w = column_width(avail, columns, column_spacing);

    let mut height = 0.0;
    let mut row_count = 0;
    for range in rows(flat.len(), columns) {
        let row_h = flat[range]
            .iter()
            .map(|c| {
                measure(c, ctx, env, Proposal::new(col_w, f64::INFINITY))
                    .max
                    .height
            })
            .fold(0.0_f64, f64::max);
        height += row_h;
        row_count += 1;
    }
    height += row_spacing * (row_count as f64 - 1.0).max(0.0);
    if clamp_height {
        height = height.min(Proposal::bounded(proposal.height, height));
    }
    BlockSize::fixed(Size::new(avail, height))
}

/// Draw the grid into `rect`, row by row. Overflow past the rectangle is
/// the page's problem; wrapping grids never take this path.
pub fn draw_grid(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    children: &[Block],
    columns: usize,
    column_spacing: f64,
    row_spacing: f64,
    rect: Rect,
) {
    let flat = flatten(children, env);
    if flat.is_empty() {
        return;
    }
    let col_w = column_width(rect.width, columns, column_spacing);
    let mut y = rect.y;
    for range in rows(flat.len(), columns) {
        let row = &flat[range];
        let row_h = row
            .iter()
            .map(|c| {
                measure(c, ctx, env, Proposal::new(col_w, f64::INFINITY))
                    .max
                    .height
            })
            .fold(0.0_f64, f64::max);
        for (i, child) in row.iter().enumerate() {
            let x = rect.x + i as f64 * (col_w + column_spacing);
            draw(child, ctx, env, Rect::new(x, y, col_w, row_h));
        }
        y += row_h + row_spacing;
    }
}

/// Build one block per row for the pagination queue: a horizontal stack of
/// the row's children, each pinned to the shared column width.
pub fn row_blocks(
    children: &[Block],
    columns: usize,
    column_spacing: f64,
    available_width: f64,
    env: &Environment,
) -> Vec<Block> {
    let flat = flatten(children, env);
    let col_w = column_width(available_width, columns, column_spacing);
    rows(flat.len(), columns)
        .map(|range| {
            let cells = flat[range]
                .iter()
                .map(|c| Block::Frame {
                    width: Some(col_w),
                    height: None,
                    alignment: crate::style::Alignment::TOP_LEADING,
                    child: Box::new(c.clone()),
                })
                .collect();
            Block::HStack {
                children: cells,
                spacing: Spacing::Fixed(column_spacing),
                alignment: VerticalAlignment::Top,
            }
        })
        .collect()
}
