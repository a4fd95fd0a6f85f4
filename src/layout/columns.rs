//! # Column Balancing
//!
//! Distributes a flattened child sequence across equal-width columns, top
//! to bottom, column by column, choosing the smallest shared column height
//! that still holds everything. The convergence is not a true binary
//! search: starting from the average column height, each pass grows the
//! trial height by `excess / count` until the packing simulation places
//! every child, with a hard pass cap and a fallback to the full proposed
//! height.
//!
//! The same packing simulation serves single-page and multi-page layout:
//! atomic placement clips the overflow, primary placement owns page turns,
//! and secondary placement returns a remainder `Columns` block wrapping the
//! leftover children.

use crate::env::Environment;
use crate::geometry::{fits, Proposal, Rect};
use crate::model::{flatten, Block};

use super::wrap::RenderContext;
use super::{draw, measure};

/// Hard cap on balancing passes.
const MAX_BALANCE_PASSES: usize = 20;

/// Result of one greedy packing simulation.
#[derive(Debug, Clone)]
pub struct Packing {
    /// Child indices per column, in placement order.
    pub columns: Vec<Vec<usize>>,
    /// Number of children placed; the rest did not fit.
    pub placed: usize,
    /// Height of the tallest packed column.
    pub tallest: f64,
    /// Total height of the children that could not be placed.
    pub excess: f64,
}

/// Equal column width for `count` columns in `available` space.
pub fn column_width(available: f64, count: usize, spacing: f64) -> f64 {
    let count = count.max(1);
    ((available - spacing * (count - 1) as f64) / count as f64).max(0.0)
}

/// Natural height of each child at the column width.
pub fn natural_heights(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    children: &[Block],
    col_width: f64,
) -> Vec<f64> {
    children
        .iter()
        .map(|c| {
            measure(c, ctx, env, Proposal::new(col_width, f64::INFINITY))
                .max
                .height
        })
        .collect()
}

/// Greedy packing: fill each column until the next child would exceed
/// `limit`, then move on. An empty column always accepts at least one
/// child, so an oversized child cannot stall the simulation. Ties fill
/// earlier columns first.
pub fn pack(heights: &[f64], count: usize, limit: f64) -> Packing {
    let count = count.max(1);
    let mut columns: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut tallest = 0.0_f64;
    let mut index = 0;
    let mut col = 0;
    let mut col_height = 0.0;
    while index < heights.len() && col < count {
        let h = heights[index];
        if columns[col].is_empty() || fits(col_height + h, limit) {
            columns[col].push(index);
            col_height += h;
            tallest = tallest.max(col_height);
            index += 1;
        } else {
            col += 1;
            col_height = 0.0;
        }
    }
    let excess = heights[index..].iter().sum();
    Packing {
        columns,
        placed: index,
        tallest,
        excess,
    }
}

/// The minimum shared column height that packs every child, or `fallback`
/// if the convergence cap is hit.
pub fn balanced_height(heights: &[f64], count: usize, fallback: f64) -> f64 {
    if heights.is_empty() {
        return 0.0;
    }
    let count = count.max(1);
    let sum: f64 = heights.iter().sum();
    let mut trial = sum / count as f64;
    let mut converged = false;
    for _ in 0..MAX_BALANCE_PASSES {
        let packing = pack(heights, count, trial);
        if packing.placed == heights.len() {
            // Everything fits; under-filled columns just mean the trial was
            // already generous.
            converged = true;
            break;
        }
        trial += packing.excess / count as f64;
    }
    if !converged {
        return fallback;
    }
    // One more simulation at the converged trial gives the exact tightest
    // height for final placement.
    pack(heights, count, trial).tallest
}

/// Balanced packing for final placement: the height limit still binds, but
/// each column also stops at its share of the remaining content, so the
/// last column is not left with the scraps of a greedy fill. Falls back to
/// nothing placed beyond the limit; callers re-pack greedily if children
/// are left over.
pub fn pack_balanced(heights: &[f64], count: usize, limit: f64) -> Packing {
    let count = count.max(1);
    let total: f64 = heights.iter().sum();
    let mut columns: Vec<Vec<usize>> = vec![Vec::new(); count];
    let mut tallest = 0.0_f64;
    let mut index = 0;
    let mut placed_sum = 0.0;
    for (col, column) in columns.iter_mut().enumerate() {
        let target = (total - placed_sum) / (count - col) as f64;
        let last = col + 1 == count;
        let mut col_height = 0.0;
        while index < heights.len() {
            let h = heights[index];
            let within_limit = fits(col_height + h, limit);
            let within_target = fits(col_height + h, target) || last;
            if column.is_empty() || (within_limit && within_target) {
                column.push(index);
                col_height += h;
                placed_sum += h;
                index += 1;
            } else {
                break;
            }
        }
        tallest = tallest.max(col_height);
        if index == heights.len() {
            break;
        }
    }
    let excess = heights[index..].iter().sum();
    Packing {
        columns,
        placed: index,
        tallest,
        excess,
    }
}

/// Pack and draw one region's worth of children. With `balance` the shared
/// height is the balanced minimum; otherwise the region height is used as
/// the packing limit (continuation pages fill fully). Returns the indices
/// that did not fit.
fn place(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    children: &[Block],
    heights: &[f64],
    count: usize,
    spacing: f64,
    rect: Rect,
    balance: bool,
) -> Vec<usize> {
    let col_w = column_width(rect.width, count, spacing);
    let full = pack(heights, count, rect.height);
    let packing = if balance && full.placed == heights.len() {
        let h = balanced_height(heights, count, rect.height);
        let balanced = pack_balanced(heights, count, h);
        if balanced.placed == heights.len() {
            balanced
        } else {
            pack(heights, count, h)
        }
    } else {
        full
    };

    for (c, column) in packing.columns.iter().enumerate() {
        let x = rect.x + c as f64 * (col_w + spacing);
        let mut y = rect.y;
        for &i in column {
            draw(&children[i], ctx, env, Rect::new(x, y, col_w, heights[i]));
            y += heights[i];
        }
    }
    (packing.placed..heights.len()).collect()
}

/// Lay the children out in `rect`. Balanced when everything fits; the
/// leftover children come back as a remainder `Columns` block, or are
/// clipped when `clip_overflow` is set.
pub fn flow(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    children: &[Block],
    count: usize,
    spacing: f64,
    wrap: bool,
    rect: Rect,
    clip_overflow: bool,
) -> Option<Block> {
    let flat = flatten(children, env);
    if flat.is_empty() {
        return None;
    }
    let col_w = column_width(rect.width, count, spacing);
    let heights = natural_heights(ctx, env, &flat, col_w);
    let leftover = place(ctx, env, &flat, &heights, count, spacing, rect, true);
    if leftover.is_empty() || clip_overflow {
        return None;
    }
    Some(Block::Columns {
        children: leftover.into_iter().map(|i| flat[i].clone()).collect(),
        count,
        spacing,
        wrap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_fills_earlier_columns_first() {
        let heights = vec![10.0, 10.0, 10.0, 10.0];
        let p = pack(&heights, 3, 20.0);
        assert_eq!(p.placed, 4);
        assert_eq!(p.columns[0], vec![0, 1]);
        assert_eq!(p.columns[1], vec![2, 3]);
        assert!(p.columns[2].is_empty());
    }

    #[test]
    fn pack_places_oversized_child_in_empty_column() {
        let heights = vec![50.0, 10.0];
        let p = pack(&heights, 2, 20.0);
        assert_eq!(p.placed, 2);
        assert_eq!(p.columns[0], vec![0]);
        assert_eq!(p.columns[1], vec![1]);
    }

    #[test]
    fn nine_uniform_children_balance_to_three_per_column() {
        let heights = vec![20.0; 9];
        let h = balanced_height(&heights, 3, 1000.0);
        assert!((h - 60.0).abs() < 1e-9, "expected 3h per column, got {h}");
    }

    #[test]
    fn ten_uniform_children_grow_past_the_average() {
        let heights = vec![20.0; 10];
        // Average is 66.7; packing 3 per column strands one child, so the
        // trial grows until a 4-4-2 split fits.
        let h = balanced_height(&heights, 3, 1000.0);
        assert!((h - 80.0).abs() < 1e-9, "expected 4h per column, got {h}");
    }

    #[test]
    fn uniform_children_stay_within_one_item_of_balance() {
        for n in 1..=30_usize {
            let heights = vec![15.0; n];
            let h = balanced_height(&heights, 4, 10_000.0);
            let p = pack_balanced(&heights, 4, h);
            assert_eq!(p.placed, n, "all {n} children must place");
            let shortest = p
                .columns
                .iter()
                .filter(|c| !c.is_empty())
                .map(|c| c.len() as f64 * 15.0)
                .fold(f64::INFINITY, f64::min);
            assert!(
                p.tallest - shortest <= 15.0 + 1e-9,
                "columns out of balance for n={n}: tallest {} shortest {}",
                p.tallest,
                shortest
            );
        }
    }

    #[test]
    fn balanced_packing_does_not_strand_the_last_column() {
        // Greedy packing at the tight height would fill 8-8-8-5; the
        // balanced pass spreads the rows 7-7-7-8.
        let heights = vec![15.0; 29];
        let h = balanced_height(&heights, 4, 10_000.0);
        assert!((h - 120.0).abs() < 1e-9);
        let p = pack_balanced(&heights, 4, h);
        let counts: Vec<usize> = p.columns.iter().map(|c| c.len()).collect();
        assert_eq!(counts, vec![7, 7, 7, 8]);
    }

    #[test]
    fn fewer_children_than_columns_settle_immediately() {
        let heights = vec![30.0, 10.0];
        let h = balanced_height(&heights, 3, 1000.0);
        assert!((h - 30.0).abs() < 1e-9);
    }
}
