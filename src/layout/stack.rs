//! # Linear Stack Negotiation
//!
//! Sizing for vertical and horizontal stacks: an iterative relaxation that
//! settles children whose natural extent fits the current even share of
//! space, then recomputes the share over whoever is left. The loop runs at
//! most once per child (in the worst case one child settles per pass), and
//! it is a loop rather than recursion so deep stacks cannot blow the call
//! stack.
//!
//! Allocation order: settled naturals first, then proportional-width
//! children split the leftover by factor, then greedy children share it
//! evenly, and spacers absorb only what nobody else claimed. Spacers are
//! always lowest priority for space.

use crate::env::Environment;
use crate::geometry::{fits, BlockSize, Proposal, Rect, Size};
use crate::model::{flatten, Block, Spacing};
use crate::style::Axis;

use super::wrap::RenderContext;
use super::{draw, measure};

fn proposal_along(axis: Axis, main: f64, cross: f64) -> Proposal {
    match axis {
        Axis::Horizontal => Proposal::new(main, cross),
        Axis::Vertical => Proposal::new(cross, main),
    }
}

/// Compute each child's main-axis extent for a stack of `main_extent`.
///
/// The children must already be flattened and the environment's layout
/// axis already set to `axis`.
pub fn solve(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    children: &[Block],
    axis: Axis,
    main_extent: f64,
    cross_extent: f64,
    spacing: Spacing,
) -> Vec<f64> {
    let n = children.len();
    if n == 0 {
        return Vec::new();
    }

    let gaps = spacing.minimum() * (n - 1) as f64;
    let mut remaining = (main_extent - gaps).max(0.0);
    let mut sizes = vec![0.0_f64; n];

    let mut spacers: Vec<usize> = Vec::new();
    let mut proportional: Vec<(usize, f64)> = Vec::new();
    let mut pool: Vec<usize> = Vec::new();

    for (i, child) in children.iter().enumerate() {
        if child.is_spacer(env) {
            let reserved = measure(child, ctx, env, proposal_along(axis, 0.0, cross_extent))
                .min
                .along(axis);
            sizes[i] = reserved;
            remaining = (remaining - reserved).max(0.0);
            spacers.push(i);
        } else if let Some(factor) = child.proportional_width(env) {
            proportional.push((i, factor.max(0.0)));
        } else {
            pool.push(i);
        }
    }

    // Settle loop: children whose natural extent fits the even share take
    // exactly their natural size and leave the pool.
    loop {
        if pool.is_empty() {
            break;
        }
        let share = (remaining / pool.len() as f64).max(0.0);
        let mut settled: Vec<usize> = Vec::new();
        for &i in &pool {
            let natural = measure(
                &children[i],
                ctx,
                env,
                proposal_along(axis, f64::INFINITY, cross_extent),
            )
            .max
            .along(axis);
            if natural.is_finite() && fits(natural, share) {
                sizes[i] = natural;
                settled.push(i);
            }
        }
        if settled.is_empty() {
            break;
        }
        for i in &settled {
            remaining = (remaining - sizes[*i]).max(0.0);
        }
        pool.retain(|i| !settled.contains(i));
    }

    // Proportional children divide the leftover by factor. Under an
    // unbounded proposal there is no leftover to divide; they report
    // natural size like anyone else.
    let total_factor: f64 = proportional.iter().map(|(_, f)| f).sum();
    if total_factor > 0.0 {
        if remaining.is_finite() {
            for &(i, factor) in &proportional {
                sizes[i] = remaining * factor / total_factor;
            }
            remaining = 0.0;
        } else {
            for &(i, _) in &proportional {
                sizes[i] = measure(
                    &children[i],
                    ctx,
                    env,
                    proposal_along(axis, f64::INFINITY, cross_extent),
                )
                .max
                .along(axis);
            }
        }
    }

    // Whoever is left is larger or flexible: the final even share.
    if !pool.is_empty() {
        let share = (remaining / pool.len() as f64).max(0.0);
        for &i in &pool {
            sizes[i] = share;
        }
        remaining = 0.0;
    }

    // Spacers absorb space nobody else claimed.
    if !spacers.is_empty() && remaining.is_finite() && remaining > 0.0 {
        let extra = remaining / spacers.len() as f64;
        for &i in &spacers {
            sizes[i] += extra;
        }
    }

    sizes
}

/// Negotiated measurement for a non-wrapping stack. The reported main
/// extent never exceeds the proposal: oversized children are shrunk to
/// their share, exactly as they will be drawn.
pub fn measure_stack(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    children: &[Block],
    axis: Axis,
    spacing: Spacing,
    proposal: Proposal,
) -> BlockSize {
    let flat = flatten(children, env);
    if flat.is_empty() {
        return BlockSize::ZERO;
    }
    let main = proposal.along(axis);
    let cross = proposal.along(axis.cross());
    let sizes = solve(ctx, env, &flat, axis, main, cross, spacing);

    let gaps = spacing.minimum() * (flat.len() - 1) as f64;
    let mut main_min = gaps;
    let mut main_max = gaps;
    let mut cross_min = 0.0_f64;
    let mut cross_max = 0.0_f64;
    for (i, child) in flat.iter().enumerate() {
        let m = measure(child, ctx, env, proposal_along(axis, sizes[i], cross));
        main_min += m.min.along(axis);
        main_max += sizes[i];
        cross_min = cross_min.max(m.min.along(axis.cross()));
        cross_max = cross_max.max(m.max.along(axis.cross()));
    }
    if main.is_finite() {
        main_max = main_max.min(main);
        // Flexible spacing makes the stack greedy: it claims the whole
        // main axis so there is slack to distribute between the gaps.
        if matches!(spacing, Spacing::Flexible { .. }) && flat.len() > 1 {
            main_max = main;
        }
    }
    if cross.is_finite() {
        cross_max = cross_max.min(cross);
    }
    main_min = main_min.min(main_max);
    cross_min = cross_min.min(cross_max);

    match axis {
        Axis::Horizontal => BlockSize::new(
            Size::new(main_min, cross_min),
            Size::new(main_max, cross_max),
        ),
        Axis::Vertical => BlockSize::new(
            Size::new(cross_min, main_min),
            Size::new(cross_max, main_max),
        ),
    }
}

/// Unnegotiated measurement: the extent the children need when each is
/// given unlimited main-axis space. Page-wrapping containers report this so
/// the pagination engine can tell how much content remains to split.
pub fn natural_stack_size(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    children: &[Block],
    axis: Axis,
    spacing: Spacing,
    proposal: Proposal,
) -> BlockSize {
    let flat = flatten(children, env);
    if flat.is_empty() {
        return BlockSize::ZERO;
    }
    let cross = proposal.along(axis.cross());
    let mut main_total = spacing.minimum() * (flat.len() - 1) as f64;
    let mut main_min = 0.0_f64;
    let mut cross_min = 0.0_f64;
    let mut cross_max = 0.0_f64;
    for child in &flat {
        let m = measure(child, ctx, env, proposal_along(axis, f64::INFINITY, cross));
        main_total += m.max.along(axis);
        main_min = main_min.max(m.min.along(axis));
        cross_min = cross_min.max(m.min.along(axis.cross()));
        cross_max = cross_max.max(m.max.along(axis.cross()));
    }
    if cross.is_finite() {
        cross_max = cross_max.min(cross);
    }
    cross_min = cross_min.min(cross_max);

    match axis {
        Axis::Horizontal => BlockSize::new(
            Size::new(main_min, cross_min),
            Size::new(main_total, cross_max),
        ),
        Axis::Vertical => BlockSize::new(
            Size::new(cross_min, main_min),
            Size::new(cross_max, main_total),
        ),
    }
}

/// Place and draw a non-wrapping stack's children into `rect`.
///
/// `cross_fraction` is the cross-axis alignment as a 0..1 offset fraction.
#[allow(clippy::too_many_arguments)]
pub fn draw_stack(
    ctx: &mut RenderContext<'_>,
    env: &Environment,
    children: &[Block],
    axis: Axis,
    spacing: Spacing,
    cross_fraction: f64,
    rect: Rect,
) {
    let flat = flatten(children, env);
    let n = flat.len();
    if n == 0 {
        return;
    }
    let main_extent = rect.size().along(axis);
    let cross_extent = rect.size().along(axis.cross());
    let sizes = solve(ctx, env, &flat, axis, main_extent, cross_extent, spacing);
    let total: f64 = sizes.iter().sum();

    let gap = match spacing {
        Spacing::Fixed(v) => v,
        Spacing::Flexible { min } => {
            if n > 1 {
                let slack = main_extent - total - min * (n - 1) as f64;
                min + (slack / (n - 1) as f64).max(0.0)
            } else {
                min
            }
        }
    };

    let mut offset = 0.0;
    for (i, child) in flat.iter().enumerate() {
        let m = measure(child, ctx, env, proposal_along(axis, sizes[i], cross_extent));
        let cross_size = m.max.along(axis.cross()).min(cross_extent);
        let cross_offset = (cross_extent - cross_size) * cross_fraction;
        let child_rect = match axis {
            Axis::Horizontal => Rect::new(
                rect.x + offset,
                rect.y + cross_offset,
                sizes[i],
                cross_size,
            ),
            Axis::Vertical => Rect::new(
                rect.x + cross_offset,
                rect.y + offset,
                cross_size,
                sizes[i],
            ),
        };
        draw(child, ctx, env, child_rect);
        offset += sizes[i] + gap;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{RecordingRenderer, RenderLayer};

    fn text_of_width(chars: usize) -> Block {
        // Default font is 12pt, 6pt per character.
        Block::text("x".repeat(chars))
    }

    #[test]
    fn settle_loop_shrinks_only_the_oversized_child() {
        let mut renderer = RecordingRenderer::new();
        let mut ctx = RenderContext::new(&mut renderer, RenderLayer::Committed, None);
        let env = Environment::default().with_axis(Axis::Horizontal);

        // Natural widths 48, 198, 48 in a 250pt slot: the small children
        // keep their size, the large one takes what is left.
        let children = vec![text_of_width(8), text_of_width(33), text_of_width(8)];
        let sizes = solve(
            &mut ctx,
            &env,
            &children,
            Axis::Horizontal,
            250.0,
            100.0,
            Spacing::Fixed(0.0),
        );
        assert!((sizes[0] - 48.0).abs() < 1e-9);
        assert!((sizes[2] - 48.0).abs() < 1e-9);
        assert!((sizes[1] - 154.0).abs() < 1e-9, "large child gets the rest");
    }

    #[test]
    fn spacers_take_only_what_nobody_claimed() {
        let mut renderer = RecordingRenderer::new();
        let mut ctx = RenderContext::new(&mut renderer, RenderLayer::Committed, None);
        let env = Environment::default().with_axis(Axis::Horizontal);

        let children = vec![text_of_width(10), Block::spacer(5.0), text_of_width(10)];
        let sizes = solve(
            &mut ctx,
            &env,
            &children,
            Axis::Horizontal,
            300.0,
            100.0,
            Spacing::Fixed(0.0),
        );
        assert!((sizes[0] - 60.0).abs() < 1e-9);
        assert!((sizes[2] - 60.0).abs() < 1e-9);
        assert!((sizes[1] - 180.0).abs() < 1e-9, "spacer absorbs the slack");
    }

    #[test]
    fn proportional_children_split_by_factor() {
        let mut renderer = RecordingRenderer::new();
        let mut ctx = RenderContext::new(&mut renderer, RenderLayer::Committed, None);
        let env = Environment::default().with_axis(Axis::Horizontal);

        let children = vec![
            text_of_width(2).proportional(1.0),
            text_of_width(2).proportional(3.0),
        ];
        let sizes = solve(
            &mut ctx,
            &env,
            &children,
            Axis::Horizontal,
            400.0,
            100.0,
            Spacing::Fixed(0.0),
        );
        assert!((sizes[0] - 100.0).abs() < 1e-9);
        assert!((sizes[1] - 300.0).abs() < 1e-9);
    }

    #[test]
    fn empty_stack_measures_to_zero() {
        let mut renderer = RecordingRenderer::new();
        let mut ctx = RenderContext::new(&mut renderer, RenderLayer::Committed, None);
        let env = Environment::default();
        let size = measure_stack(
            &mut ctx,
            &env,
            &[],
            Axis::Vertical,
            Spacing::Fixed(10.0),
            Proposal::new(100.0, 100.0),
        );
        assert_eq!(size, BlockSize::ZERO);
    }
}
