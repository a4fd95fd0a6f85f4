//! Integration tests for the Quire layout pipeline.
//!
//! These tests exercise the full path from a block tree to recorded draw
//! ops. They verify:
//! - Size negotiation (settling, shrinking, proportional widths)
//! - Pagination: page counts, item conservation, boundary inclusivity
//! - Column balancing across one and many pages
//! - Table grouping and repeated titles across page breaks
//! - Inline error markers for invalid compositions

use quire::env::Environment;
use quire::geometry::{Edges, Proposal};
use quire::layout::{measure, RenderContext};
use quire::model::*;
use quire::render::{DrawOp, RecordingRenderer, RecordedPage, RenderLayer, Renderer};
use quire::style::*;
use quire::{render, render_to_bytes, RenderStats};

// ─── Helpers ────────────────────────────────────────────────────

/// A page with no margins, so content coordinates are page coordinates.
fn bare_page(width: f64, height: f64) -> PageGeometry {
    PageGeometry::new(PageSize::Custom { width, height }, Edges::uniform(0.0))
}

/// A rigid block of the given height that fills the available width.
fn item(height: f64) -> Block {
    Block::shape(ShapeKind::Rectangle).frame(None, Some(height))
}

fn render_doc(geometry: &PageGeometry, root: Block) -> (RenderStats, RecordingRenderer) {
    let mut renderer = RecordingRenderer::new();
    let stats = render(geometry, &root, &mut renderer).expect("render should succeed");
    (stats, renderer)
}

fn shape_count(page: &RecordedPage) -> usize {
    page.ops
        .iter()
        .filter(|op| matches!(op, DrawOp::Shape { .. }))
        .count()
}

fn texts_in_order(renderer: &RecordingRenderer) -> Vec<String> {
    renderer
        .pages()
        .iter()
        .flat_map(|p| p.ops.iter())
        .filter_map(|op| match op {
            DrawOp::Text { content, .. } => Some(content.clone()),
            _ => None,
        })
        .collect()
}

// ─── Size Negotiation ───────────────────────────────────────────

#[test]
fn hstack_shrinks_only_the_oversized_child() {
    // Natural widths {50, 200, 50} proposed 250: the 200pt child shrinks
    // to 150 while the 50pt children keep their size.
    let row = Block::hstack(
        vec![
            Block::text("x".repeat(10)),
            Block::text("x".repeat(40)),
            Block::text("x".repeat(10)),
        ],
        Spacing::Fixed(0.0),
    )
    .modified(|e| e.font.size = 10.0);

    let (_, renderer) = render_doc(&bare_page(250.0, 100.0), row);
    let xs: Vec<f64> = renderer.pages()[0]
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Text { x, .. } => Some(*x),
            _ => None,
        })
        .collect();
    assert_eq!(xs.len(), 3);
    assert!((xs[0] - 0.0).abs() < 1e-6);
    assert!((xs[1] - 50.0).abs() < 1e-6, "second child starts at 50");
    assert!(
        (xs[2] - 200.0).abs() < 1e-6,
        "third child starts after the shrunk middle, got {}",
        xs[2]
    );
}

#[test]
fn measurement_is_monotonic_under_the_proposal() {
    let mut renderer = RecordingRenderer::new();
    renderer.set_layer(RenderLayer::Committed);
    let mut ctx = RenderContext::new(&mut renderer, RenderLayer::Committed, None);
    let env = Environment::default();

    let paragraph = Block::text("the quick brown fox jumps over the lazy dog");
    for width in [40.0, 80.0, 120.0, 400.0] {
        let size = measure(&paragraph, &mut ctx, &env, Proposal::new(width, 500.0));
        assert!(size.min.width <= size.max.width + 1e-9);
        assert!(size.min.height <= size.max.height + 1e-9);
        assert!(
            size.max.width <= width + 1e-9,
            "reported {} for a {width} proposal",
            size.max.width
        );
    }
}

#[test]
fn measurement_is_idempotent() {
    let mut renderer = RecordingRenderer::new();
    renderer.set_layer(RenderLayer::Committed);
    let mut ctx = RenderContext::new(&mut renderer, RenderLayer::Committed, None);
    let env = Environment::default();

    let tree = Block::vstack(
        vec![
            Block::text("alpha beta gamma delta"),
            Block::hstack(
                vec![Block::text("left").proportional(1.0), Block::text("right")],
                Spacing::Fixed(4.0),
            ),
            item(20.0),
        ],
        Spacing::Fixed(8.0),
    );
    let proposal = Proposal::new(180.0, 400.0);
    let first = measure(&tree, &mut ctx, &env, proposal);
    let second = measure(&tree, &mut ctx, &env, proposal);
    assert_eq!(first, second, "identical inputs must yield identical sizes");
}

#[test]
fn flexible_spacing_distributes_the_slack() {
    let stack = Block::vstack(
        vec![item(20.0), item(20.0)],
        Spacing::Flexible { min: 10.0 },
    );
    let (_, renderer) = render_doc(&bare_page(100.0, 100.0), stack);
    let ys: Vec<f64> = renderer.pages()[0]
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Shape { y, .. } => Some(*y),
            _ => None,
        })
        .collect();
    assert_eq!(ys.len(), 2);
    assert!((ys[0] - 0.0).abs() < 1e-6);
    assert!(
        (ys[1] - 80.0).abs() < 1e-6,
        "second item pushed to the bottom, got {}",
        ys[1]
    );
}

// ─── Pagination ─────────────────────────────────────────────────

#[test]
fn wrapping_stack_splits_ten_items_seven_then_three() {
    let stack = Block::vstack_wrapping((0..10).map(|_| item(20.0)).collect(), Spacing::Fixed(0.0));
    let (stats, renderer) = render_doc(&bare_page(200.0, 150.0), stack);

    assert_eq!(stats.pages, 2, "150pt holds 7 items, the rest overflow");
    assert_eq!(renderer.pages().len(), 2);
    assert_eq!(shape_count(&renderer.pages()[0]), 7);
    assert_eq!(shape_count(&renderer.pages()[1]), 3);
}

#[test]
fn pagination_conserves_every_item() {
    for n in 0..25 {
        let stack =
            Block::vstack_wrapping((0..n).map(|_| item(20.0)).collect(), Spacing::Fixed(0.0));
        let (_, renderer) = render_doc(&bare_page(200.0, 150.0), stack);
        let drawn = renderer.count_ops(|op| matches!(op, DrawOp::Shape { .. }));
        assert_eq!(drawn, n, "nothing dropped, nothing duplicated for n={n}");
    }
}

#[test]
fn exact_fit_stays_on_the_current_page() {
    // Three 20pt items in exactly 60pt: boundary is inclusive.
    let stack = Block::vstack_wrapping((0..3).map(|_| item(20.0)).collect(), Spacing::Fixed(0.0));
    let (stats, _) = render_doc(&bare_page(200.0, 60.0), stack);
    assert_eq!(stats.pages, 1, "exact fit must not force a page break");

    let stack = Block::vstack_wrapping((0..4).map(|_| item(20.0)).collect(), Spacing::Fixed(0.0));
    let (stats, renderer) = render_doc(&bare_page(200.0, 60.0), stack);
    assert_eq!(stats.pages, 2);
    assert_eq!(shape_count(&renderer.pages()[0]), 3);
    assert_eq!(shape_count(&renderer.pages()[1]), 1);
}

#[test]
fn page_break_block_forces_a_new_page() {
    let stack = Block::vstack_wrapping(
        vec![item(20.0), Block::PageBreak, item(20.0)],
        Spacing::Fixed(0.0),
    );
    let (stats, renderer) = render_doc(&bare_page(200.0, 150.0), stack);
    assert_eq!(stats.pages, 2);
    assert_eq!(shape_count(&renderer.pages()[0]), 1);
    assert_eq!(shape_count(&renderer.pages()[1]), 1);
}

#[test]
fn spacer_is_skipped_at_the_top_of_a_fresh_page() {
    let stack = Block::vstack_wrapping(
        vec![item(90.0), Block::spacer(30.0), item(50.0)],
        Spacing::Fixed(0.0),
    );
    let (stats, renderer) = render_doc(&bare_page(200.0, 100.0), stack);
    assert_eq!(stats.pages, 2);
    let second_page_ys: Vec<f64> = renderer.pages()[1]
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Shape { y, .. } => Some(*y),
            _ => None,
        })
        .collect();
    assert_eq!(second_page_ys, vec![0.0], "spacer must not push the item down");
}

#[test]
fn empty_wrapping_stack_emits_one_empty_page() {
    let stack = Block::vstack_wrapping(vec![], Spacing::Fixed(0.0));
    let (stats, renderer) = render_doc(&bare_page(200.0, 150.0), stack);
    assert_eq!(stats.pages, 1);
    assert_eq!(shape_count(&renderer.pages()[0]), 0);
}

#[test]
fn nested_wrapping_stack_hands_back_a_remainder() {
    // Outer wrap stack: one 100pt item, then an inner wrap stack of five
    // 30pt items. The inner stack fills the 50pt left on page one with one
    // item and continues on page two.
    let inner = Block::vstack_wrapping((0..5).map(|_| item(30.0)).collect(), Spacing::Fixed(0.0));
    let outer = Block::vstack_wrapping(vec![item(100.0), inner], Spacing::Fixed(0.0));
    let (stats, renderer) = render_doc(&bare_page(200.0, 150.0), outer);

    assert_eq!(stats.pages, 2);
    assert_eq!(shape_count(&renderer.pages()[0]), 2, "100pt item + 1 inner");
    assert_eq!(shape_count(&renderer.pages()[1]), 4, "inner remainder");
}

// ─── Explicit Pages ─────────────────────────────────────────────

#[test]
fn page_declaring_roots_render_as_their_own_pages() {
    let doc = Block::group(vec![
        Block::page(Block::text("first")),
        Block::page(Block::text("second")),
    ]);
    let (stats, renderer) = render_doc(&PageGeometry::default(), doc);
    assert_eq!(stats.pages, 2);
    assert_eq!(texts_in_order(&renderer), vec!["first", "second"]);
}

#[test]
fn empty_document_produces_no_pages() {
    let (stats, renderer) = render_doc(&PageGeometry::default(), Block::group(vec![]));
    assert_eq!(stats.pages, 0);
    assert!(renderer.pages().is_empty());
}

#[test]
fn page_counters_know_the_total_after_the_measured_pass() {
    let doc = Block::group(vec![
        Block::page(Block::page_number()),
        Block::page(Block::page_number()),
    ]);
    let (_, renderer) = render_doc(&PageGeometry::default(), doc);
    assert_eq!(
        texts_in_order(&renderer),
        vec!["Page 1 of 2", "Page 2 of 2"]
    );
}

// ─── Columns ────────────────────────────────────────────────────

#[test]
fn nine_items_in_three_columns_balance_three_per_column() {
    let cols = Block::columns((0..9).map(|_| item(20.0)).collect(), 3, 0.0);
    let (stats, renderer) = render_doc(&bare_page(300.0, 200.0), cols);
    assert_eq!(stats.pages, 1);

    let mut per_column: std::collections::BTreeMap<i64, Vec<f64>> = Default::default();
    for op in &renderer.pages()[0].ops {
        if let DrawOp::Shape { x, y, .. } = op {
            per_column.entry(*x as i64).or_default().push(*y);
        }
    }
    assert_eq!(per_column.len(), 3, "three distinct column positions");
    for (x, ys) in per_column {
        assert_eq!(ys.len(), 3, "column at {x} should hold 3 items");
        assert_eq!(ys, vec![0.0, 20.0, 40.0], "column height is exactly 3h");
    }
}

#[test]
fn wrapping_columns_continue_across_pages() {
    // Two 30pt items per 50pt page (one per column), eight items total.
    let cols = Block::Columns {
        children: (0..8).map(|_| item(30.0)).collect(),
        count: 2,
        spacing: 0.0,
        wrap: true,
    };
    let (stats, renderer) = render_doc(&bare_page(200.0, 50.0), cols);
    assert_eq!(stats.pages, 4);
    let total = renderer.count_ops(|op| matches!(op, DrawOp::Shape { .. }));
    assert_eq!(total, 8, "column flow conserves items");
}

// ─── Grid ───────────────────────────────────────────────────────

#[test]
fn grid_chunks_children_into_rows() {
    let grid = Block::grid((0..6).map(|_| item(20.0)).collect(), 3, 0.0);
    let (_, renderer) = render_doc(&bare_page(300.0, 200.0), grid);
    let ys: std::collections::BTreeSet<i64> = renderer.pages()[0]
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Shape { y, .. } => Some(*y as i64),
            _ => None,
        })
        .collect();
    assert_eq!(ys.len(), 2, "six children in three columns make two rows");
}

#[test]
fn wrapping_grid_breaks_at_row_boundaries() {
    let grid = Block::Grid {
        children: (0..6).map(|_| item(20.0)).collect(),
        columns: 2,
        column_spacing: 0.0,
        row_spacing: 0.0,
        wrap: true,
    };
    let (stats, renderer) = render_doc(&bare_page(200.0, 50.0), grid);
    assert_eq!(stats.pages, 2);
    assert_eq!(shape_count(&renderer.pages()[0]), 4, "two full rows");
    assert_eq!(shape_count(&renderer.pages()[1]), 2, "last row carries over");
}

// ─── Tables ─────────────────────────────────────────────────────

fn sample_table(rows_per_group: usize) -> TableDef {
    let mut rows = Vec::new();
    for group in 1..=5 {
        for r in 0..rows_per_group {
            rows.push(vec![format!("G{group}"), format!("row {group}-{r}")]);
        }
    }
    TableDef::new(
        vec![
            TableColumn::new("Key", 1.0),
            TableColumn::new("Value", 2.0),
        ],
        rows,
    )
}

#[test]
fn grouped_table_renders_headers_and_footers_once_per_key() {
    let def = sample_table(2).group(
        TableGroup::on_column(0)
            .header(|key| Block::text(format!("HDR {key}")))
            .footer(|key, _| Block::text(format!("FTR {key}"))),
    );
    // Small page so breaks land mid-group.
    let (stats, renderer) = render_doc(&bare_page(300.0, 80.0), Block::Table(def));
    assert!(stats.pages > 1, "table must span several pages");

    let texts = texts_in_order(&renderer);
    let headers: Vec<&String> = texts.iter().filter(|t| t.starts_with("HDR")).collect();
    let footers: Vec<&String> = texts.iter().filter(|t| t.starts_with("FTR")).collect();
    assert_eq!(headers.len(), 5, "one header per group key");
    assert_eq!(footers.len(), 5, "one footer per group key");
    for g in 1..=5 {
        let hdr = texts
            .iter()
            .position(|t| t == &format!("HDR G{g}"))
            .expect("header present");
        let ftr = texts
            .iter()
            .position(|t| t == &format!("FTR G{g}"))
            .expect("footer present");
        assert!(hdr < ftr, "group {g} header precedes its footer");
        let rows: Vec<usize> = texts
            .iter()
            .enumerate()
            .filter(|(_, t)| t.starts_with(&format!("row {g}-")))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(rows.len(), 2, "both rows of group {g} rendered");
        for r in rows {
            assert!(hdr < r && r < ftr, "rows of group {g} sit between header and footer");
        }
    }
}

#[test]
fn table_column_titles_repeat_on_every_page() {
    let def = sample_table(4);
    let (stats, renderer) = render_doc(&bare_page(300.0, 100.0), Block::Table(def));
    assert!(stats.pages > 1);

    let titles = texts_in_order(&renderer)
        .iter()
        .filter(|t| *t == "Key")
        .count();
    assert_eq!(titles, stats.pages, "titles lead every page of the table");
}

#[test]
fn table_page_footer_is_invoked_per_page() {
    let def = sample_table(4).page_footer(|page| Block::text(format!("sheet {page}")));
    let (stats, renderer) = render_doc(&bare_page(300.0, 100.0), Block::Table(def));
    let sheets: Vec<String> = texts_in_order(&renderer)
        .into_iter()
        .filter(|t| t.starts_with("sheet"))
        .collect();
    assert_eq!(sheets.len(), stats.pages);
    assert_eq!(sheets[0], "sheet 1");
}

#[test]
fn ungrouped_rows_conserve_across_breaks() {
    let def = sample_table(4);
    let (_, renderer) = render_doc(&bare_page(300.0, 100.0), Block::Table(def));
    let rows = texts_in_order(&renderer)
        .iter()
        .filter(|t| t.starts_with("row "))
        .count();
    assert_eq!(rows, 20, "every data row drawn exactly once");
}

// ─── Invalid Compositions ───────────────────────────────────────

#[test]
fn wrapping_stack_inside_a_frame_renders_an_error_marker() {
    let bad = Block::vstack_wrapping((0..10).map(|_| item(20.0)).collect(), Spacing::Fixed(0.0))
        .frame(Some(150.0), Some(150.0));
    let (stats, renderer) = render_doc(&bare_page(300.0, 300.0), bad);
    assert_eq!(stats.pages, 1, "invalid composition must not crash or wrap");

    let texts = texts_in_order(&renderer);
    assert_eq!(texts.len(), 1);
    assert!(
        texts[0].contains("wrapping vertical stack") && texts[0].contains("frame"),
        "marker names both constructs: {}",
        texts[0]
    );
    let borders = renderer.count_ops(|op| matches!(op, DrawOp::Border { .. }));
    assert_eq!(borders, 1, "marker is drawn with a border");
    assert_eq!(
        renderer.count_ops(|op| matches!(op, DrawOp::Shape { .. })),
        0,
        "the invalid subtree itself is not drawn"
    );
}

#[test]
fn wrapping_stack_inside_padding_is_also_rejected() {
    let bad = Block::vstack_wrapping(vec![item(20.0)], Spacing::Fixed(0.0))
        .padding(Edges::uniform(10.0));
    let (_, renderer) = render_doc(&bare_page(300.0, 300.0), bad);
    let texts = texts_in_order(&renderer);
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("padding"), "marker names the padding: {}", texts[0]);
}

// ─── Entry Point & Output ───────────────────────────────────────

#[test]
fn render_to_bytes_produces_parseable_pages() {
    let stack = Block::vstack(
        vec![Block::text("hello"), item(20.0)],
        Spacing::Fixed(4.0),
    );
    let bytes = render_to_bytes(&bare_page(200.0, 200.0), &stack).expect("bytes");
    let value: serde_json::Value = serde_json::from_slice(&bytes).expect("valid JSON");
    let pages = value.as_array().expect("array of pages");
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0]["width"], 200.0);
    assert!(pages[0]["ops"].as_array().expect("ops").len() >= 2);
}

#[test]
fn degenerate_margins_are_rejected_up_front() {
    let geometry = PageGeometry::new(PageSize::A5, Edges::uniform(400.0));
    let err = render_to_bytes(&geometry, &Block::text("hi")).unwrap_err();
    assert!(matches!(err, quire::error::LayoutError::InvalidGeometry(_)));
}

#[test]
fn decorators_draw_around_their_child() {
    let tree = Block::text("boxed")
        .border(Color::BLACK, 1.0)
        .offset(5.0, 5.0)
        .opacity(0.5);
    let (_, renderer) = render_doc(&bare_page(200.0, 200.0), tree);
    let ops = &renderer.pages()[0].ops;
    assert!(matches!(ops[0], DrawOp::PushState(_)), "opacity pushes first");
    assert!(
        renderer.count_ops(|op| matches!(op, DrawOp::Border { .. })) == 1,
        "border drawn once"
    );
    assert!(
        renderer.count_ops(|op| matches!(op, DrawOp::PopState)) == 2,
        "both state pushes are popped"
    );
}

#[test]
fn divider_reads_the_ambient_stack_axis() {
    let tree = Block::vstack(
        vec![Block::text("a"), Block::Divider, Block::text("b")],
        Spacing::Fixed(2.0),
    );
    let (_, renderer) = render_doc(&bare_page(100.0, 100.0), tree);
    let lines: Vec<(f64, f64, f64, f64)> = renderer.pages()[0]
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Line { x1, y1, x2, y2, .. } => Some((*x1, *y1, *x2, *y2)),
            _ => None,
        })
        .collect();
    assert_eq!(lines.len(), 1);
    let (x1, y1, x2, y2) = lines[0];
    assert!((y1 - y2).abs() < 1e-9, "vertical stack gets a horizontal rule");
    assert!((x2 - x1 - 100.0).abs() < 1e-6, "rule spans the full width");
}

#[test]
fn image_scales_down_preserving_aspect_ratio() {
    let tree = Block::image("logo", 200.0, 100.0);
    let (_, renderer) = render_doc(&bare_page(100.0, 100.0), tree);
    let images: Vec<(f64, f64)> = renderer.pages()[0]
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Image { width, height, .. } => Some((*width, *height)),
            _ => None,
        })
        .collect();
    assert_eq!(images.len(), 1);
    assert!((images[0].0 - 100.0).abs() < 1e-6);
    assert!((images[0].1 - 50.0).abs() < 1e-6, "aspect ratio preserved");
}

#[test]
fn zstack_layers_children_in_declaration_order() {
    let tree = Block::zstack(vec![item(50.0), Block::text("on top")]);
    let (_, renderer) = render_doc(&bare_page(100.0, 100.0), tree);
    let ops = &renderer.pages()[0].ops;
    let shape_idx = ops
        .iter()
        .position(|op| matches!(op, DrawOp::Shape { .. }))
        .expect("shape drawn");
    let text_idx = ops
        .iter()
        .position(|op| matches!(op, DrawOp::Text { .. }))
        .expect("text drawn");
    assert!(shape_idx < text_idx, "later children draw above earlier ones");
}
