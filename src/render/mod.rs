//! # Renderer Interface
//!
//! The seam between the layout engine and whatever actually produces ink.
//! The engine only ever talks to the [`Renderer`] trait: it asks it to
//! measure text, start pages, and draw primitives into rectangles it has
//! already negotiated. Glyph shaping, path stroking and byte emission all
//! live behind this trait.
//!
//! The two-valued [`RenderLayer`] is the drawing-suppression switch for the
//! two-phase render: the measured pass traverses the whole document with
//! every op filtered out (establishing pagination and the page count), the
//! committed pass repeats the traversal and emits.

pub mod recording;

use serde::Serialize;

use crate::env::Environment;
use crate::error::LayoutError;
use crate::geometry::{BlockSize, Point, Proposal, Rect, Size};
use crate::style::{Color, ShapeKind};

pub use recording::RecordingRenderer;

/// Which pass of the two-phase render the drawing backend should honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderLayer {
    /// Pagination dry run: accept every call, emit nothing.
    Measured,
    /// Real pass: emit ops.
    Committed,
}

/// A graphics-state change pushed around a subtree draw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StateChange {
    pub translate: Option<(f64, f64)>,
    pub rotate_degrees: Option<f64>,
    /// Rotation pivot in page coordinates.
    pub pivot: Option<Point>,
    pub opacity: Option<f64>,
    pub clip: Option<Rect>,
}

impl StateChange {
    pub fn translate(dx: f64, dy: f64) -> Self {
        StateChange {
            translate: Some((dx, dy)),
            ..Default::default()
        }
    }

    pub fn rotate(degrees: f64, pivot: Point) -> Self {
        StateChange {
            rotate_degrees: Some(degrees),
            pivot: Some(pivot),
            ..Default::default()
        }
    }

    pub fn opacity(value: f64) -> Self {
        StateChange {
            opacity: Some(value),
            ..Default::default()
        }
    }

    pub fn clip(rect: Rect) -> Self {
        StateChange {
            clip: Some(rect),
            ..Default::default()
        }
    }
}

/// The drawing backend consumed by the layout engine.
///
/// All methods are synchronous; the engine is a single-threaded recursive
/// descent and never draws concurrently.
pub trait Renderer {
    /// Select the active layer. Ops issued while the layer is
    /// [`RenderLayer::Measured`] must be silently dropped; text measurement
    /// must keep working in both layers.
    fn set_layer(&mut self, layer: RenderLayer);

    /// Open a new page of the given size. Subsequent draw calls land on it.
    fn start_page(&mut self, size: Size);

    /// Report the achievable size range for a text run under the proposal.
    fn measure_text(&mut self, content: &str, env: &Environment, proposal: Proposal) -> BlockSize;

    fn draw_text(&mut self, content: &str, env: &Environment, rect: Rect);

    fn draw_shape(&mut self, kind: ShapeKind, env: &Environment, rect: Rect);

    fn draw_line(&mut self, env: &Environment, from: Point, to: Point);

    fn draw_border(&mut self, color: Color, width: f64, rect: Rect);

    fn draw_image(&mut self, name: &str, env: &Environment, rect: Rect);

    /// Push a graphics-state change applying to every op until the matching
    /// [`Renderer::pop_state`].
    fn push_state(&mut self, change: StateChange);

    fn pop_state(&mut self);

    /// Produce the final document bytes after both passes have run.
    fn finish(&mut self) -> Result<Vec<u8>, LayoutError>;
}

// ── Recorded op model ───────────────────────────────────────────

/// One primitive drawing operation, as recorded by [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum DrawOp {
    Text {
        content: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        font_family: String,
        font_size: f64,
        color: Color,
    },
    Shape {
        kind: ShapeKind,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        fill: Option<Color>,
        stroke: Color,
        stroke_width: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        stroke: Color,
        stroke_width: f64,
    },
    Border {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Color,
        stroke_width: f64,
    },
    Image {
        name: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    PushState(StateChange),
    PopState,
}

/// One emitted page with its recorded ops.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedPage {
    pub width: f64,
    pub height: f64,
    pub ops: Vec<DrawOp>,
}
