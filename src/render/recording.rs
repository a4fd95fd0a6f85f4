//! # Recording Renderer
//!
//! A renderer that records every draw op instead of producing ink. It
//! serves two purposes: it is the reference backend for tests (fixed
//! per-character text metrics make measurement deterministic), and its
//! `finish` output is the JSON document-bytes form of the laid-out pages.

use crate::env::Environment;
use crate::error::LayoutError;
use crate::geometry::{BlockSize, Point, Proposal, Rect, Size};
use crate::render::{DrawOp, RecordedPage, RenderLayer, Renderer, StateChange};
use crate::style::{Color, ShapeKind, TextTruncation};

/// Fraction of the font size one character advances.
const CHAR_ADVANCE: f64 = 0.5;
/// Line height as a multiple of the font size.
const LINE_HEIGHT: f64 = 1.2;

/// Records draw ops per page; committed-layer only.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pages: Vec<RecordedPage>,
    layer: Option<RenderLayer>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The pages recorded by the committed pass.
    pub fn pages(&self) -> &[RecordedPage] {
        &self.pages
    }

    /// Count ops across all pages matching a predicate.
    pub fn count_ops(&self, pred: impl Fn(&DrawOp) -> bool) -> usize {
        self.pages
            .iter()
            .flat_map(|p| p.ops.iter())
            .filter(|op| pred(op))
            .count()
    }

    fn committing(&self) -> bool {
        self.layer == Some(RenderLayer::Committed)
    }

    fn record(&mut self, op: DrawOp) {
        if !self.committing() {
            return;
        }
        if let Some(page) = self.pages.last_mut() {
            page.ops.push(op);
        }
    }

    /// Break `content` into greedy word-wrapped lines that fit `avail`.
    /// Every line holds at least one word, so oversized words do not loop.
    fn wrap_lines(content: &str, advance: f64, avail: f64) -> Vec<String> {
        let mut lines = Vec::new();
        let mut line = String::new();
        for word in content.split_whitespace() {
            let candidate_len = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if !line.is_empty() && candidate_len as f64 * advance > avail {
                lines.push(std::mem::take(&mut line));
                line.push_str(word);
            } else {
                if !line.is_empty() {
                    line.push(' ');
                }
                line.push_str(word);
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
        lines
    }
}

impl Renderer for RecordingRenderer {
    fn set_layer(&mut self, layer: RenderLayer) {
        self.layer = Some(layer);
    }

    fn start_page(&mut self, size: Size) {
        if self.committing() {
            self.pages.push(RecordedPage {
                width: size.width,
                height: size.height,
                ops: Vec::new(),
            });
        }
    }

    fn measure_text(&mut self, content: &str, env: &Environment, proposal: Proposal) -> BlockSize {
        if content.is_empty() {
            return BlockSize::ZERO;
        }
        let advance = env.font.size * CHAR_ADVANCE;
        let line_h = env.font.size * LINE_HEIGHT;
        let natural = content.chars().count() as f64 * advance;
        let longest_word = content
            .split_whitespace()
            .map(|w| w.chars().count() as f64 * advance)
            .fold(0.0_f64, f64::max);

        let avail = Proposal::bounded(proposal.width, f64::INFINITY);
        let single_line = env.truncation != TextTruncation::Wrap || natural <= avail;
        if single_line {
            let width = natural.min(avail);
            return BlockSize::new(
                Size::new(longest_word.min(width), line_h),
                Size::new(width, line_h),
            );
        }

        let lines = Self::wrap_lines(content, advance, avail);
        let widest = lines
            .iter()
            .map(|l| l.chars().count() as f64 * advance)
            .fold(0.0_f64, f64::max);
        let height = lines.len() as f64 * line_h;
        BlockSize::new(
            Size::new(longest_word.min(avail), height),
            Size::new(widest.min(avail), height),
        )
    }

    fn draw_text(&mut self, content: &str, env: &Environment, rect: Rect) {
        let advance = env.font.size * CHAR_ADVANCE;
        let natural = content.chars().count() as f64 * advance;
        let slack = (rect.width - natural).max(0.0);
        let x = rect.x + slack * env.text_alignment.fraction();
        self.record(DrawOp::Text {
            content: content.to_string(),
            x,
            y: rect.y,
            width: rect.width.min(natural.max(0.0)).min(rect.width),
            height: rect.height,
            font_family: env.font.family.clone(),
            font_size: env.font.size,
            color: env.foreground,
        });
    }

    fn draw_shape(&mut self, kind: ShapeKind, env: &Environment, rect: Rect) {
        self.record(DrawOp::Shape {
            kind,
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            fill: env.background,
            stroke: env.stroke.color,
            stroke_width: env.stroke.width,
        });
    }

    fn draw_line(&mut self, env: &Environment, from: Point, to: Point) {
        self.record(DrawOp::Line {
            x1: from.x,
            y1: from.y,
            x2: to.x,
            y2: to.y,
            stroke: env.stroke.color,
            stroke_width: env.stroke.width,
        });
    }

    fn draw_border(&mut self, color: Color, width: f64, rect: Rect) {
        self.record(DrawOp::Border {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            color,
            stroke_width: width,
        });
    }

    fn draw_image(&mut self, name: &str, _env: &Environment, rect: Rect) {
        self.record(DrawOp::Image {
            name: name.to_string(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        });
    }

    fn push_state(&mut self, change: StateChange) {
        self.record(DrawOp::PushState(change));
    }

    fn pop_state(&mut self) {
        self.record(DrawOp::PopState);
    }

    fn finish(&mut self) -> Result<Vec<u8>, LayoutError> {
        Ok(serde_json::to_vec_pretty(&self.pages)?)
    }
}
