//! # Geometry Primitives
//!
//! Sizes, points, rectangles and the two measurement types the size
//! negotiation protocol is built on: `Proposal` (what a parent offers a
//! child) and `BlockSize` (the min/max range the child reports back).
//!
//! All lengths are in points (1/72 inch). Comparisons that decide layout
//! outcomes (does this fit, did this settle) are quantized to millipoints
//! so accumulated floating-point noise never causes a spurious page break.

use serde::{Deserialize, Serialize};

/// Quantize a length to whole millipoints.
pub fn quantize(v: f64) -> i64 {
    if v.is_infinite() {
        return if v > 0.0 { i64::MAX } else { i64::MIN };
    }
    (v * 1000.0).round() as i64
}

/// Inclusive fit test: does `extent` fit within `available`?
///
/// A child whose height exactly equals the remaining page space is placed
/// on the current page, not pushed to the next.
pub fn fits(extent: f64, available: f64) -> bool {
    quantize(extent) <= quantize(available)
}

/// Millipoint-tolerant equality.
pub fn approx(a: f64, b: f64) -> bool {
    quantize(a) == quantize(b)
}

/// A width and height pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Size { width, height }
    }

    /// The extent along `axis`.
    pub fn along(&self, axis: crate::style::Axis) -> f64 {
        match axis {
            crate::style::Axis::Horizontal => self.width,
            crate::style::Axis::Vertical => self.height,
        }
    }
}

/// A point in page coordinates. The origin is the top-left corner of the
/// page; y grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }
}

/// An axis-aligned rectangle (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Rect {
            x,
            y,
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Shrink the rectangle by `edges` on each side. Degenerate insets
    /// produce a zero-sized rectangle rather than a negative one.
    pub fn inset(&self, edges: &Edges) -> Rect {
        Rect {
            x: self.x + edges.left,
            y: self.y + edges.top,
            width: (self.width - edges.horizontal()).max(0.0),
            height: (self.height - edges.vertical()).max(0.0),
        }
    }
}

/// Edge values (top, right, bottom, left) used for margins and padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Edges {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Edges {
    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn symmetric(vertical: f64, horizontal: f64) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

/// The size a parent offers a child during measurement.
///
/// `f64::INFINITY` on an axis means "as much as you need" (the child
/// reports its natural extent). The [`Proposal::MAX_EXTENT`] sentinel means
/// "all available space" and is what page-wrapping containers answer with
/// while their real extent is still unknown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    pub width: f64,
    pub height: f64,
}

impl Proposal {
    /// Sentinel for "fill all available space".
    pub const MAX_EXTENT: f64 = f64::MAX;

    pub fn new(width: f64, height: f64) -> Self {
        Proposal { width, height }
    }

    /// Both axes unconstrained: measure natural size.
    pub fn unbounded() -> Self {
        Proposal {
            width: f64::INFINITY,
            height: f64::INFINITY,
        }
    }

    pub fn from_size(size: Size) -> Self {
        Proposal {
            width: size.width,
            height: size.height,
        }
    }

    pub fn along(&self, axis: crate::style::Axis) -> f64 {
        match axis {
            crate::style::Axis::Horizontal => self.width,
            crate::style::Axis::Vertical => self.height,
        }
    }

    /// Replace an unconstrained extent with `fallback`.
    pub fn bounded(extent: f64, fallback: f64) -> f64 {
        if extent.is_finite() && extent < Self::MAX_EXTENT {
            extent
        } else {
            fallback
        }
    }
}

/// The achievable size range a block reports for a given proposal.
///
/// `min` is the smallest size the block can render at without clipping;
/// `max` is its natural or preferred size under the proposal. A block is
/// flexible on an axis when the two differ there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockSize {
    pub min: Size,
    pub max: Size,
}

impl BlockSize {
    pub const ZERO: BlockSize = BlockSize {
        min: Size::ZERO,
        max: Size::ZERO,
    };

    /// A rigid block: min and max coincide.
    pub fn fixed(size: Size) -> Self {
        BlockSize {
            min: size,
            max: size,
        }
    }

    pub fn new(min: Size, max: Size) -> Self {
        BlockSize { min, max }
    }

    pub fn is_width_flexible(&self) -> bool {
        !approx(self.min.width, self.max.width)
    }

    pub fn is_height_flexible(&self) -> bool {
        !approx(self.min.height, self.max.height)
    }
}
