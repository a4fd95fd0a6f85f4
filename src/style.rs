//! # Style Values
//!
//! The value types carried by the cascading environment: color, font,
//! stroke, alignment, axis, truncation. These are plain data; how they
//! cascade is the environment's business, and how they turn into ink is
//! the renderer's.

use serde::{Deserialize, Serialize};

/// An RGBA color, components in 0.0 to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };
    pub const RED: Color = Color {
        r: 0.8,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
    pub const GRAY: Color = Color {
        r: 0.5,
        g: 0.5,
        b: 0.5,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Color { r, g, b, a: 1.0 }
    }
}

/// A font request: family name, size in points, weight and slant.
/// Resolution to an actual face is the renderer's concern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    pub size: f64,
    pub weight: u32,
    pub italic: bool,
}

impl Font {
    pub fn new(family: &str, size: f64) -> Self {
        Font {
            family: family.to_string(),
            size,
            weight: 400,
            italic: false,
        }
    }

    pub fn bold(mut self) -> Self {
        self.weight = 700;
        self
    }
}

impl Default for Font {
    fn default() -> Self {
        Font::new("Helvetica", 12.0)
    }
}

/// Stroke styling for lines, borders and shape outlines.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        StrokeStyle {
            color: Color::BLACK,
            width: 1.0,
        }
    }
}

/// Horizontal placement of content within a wider slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum HorizontalAlignment {
    #[default]
    Leading,
    Center,
    Trailing,
}

impl HorizontalAlignment {
    /// Offset fraction of the free space: 0 leading, 0.5 center, 1 trailing.
    pub fn fraction(&self) -> f64 {
        match self {
            HorizontalAlignment::Leading => 0.0,
            HorizontalAlignment::Center => 0.5,
            HorizontalAlignment::Trailing => 1.0,
        }
    }
}

/// Vertical placement of content within a taller slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum VerticalAlignment {
    #[default]
    Top,
    Center,
    Bottom,
}

impl VerticalAlignment {
    pub fn fraction(&self) -> f64 {
        match self {
            VerticalAlignment::Top => 0.0,
            VerticalAlignment::Center => 0.5,
            VerticalAlignment::Bottom => 1.0,
        }
    }
}

/// Two-axis alignment for frames, overlays and backgrounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
}

impl Alignment {
    pub const CENTER: Alignment = Alignment {
        horizontal: HorizontalAlignment::Center,
        vertical: VerticalAlignment::Center,
    };
    pub const TOP_LEADING: Alignment = Alignment {
        horizontal: HorizontalAlignment::Leading,
        vertical: VerticalAlignment::Top,
    };

    pub fn new(horizontal: HorizontalAlignment, vertical: VerticalAlignment) -> Self {
        Alignment {
            horizontal,
            vertical,
        }
    }
}

/// The main axis of the nearest enclosing stack. Dividers and spacers read
/// this from the environment to orient themselves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    #[default]
    Vertical,
}

impl Axis {
    pub fn cross(&self) -> Axis {
        match self {
            Axis::Horizontal => Axis::Vertical,
            Axis::Vertical => Axis::Horizontal,
        }
    }
}

/// What to do with text that does not fit its slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum TextTruncation {
    /// Break into as many lines as needed.
    #[default]
    Wrap,
    /// Single line, cut at the slot edge.
    Clip,
    /// Single line, cut with a trailing ellipsis.
    Tail,
}

/// Geometry of a shape leaf. Fill and stroke come from the environment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    RoundedRectangle { radius: f64 },
    Ellipse,
}

/// A table column descriptor: title, proportional width factor and the
/// horizontal alignment applied to cell content. Tables publish their
/// column list through the environment so nested cell content can see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableColumn {
    pub title: String,
    pub width: f64,
    pub alignment: HorizontalAlignment,
}

impl TableColumn {
    pub fn new(title: &str, width: f64) -> Self {
        TableColumn {
            title: title.to_string(),
            width,
            alignment: HorizontalAlignment::Leading,
        }
    }

    pub fn aligned(mut self, alignment: HorizontalAlignment) -> Self {
        self.alignment = alignment;
        self
    }
}
