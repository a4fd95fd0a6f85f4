//! # Cascading Environment
//!
//! Configuration that flows top-down through the block tree. Every key has
//! a default, so lookups always succeed. Writes are functional: a child
//! override produces a new environment value that only that subtree sees,
//! never siblings or ancestors.
//!
//! The environment is a plain cloneable struct rather than a reflective
//! key-value bag: containers thread it explicitly through every measure and
//! draw call. Heavier values (the table column list) sit behind an `Rc` so
//! the per-node clone stays cheap.

use std::rc::Rc;

use crate::style::{
    Axis, Color, Font, HorizontalAlignment, StrokeStyle, TableColumn, TextTruncation,
};

/// Which pass of the two-phase render is in flight. The measured pass runs
/// full pagination with drawing suppressed; the committed pass emits ink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Measured,
    Committed,
}

/// The cascading configuration for one subtree.
#[derive(Debug, Clone)]
pub struct Environment {
    pub font: Font,
    pub foreground: Color,
    pub background: Option<Color>,
    pub text_alignment: HorizontalAlignment,
    /// Main axis of the nearest enclosing stack.
    pub layout_axis: Axis,
    pub render_mode: RenderMode,
    /// Whether a page-wrapping container may actually wrap here.
    pub allow_page_wrap: bool,
    /// Name of the nearest ancestor that forbids page wrapping, for the
    /// inline error marker. `Some` implies `allow_page_wrap == false`.
    pub wrap_barrier: Option<&'static str>,
    /// Column descriptors published by the nearest enclosing table.
    pub table_columns: Rc<[TableColumn]>,
    pub stroke: StrokeStyle,
    pub truncation: TextTruncation,
    /// Free-form marker inherited by a subtree, for renderer-side tagging.
    pub tag: Option<String>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            font: Font::default(),
            foreground: Color::BLACK,
            background: None,
            text_alignment: HorizontalAlignment::default(),
            layout_axis: Axis::default(),
            render_mode: RenderMode::Committed,
            allow_page_wrap: true,
            wrap_barrier: None,
            table_columns: Rc::from(Vec::new()),
            stroke: StrokeStyle::default(),
            truncation: TextTruncation::default(),
            tag: None,
        }
    }
}

impl Environment {
    /// Functional update: clone, apply the change, return the copy.
    pub fn with(&self, change: impl FnOnce(&mut Environment)) -> Environment {
        let mut child = self.clone();
        change(&mut child);
        child
    }

    pub fn with_axis(&self, axis: Axis) -> Environment {
        self.with(|e| e.layout_axis = axis)
    }

    /// Forbid page wrapping below the named construct. The name surfaces in
    /// the inline error marker when a wrapping container is nested here.
    pub fn with_wrap_barrier(&self, construct: &'static str) -> Environment {
        self.with(|e| {
            e.allow_page_wrap = false;
            e.wrap_barrier = Some(construct);
        })
    }
}
