//! # Block Model
//!
//! The content tree the layout engine resolves into pages. A block is one
//! of a closed set of kinds: leaves (text, shapes, spacers), containers
//! (stacks, grids, columns, tables), decorators that wrap exactly one
//! child, and two structural forms: the transparent `Group` (an ordered
//! child list with no visual identity, produced by conditional or
//! loop-generated content) and `Composite` (a node whose body is derived
//! at resolve time and may branch on the inherited environment).
//!
//! The tree is pure data plus a few `Rc`'d builder closures; all layout
//! behavior lives in the `layout` module.

use std::fmt;
use std::rc::Rc;

use crate::env::Environment;
use crate::geometry::Edges;
use crate::style::{
    Alignment, Color, HorizontalAlignment, ShapeKind, TableColumn, VerticalAlignment,
};

// ── Page configuration ──────────────────────────────────────────

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Tabloid,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A3 => (841.89, 1190.55),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Tabloid => (792.0, 1224.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Page size and margins for a render run. Page blocks may override both.
#[derive(Debug, Clone, PartialEq)]
pub struct PageGeometry {
    pub size: PageSize,
    pub margin: Edges,
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry {
            size: PageSize::A4,
            margin: Edges::uniform(54.0),
        }
    }
}

impl PageGeometry {
    pub fn new(size: PageSize, margin: Edges) -> Self {
        PageGeometry { size, margin }
    }
}

// ── Spacing policy ──────────────────────────────────────────────

/// How a stack spaces its children along the main axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spacing {
    /// A fixed gap between adjacent children.
    Fixed(f64),
    /// Distribute leftover space evenly between gaps, never below `min`.
    Flexible { min: f64 },
}

impl Spacing {
    /// The guaranteed gap regardless of leftover distribution.
    pub fn minimum(&self) -> f64 {
        match self {
            Spacing::Fixed(v) => *v,
            Spacing::Flexible { min } => *min,
        }
    }
}

impl Default for Spacing {
    fn default() -> Self {
        Spacing::Fixed(0.0)
    }
}

// ── Table model ─────────────────────────────────────────────────

/// One table data row: a cell string per column.
pub type Row = Rc<Vec<String>>;

/// Key ordering for a table group partition.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum GroupOrder {
    #[default]
    Ascending,
    Descending,
}

/// One level of a table's group chain: a key extractor, a key ordering,
/// and optional header/footer builders invoked per distinct key.
#[derive(Clone)]
pub struct TableGroup {
    pub key: Rc<dyn Fn(&Row) -> String>,
    pub order: GroupOrder,
    pub header: Option<Rc<dyn Fn(&str) -> Block>>,
    pub footer: Option<Rc<dyn Fn(&str, &[Row]) -> Block>>,
}

impl TableGroup {
    /// Group on the cell value of `column`.
    pub fn on_column(column: usize) -> Self {
        TableGroup {
            key: Rc::new(move |row: &Row| row.get(column).cloned().unwrap_or_default()),
            order: GroupOrder::Ascending,
            header: None,
            footer: None,
        }
    }

    pub fn order(mut self, order: GroupOrder) -> Self {
        self.order = order;
        self
    }

    pub fn header(mut self, build: impl Fn(&str) -> Block + 'static) -> Self {
        self.header = Some(Rc::new(build));
        self
    }

    pub fn footer(mut self, build: impl Fn(&str, &[Row]) -> Block + 'static) -> Self {
        self.footer = Some(Rc::new(build));
        self
    }
}

impl fmt::Debug for TableGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableGroup")
            .field("order", &self.order)
            .field("header", &self.header.is_some())
            .field("footer", &self.footer.is_some())
            .finish()
    }
}

/// A table declaration: columns, data rows, a group chain walked
/// outermost-first, and builders for per-page repeated content.
#[derive(Clone)]
pub struct TableDef {
    pub columns: Rc<[TableColumn]>,
    pub rows: Vec<Row>,
    pub groups: Vec<TableGroup>,
    /// Custom row content builder; the default lays cells out per the
    /// column descriptors.
    pub row_builder: Option<Rc<dyn Fn(&Row) -> Block>>,
    /// Repeated at the top of every page the table touches.
    pub page_header: Option<Rc<dyn Fn(usize) -> Block>>,
    /// Repeated at the bottom of every page the table touches.
    pub page_footer: Option<Rc<dyn Fn(usize) -> Block>>,
    pub show_column_titles: bool,
}

impl TableDef {
    pub fn new(columns: Vec<TableColumn>, rows: Vec<Vec<String>>) -> Self {
        TableDef {
            columns: Rc::from(columns),
            rows: rows.into_iter().map(Rc::new).collect(),
            groups: Vec::new(),
            row_builder: None,
            page_header: None,
            page_footer: None,
            show_column_titles: true,
        }
    }

    pub fn group(mut self, group: TableGroup) -> Self {
        self.groups.push(group);
        self
    }

    pub fn row_builder(mut self, build: impl Fn(&Row) -> Block + 'static) -> Self {
        self.row_builder = Some(Rc::new(build));
        self
    }

    pub fn page_header(mut self, build: impl Fn(usize) -> Block + 'static) -> Self {
        self.page_header = Some(Rc::new(build));
        self
    }

    pub fn page_footer(mut self, build: impl Fn(usize) -> Block + 'static) -> Self {
        self.page_footer = Some(Rc::new(build));
        self
    }

    pub fn column_titles(mut self, show: bool) -> Self {
        self.show_column_titles = show;
        self
    }
}

impl fmt::Debug for TableDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDef")
            .field("columns", &self.columns.len())
            .field("rows", &self.rows.len())
            .field("groups", &self.groups.len())
            .finish()
    }
}

// ── Page counters ───────────────────────────────────────────────

/// Formats the current page index and, once the measured pass has
/// established it, the total page count.
#[derive(Clone)]
pub struct PageNumberFormat(pub Rc<dyn Fn(usize, Option<usize>) -> String>);

impl PageNumberFormat {
    pub fn default_format() -> Self {
        PageNumberFormat(Rc::new(|page, total| match total {
            Some(n) => format!("Page {page} of {n}"),
            None => format!("Page {page}"),
        }))
    }
}

impl fmt::Debug for PageNumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PageNumberFormat")
    }
}

// ── Composite nodes ─────────────────────────────────────────────

/// A node whose content is derived at resolve time. The body may branch on
/// the inherited environment, so resolution re-runs on every measure and
/// draw call instead of being cached.
pub trait Composite {
    fn body(&self, env: &Environment) -> Block;
}

/// An environment mutation applied by a `Modified` decorator.
pub type EnvChange = Rc<dyn Fn(&mut Environment)>;

// ── The block tree ──────────────────────────────────────────────

/// A unit of content in the layout tree.
#[derive(Clone)]
pub enum Block {
    Empty,
    Text(String),
    Shape(ShapeKind),
    /// A rule across the enclosing stack's cross axis.
    Divider,
    /// Flexible blank space along the enclosing stack's main axis.
    Spacer { min_length: f64 },
    /// An image placed by name; decoding and pixels are the renderer's
    /// concern, the intrinsic size drives layout.
    Image {
        name: String,
        width: f64,
        height: f64,
    },
    PageNumber(PageNumberFormat),
    /// Forces a page turn inside a page-wrapping container; inert elsewhere.
    PageBreak,

    VStack {
        children: Vec<Block>,
        spacing: Spacing,
        alignment: HorizontalAlignment,
        /// Allow this stack's content to continue onto subsequent pages.
        wrap: bool,
    },
    HStack {
        children: Vec<Block>,
        spacing: Spacing,
        alignment: VerticalAlignment,
    },
    ZStack {
        children: Vec<Block>,
        alignment: Alignment,
    },
    Grid {
        children: Vec<Block>,
        columns: usize,
        column_spacing: f64,
        row_spacing: f64,
        wrap: bool,
    },
    Columns {
        children: Vec<Block>,
        count: usize,
        spacing: f64,
        wrap: bool,
    },
    Table(TableDef),
    /// Transparent ordered child list; flattened into the parent.
    Group(Vec<Block>),
    /// A page-declaring node. Only meaningful at the document root.
    Page {
        size: Option<PageSize>,
        margin: Option<Edges>,
        content: Box<Block>,
    },

    // Decorators: wrap exactly one child and forward trait queries.
    Padding {
        insets: Edges,
        child: Box<Block>,
    },
    Frame {
        width: Option<f64>,
        height: Option<f64>,
        alignment: Alignment,
        child: Box<Block>,
    },
    Background {
        background: Box<Block>,
        child: Box<Block>,
    },
    Overlay {
        overlay: Box<Block>,
        child: Box<Block>,
    },
    Border {
        color: Color,
        width: f64,
        child: Box<Block>,
    },
    Offset {
        dx: f64,
        dy: f64,
        child: Box<Block>,
    },
    Opacity {
        value: f64,
        child: Box<Block>,
    },
    Rotation {
        degrees: f64,
        child: Box<Block>,
    },
    Clipped {
        child: Box<Block>,
    },
    /// Requests a share of the parent stack's main axis proportional to
    /// `factor`, bypassing natural measurement.
    Proportional {
        factor: f64,
        child: Box<Block>,
    },
    /// Applies an environment change visible only to the child subtree.
    Modified {
        apply: EnvChange,
        child: Box<Block>,
    },
    Composite(Rc<dyn Composite>),
}

// ── Constructors ────────────────────────────────────────────────

impl Block {
    pub fn text(content: impl Into<String>) -> Block {
        Block::Text(content.into())
    }

    pub fn shape(kind: ShapeKind) -> Block {
        Block::Shape(kind)
    }

    pub fn spacer(min_length: f64) -> Block {
        Block::Spacer { min_length }
    }

    pub fn image(name: impl Into<String>, width: f64, height: f64) -> Block {
        Block::Image {
            name: name.into(),
            width,
            height,
        }
    }

    pub fn page_number() -> Block {
        Block::PageNumber(PageNumberFormat::default_format())
    }

    pub fn vstack(children: Vec<Block>, spacing: Spacing) -> Block {
        Block::VStack {
            children,
            spacing,
            alignment: HorizontalAlignment::Leading,
            wrap: false,
        }
    }

    /// A vertical stack whose content may flow across pages.
    pub fn vstack_wrapping(children: Vec<Block>, spacing: Spacing) -> Block {
        Block::VStack {
            children,
            spacing,
            alignment: HorizontalAlignment::Leading,
            wrap: true,
        }
    }

    pub fn hstack(children: Vec<Block>, spacing: Spacing) -> Block {
        Block::HStack {
            children,
            spacing,
            alignment: VerticalAlignment::Top,
        }
    }

    pub fn zstack(children: Vec<Block>) -> Block {
        Block::ZStack {
            children,
            alignment: Alignment::CENTER,
        }
    }

    pub fn grid(children: Vec<Block>, columns: usize, spacing: f64) -> Block {
        Block::Grid {
            children,
            columns,
            column_spacing: spacing,
            row_spacing: spacing,
            wrap: false,
        }
    }

    pub fn columns(children: Vec<Block>, count: usize, spacing: f64) -> Block {
        Block::Columns {
            children,
            count,
            spacing,
            wrap: false,
        }
    }

    pub fn group(children: Vec<Block>) -> Block {
        Block::Group(children)
    }

    pub fn page(content: Block) -> Block {
        Block::Page {
            size: None,
            margin: None,
            content: Box::new(content),
        }
    }

    pub fn composite(node: impl Composite + 'static) -> Block {
        Block::Composite(Rc::new(node))
    }

    // Decorator chaining.

    pub fn padding(self, insets: Edges) -> Block {
        Block::Padding {
            insets,
            child: Box::new(self),
        }
    }

    pub fn frame(self, width: Option<f64>, height: Option<f64>) -> Block {
        Block::Frame {
            width,
            height,
            alignment: Alignment::CENTER,
            child: Box::new(self),
        }
    }

    pub fn background(self, background: Block) -> Block {
        Block::Background {
            background: Box::new(background),
            child: Box::new(self),
        }
    }

    pub fn overlay(self, overlay: Block) -> Block {
        Block::Overlay {
            overlay: Box::new(overlay),
            child: Box::new(self),
        }
    }

    pub fn border(self, color: Color, width: f64) -> Block {
        Block::Border {
            color,
            width,
            child: Box::new(self),
        }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Block {
        Block::Offset {
            dx,
            dy,
            child: Box::new(self),
        }
    }

    pub fn opacity(self, value: f64) -> Block {
        Block::Opacity {
            value,
            child: Box::new(self),
        }
    }

    pub fn rotated(self, degrees: f64) -> Block {
        Block::Rotation {
            degrees,
            child: Box::new(self),
        }
    }

    pub fn clipped(self) -> Block {
        Block::Clipped {
            child: Box::new(self),
        }
    }

    pub fn proportional(self, factor: f64) -> Block {
        Block::Proportional {
            factor,
            child: Box::new(self),
        }
    }

    pub fn modified(self, apply: impl Fn(&mut Environment) + 'static) -> Block {
        Block::Modified {
            apply: Rc::new(apply),
            child: Box::new(self),
        }
    }
}

// ── Trait queries ───────────────────────────────────────────────

impl Block {
    /// Human-readable kind name, used in error markers and debugging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Block::Empty => "empty",
            Block::Text(_) => "text",
            Block::Shape(_) => "shape",
            Block::Divider => "divider",
            Block::Spacer { .. } => "spacer",
            Block::Image { .. } => "image",
            Block::PageNumber(_) => "page number",
            Block::PageBreak => "page break",
            Block::VStack { wrap: true, .. } => "wrapping vertical stack",
            Block::VStack { .. } => "vertical stack",
            Block::HStack { .. } => "horizontal stack",
            Block::ZStack { .. } => "overlay stack",
            Block::Grid { wrap: true, .. } => "wrapping grid",
            Block::Grid { .. } => "grid",
            Block::Columns { wrap: true, .. } => "wrapping columns",
            Block::Columns { .. } => "columns",
            Block::Table(_) => "table",
            Block::Group(_) => "group",
            Block::Page { .. } => "page",
            Block::Padding { .. } => "padding",
            Block::Frame { .. } => "frame",
            Block::Background { .. } => "background",
            Block::Overlay { .. } => "overlay",
            Block::Border { .. } => "border",
            Block::Offset { .. } => "offset",
            Block::Opacity { .. } => "opacity",
            Block::Rotation { .. } => "rotation",
            Block::Clipped { .. } => "clip",
            Block::Proportional { .. } => "proportional width",
            Block::Modified { .. } => "environment modifier",
            Block::Composite(_) => "composite",
        }
    }

    /// The decorated child, if this block is a decorator. Trait queries
    /// delegate through decorators unless the decorator has its own answer.
    fn decorated_child(&self) -> Option<&Block> {
        match self {
            Block::Padding { child, .. }
            | Block::Frame { child, .. }
            | Block::Background { child, .. }
            | Block::Overlay { child, .. }
            | Block::Border { child, .. }
            | Block::Offset { child, .. }
            | Block::Opacity { child, .. }
            | Block::Rotation { child, .. }
            | Block::Clipped { child }
            | Block::Proportional { child, .. }
            | Block::Modified { child, .. } => Some(child),
            _ => None,
        }
    }

    /// Does this block want its content to continue across pages?
    pub fn wants_page_wrap(&self, env: &Environment) -> bool {
        match self {
            Block::VStack { wrap, .. }
            | Block::Grid { wrap, .. }
            | Block::Columns { wrap, .. } => *wrap,
            Block::Table(_) => true,
            Block::Composite(c) => c.body(env).wants_page_wrap(env),
            _ => self
                .decorated_child()
                .is_some_and(|c| c.wants_page_wrap(env)),
        }
    }

    /// Is this block pure blank space? Spacers are skipped when they would
    /// open a fresh page and are sized after every other sibling.
    pub fn is_spacer(&self, env: &Environment) -> bool {
        match self {
            Block::Spacer { .. } => true,
            Block::Composite(c) => c.body(env).is_spacer(env),
            _ => self.decorated_child().is_some_and(|c| c.is_spacer(env)),
        }
    }

    /// The proportional main-axis factor this block requested, if any.
    pub fn proportional_width(&self, env: &Environment) -> Option<f64> {
        match self {
            Block::Proportional { factor, .. } => Some(*factor),
            Block::Composite(c) => c.body(env).proportional_width(env),
            _ => self
                .decorated_child()
                .and_then(|c| c.proportional_width(env)),
        }
    }
}

// ── Resolution ──────────────────────────────────────────────────

/// Unfold composite bodies until a concrete block kind is reached. Runs on
/// every measure/draw call; the body may branch on the environment.
pub fn resolve(mut block: Block, env: &Environment) -> Block {
    loop {
        match block {
            Block::Composite(node) => block = node.body(env),
            other => return other,
        }
    }
}

/// Flatten transparent groups into a single ordered child list, resolving
/// composites along the way.
pub fn flatten(children: &[Block], env: &Environment) -> Vec<Block> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match resolve(child.clone(), env) {
            Block::Group(inner) => out.extend(flatten(&inner, env)),
            other => out.push(other),
        }
    }
    out
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Block::Text(s) => write!(f, "Text({s:?})"),
            Block::VStack { children, wrap, .. } => {
                write!(f, "VStack(children: {}, wrap: {wrap})", children.len())
            }
            Block::HStack { children, .. } => write!(f, "HStack(children: {})", children.len()),
            Block::Group(children) => write!(f, "Group({})", children.len()),
            Block::Table(def) => def.fmt(f),
            other => f.write_str(other.kind_name()),
        }
    }
}
