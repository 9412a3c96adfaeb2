//! Runtime object model: the expanded, default-filled form of wire records.

mod container;
mod freehand;
mod text;
mod view;

pub use container::{ChildRef, Container};
pub use freehand::{Recognized, recognize_stroke, simplify_stroke};
pub use text::{FontFamily, FontWeight, TextContent};
pub use view::View;

use crate::ids::{ContainerId, ObjectId, ViewId};
use kurbo::{Point, Rect};
use loro::LoroValue;
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire fields not recognised by this schema version, kept verbatim so a
/// record written by a newer client survives an expand/compact cycle.
pub type Extensions = BTreeMap<String, LoroValue>;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    pub fn transparent() -> Self {
        Self::new(0, 0, 0, 0)
    }

    /// `#rrggbb` when opaque, `#rrggbbaa` otherwise.
    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().strip_prefix('#')?;
        if !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => Some(Self::new(
                channel(0..1)? * 17,
                channel(1..2)? * 17,
                channel(2..3)? * 17,
                255,
            )),
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Stroke dash style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StrokeStyle {
    #[default]
    Solid,
    Dashed,
    Dotted,
}

impl StrokeStyle {
    pub(crate) fn code(self) -> i64 {
        match self {
            StrokeStyle::Solid => 0,
            StrokeStyle::Dashed => 1,
            StrokeStyle::Dotted => 2,
        }
    }

    pub(crate) fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(StrokeStyle::Solid),
            1 => Some(StrokeStyle::Dashed),
            2 => Some(StrokeStyle::Dotted),
            _ => None,
        }
    }
}

/// Where an arrow draws its heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ArrowHead {
    None,
    #[default]
    End,
    Start,
    Both,
}

impl ArrowHead {
    pub(crate) fn code(self) -> i64 {
        match self {
            ArrowHead::None => 0,
            ArrowHead::End => 1,
            ArrowHead::Start => 2,
            ArrowHead::Both => 3,
        }
    }

    pub(crate) fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ArrowHead::None),
            1 => Some(ArrowHead::End),
            2 => Some(ArrowHead::Start),
            3 => Some(ArrowHead::Both),
            _ => None,
        }
    }
}

/// Style properties shared by every object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStyle {
    pub stroke_color: SerializableColor,
    /// Fill color (None = no fill).
    pub fill_color: Option<SerializableColor>,
    pub stroke_width: f64,
    pub stroke_style: StrokeStyle,
    /// Overall opacity (0.0 = fully transparent, 1.0 = fully opaque).
    pub opacity: f64,
}

impl ObjectStyle {
    pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

    /// Get the stroke color with opacity applied.
    pub fn stroke_with_opacity(&self) -> Color {
        let alpha = (self.stroke_color.a as f64 * self.opacity.clamp(0.0, 1.0)) as u8;
        Color::from_rgba8(self.stroke_color.r, self.stroke_color.g, self.stroke_color.b, alpha)
    }

    /// Get the fill color with opacity applied.
    pub fn fill_with_opacity(&self) -> Option<Color> {
        self.fill_color.map(|c| {
            let alpha = (c.a as f64 * self.opacity.clamp(0.0, 1.0)) as u8;
            Color::from_rgba8(c.r, c.g, c.b, alpha)
        })
    }
}

impl Default for ObjectStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            fill_color: None,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
            stroke_style: StrokeStyle::default(),
            opacity: 1.0,
        }
    }
}

/// Type-specific geometry. Coordinates are local to the object's position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Freehand { points: Vec<Point> },
    Rectangle { width: f64, height: f64 },
    Ellipse { width: f64, height: f64 },
    Line { start: Point, end: Point },
    Arrow { start: Point, end: Point, head: ArrowHead },
    Text { width: f64, height: f64, text: TextContent },
    Polygon { vertices: Vec<Point> },
    Sticky { width: f64, height: f64, text: TextContent },
}

impl Geometry {
    /// Single-character wire type code.
    pub fn type_code(&self) -> &'static str {
        match self {
            Geometry::Freehand { .. } => "F",
            Geometry::Rectangle { .. } => "R",
            Geometry::Ellipse { .. } => "E",
            Geometry::Line { .. } => "L",
            Geometry::Arrow { .. } => "A",
            Geometry::Text { .. } => "T",
            Geometry::Polygon { .. } => "P",
            Geometry::Sticky { .. } => "S",
        }
    }

    /// Human-readable kind name.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Geometry::Freehand { .. } => "freehand",
            Geometry::Rectangle { .. } => "rectangle",
            Geometry::Ellipse { .. } => "ellipse",
            Geometry::Line { .. } => "line",
            Geometry::Arrow { .. } => "arrow",
            Geometry::Text { .. } => "text",
            Geometry::Polygon { .. } => "polygon",
            Geometry::Sticky { .. } => "sticky",
        }
    }

    /// Local bounding box relative to the object's position.
    ///
    /// `None` for geometry with no extent: an empty point list, non-finite
    /// coordinates, or a box that is a single point.
    pub fn extent(&self) -> Option<Rect> {
        let rect = match self {
            Geometry::Rectangle { width, height }
            | Geometry::Ellipse { width, height }
            | Geometry::Text { width, height, .. }
            | Geometry::Sticky { width, height, .. } => Rect::new(0.0, 0.0, *width, *height).abs(),
            Geometry::Line { start, end } | Geometry::Arrow { start, end, .. } => {
                Rect::from_points(*start, *end)
            }
            Geometry::Freehand { points } => points_extent(points)?,
            Geometry::Polygon { vertices } => points_extent(vertices)?,
        };
        let finite = [rect.x0, rect.y0, rect.x1, rect.y1].iter().all(|v| v.is_finite());
        if !finite || (rect.width() == 0.0 && rect.height() == 0.0) {
            return None;
        }
        Some(rect)
    }

    /// Text content, for text and sticky objects.
    pub fn text(&self) -> Option<&TextContent> {
        match self {
            Geometry::Text { text, .. } | Geometry::Sticky { text, .. } => Some(text),
            _ => None,
        }
    }
}

fn points_extent(points: &[Point]) -> Option<Rect> {
    let (first, rest) = points.split_first()?;
    Some(rest.iter().fold(Rect::from_points(*first, *first), |acc, p| acc.union_pt(*p)))
}

/// A drawable object in runtime form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub id: ObjectId,
    /// Position in parent-local coordinates.
    pub position: Point,
    /// Rotation in degrees.
    pub rotation: f64,
    /// Rotation/scale origin as fractions (0-1) of the object's own box.
    pub pivot: Point,
    pub locked: bool,
    /// Set when a freehand stroke was auto-converted to a recognised shape.
    pub snapped: bool,
    pub visible: bool,
    pub parent: Option<ContainerId>,
    /// View this object belongs to, if any.
    pub view: Option<ViewId>,
    pub style: ObjectStyle,
    pub geometry: Geometry,
    #[serde(skip)]
    pub extensions: Extensions,
}

impl Object {
    pub const DEFAULT_PIVOT: Point = Point::new(0.5, 0.5);

    /// Create an object with every optional field at its default.
    pub fn new(id: ObjectId, position: Point, geometry: Geometry) -> Self {
        Self {
            id,
            position,
            rotation: 0.0,
            pivot: Self::DEFAULT_PIVOT,
            locked: false,
            snapped: false,
            visible: true,
            parent: None,
            view: None,
            style: ObjectStyle::default(),
            geometry,
            extensions: Extensions::new(),
        }
    }

    pub fn rectangle(id: ObjectId, position: Point, width: f64, height: f64) -> Self {
        Self::new(id, position, Geometry::Rectangle { width, height })
    }

    pub fn with_parent(mut self, parent: ContainerId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_view(mut self, view: ViewId) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_rotation(mut self, degrees: f64) -> Self {
        self.rotation = degrees;
        self
    }

    pub fn with_style(mut self, style: ObjectStyle) -> Self {
        self.style = style;
        self
    }

    /// Local bounding box relative to `position`.
    pub fn extent(&self) -> Option<Rect> {
        self.geometry.extent()
    }

    /// The pivot in parent-local coordinates.
    pub fn pivot_point(&self) -> Option<Point> {
        let extent = self.extent()?;
        Some(Point::new(
            self.position.x + extent.x0 + extent.width() * self.pivot.x,
            self.position.y + extent.y0 + extent.height() * self.pivot.y,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> ObjectId {
        ObjectId::new("obj")
    }

    #[test]
    fn test_hex_roundtrip() {
        let opaque = SerializableColor::new(255, 0, 128, 255);
        assert_eq!(opaque.to_hex(), "#ff0080");
        assert_eq!(SerializableColor::from_hex("#ff0080"), Some(opaque));

        let translucent = SerializableColor::new(1, 2, 3, 4);
        assert_eq!(translucent.to_hex(), "#01020304");
        assert_eq!(SerializableColor::from_hex(&translucent.to_hex()), Some(translucent));

        assert_eq!(SerializableColor::from_hex("#fff"), Some(SerializableColor::white()));
        assert_eq!(SerializableColor::from_hex("red"), None);
        assert_eq!(SerializableColor::from_hex("#12345"), None);
    }

    #[test]
    fn test_peniko_conversion() {
        let color = SerializableColor::new(10, 20, 30, 40);
        let peniko: Color = color.into();
        assert_eq!(SerializableColor::from(peniko), color);
    }

    #[test]
    fn test_rect_extent_normalizes_negative_size() {
        let geometry = Geometry::Rectangle { width: -10.0, height: 5.0 };
        let extent = geometry.extent().expect("extent");
        assert!((extent.x0 + 10.0).abs() < f64::EPSILON);
        assert!((extent.width() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_points_extent() {
        let geometry = Geometry::Freehand {
            points: vec![Point::new(5.0, 5.0), Point::new(-5.0, 10.0), Point::new(0.0, 0.0)],
        };
        let extent = geometry.extent().expect("extent");
        assert_eq!(extent, Rect::new(-5.0, 0.0, 5.0, 10.0));
    }

    #[test]
    fn test_empty_or_degenerate_extent_is_none() {
        assert!(Geometry::Freehand { points: vec![] }.extent().is_none());
        assert!(Geometry::Polygon { vertices: vec![Point::new(1.0, 1.0)] }.extent().is_none());
        assert!(Geometry::Rectangle { width: 0.0, height: 0.0 }.extent().is_none());
        assert!(Geometry::Rectangle { width: f64::NAN, height: 1.0 }.extent().is_none());
    }

    #[test]
    fn test_horizontal_line_keeps_extent() {
        let geometry = Geometry::Line { start: Point::new(0.0, 0.0), end: Point::new(10.0, 0.0) };
        let extent = geometry.extent().expect("line extent");
        assert!((extent.width() - 10.0).abs() < f64::EPSILON);
        assert!(extent.height().abs() < f64::EPSILON);
    }

    #[test]
    fn test_pivot_point() {
        let obj = Object::rectangle(id(), Point::new(10.0, 20.0), 100.0, 50.0);
        let pivot = obj.pivot_point().expect("pivot");
        assert!((pivot.x - 60.0).abs() < f64::EPSILON);
        assert!((pivot.y - 45.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_opacity_applied() {
        let style = ObjectStyle { opacity: 0.5, ..ObjectStyle::default() };
        assert_eq!(style.stroke_with_opacity().to_rgba8().a, 127);
        assert!(style.fill_with_opacity().is_none());
    }
}
