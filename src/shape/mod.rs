use egui::{Color32, Pos2, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod arrow;
mod common;

pub use arrow::{ArrowHead, ARROW_HEAD_ANGLE_DEG, ARROW_HEAD_LENGTH};
pub use common::{calculate_bounds, distance_to_line_segment, HIT_TOLERANCE};

use crate::error::SurfaceError;
use common::{distance_to_polyline, GLYPH_WIDTH_FACTOR, LINE_HEIGHT_FACTOR};

/// Stable identity of a shape across snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShapeId(Uuid);

impl ShapeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ShapeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ShapeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outline color and width, captured once when a shape is started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub color: Color32,
    pub width: f32,
}

impl StrokeStyle {
    pub fn new(color: Color32, width: f32) -> Self {
        Self { color, width }
    }
}

/// An editable text annotation anchored at its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLabel {
    pub position: Pos2,
    pub body: String,
    pub font_size: f32,
    pub font_family: String,
}

impl TextLabel {
    /// Approximate layout box; exact metrics are only known to the rasterizer.
    pub fn bounds(&self) -> Rect {
        let lines: Vec<&str> = self.body.split('\n').collect();
        let widest = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0).max(1);
        let size = Vec2::new(
            widest as f32 * self.font_size * GLYPH_WIDTH_FACTOR,
            lines.len() as f32 * self.font_size * LINE_HEIGHT_FACTOR,
        );
        Rect::from_min_size(self.position, size)
    }
}

/// Geometry of a shape, one variant per annotation kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeKind {
    /// Freehand polyline, extended point by point while drawing.
    Path { points: Vec<Pos2> },
    Arrow { start: Pos2, end: Pos2 },
    /// Always normalized so `rect.min` is the top-left corner.
    Rectangle { rect: Rect },
    Circle { center: Pos2, radius: f32 },
    Text(TextLabel),
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Path { .. } => "path",
            ShapeKind::Arrow { .. } => "arrow",
            ShapeKind::Rectangle { .. } => "rectangle",
            ShapeKind::Circle { .. } => "circle",
            ShapeKind::Text(_) => "text",
        }
    }

    /// Whether the geometry has any visible extent worth committing.
    pub fn is_degenerate(&self) -> bool {
        match self {
            ShapeKind::Path { points } => points.len() < 2,
            ShapeKind::Arrow { start, end } => start == end,
            ShapeKind::Rectangle { rect } => rect.width() <= 0.0 || rect.height() <= 0.0,
            ShapeKind::Circle { radius, .. } => *radius <= 0.0,
            ShapeKind::Text(label) => label.body.is_empty(),
        }
    }

    /// Bounding rectangle of the geometry, padded by `half_width` for outlines.
    pub fn bounds(&self, half_width: f32) -> Rect {
        match self {
            ShapeKind::Path { points } => calculate_bounds(points, half_width),
            ShapeKind::Arrow { start, end } => {
                let mut points = vec![*start, *end];
                if let Some(head) = ArrowHead::from_shaft(*start, *end) {
                    points.extend([head.left, head.right]);
                }
                calculate_bounds(&points, half_width)
            }
            ShapeKind::Rectangle { rect } => rect.expand(half_width),
            ShapeKind::Circle { center, radius } => {
                Rect::from_center_size(*center, Vec2::splat(2.0 * radius)).expand(half_width)
            }
            ShapeKind::Text(label) => label.bounds(),
        }
    }

    fn translate(&mut self, delta: Vec2) {
        match self {
            ShapeKind::Path { points } => {
                for point in points {
                    *point += delta;
                }
            }
            ShapeKind::Arrow { start, end } => {
                *start += delta;
                *end += delta;
            }
            ShapeKind::Rectangle { rect } => *rect = rect.translate(delta),
            ShapeKind::Circle { center, .. } => *center += delta,
            ShapeKind::Text(label) => label.position += delta,
        }
    }
}

/// Structural change applied to an existing shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapePatch {
    Translate(Vec2),
    Style(StrokeStyle),
    /// Only valid for text shapes.
    TextBody(String),
    /// Replace the geometry; the kind must stay the same.
    Geometry(ShapeKind),
}

/// One annotation on the surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    id: ShapeId,
    style: StrokeStyle,
    kind: ShapeKind,
}

impl Shape {
    pub fn new(kind: ShapeKind, style: StrokeStyle) -> Self {
        Self {
            id: ShapeId::new(),
            style,
            kind,
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn bounds(&self) -> Rect {
        self.kind.bounds(self.style.width / 2.0)
    }

    /// Test whether `pos` lands on the shape's visible outline (or inside a text box).
    pub fn hit_test(&self, pos: Pos2) -> bool {
        let reach = self.style.width / 2.0 + HIT_TOLERANCE;
        match &self.kind {
            ShapeKind::Path { points } => distance_to_polyline(pos, points) <= reach,
            ShapeKind::Arrow { start, end } => {
                if distance_to_line_segment(pos, *start, *end) <= reach {
                    return true;
                }
                ArrowHead::from_shaft(*start, *end).is_some_and(|head| {
                    head.segments()
                        .iter()
                        .any(|(a, b)| distance_to_line_segment(pos, *a, *b) <= reach)
                })
            }
            ShapeKind::Rectangle { rect } => {
                let corners = [
                    rect.left_top(),
                    rect.right_top(),
                    rect.right_bottom(),
                    rect.left_bottom(),
                    rect.left_top(),
                ];
                distance_to_polyline(pos, &corners) <= reach
            }
            ShapeKind::Circle { center, radius } => (pos.distance(*center) - radius).abs() <= reach,
            ShapeKind::Text(label) => label.bounds().expand(HIT_TOLERANCE).contains(pos),
        }
    }

    pub fn apply(&mut self, patch: ShapePatch) -> Result<(), SurfaceError> {
        match patch {
            ShapePatch::Translate(delta) => self.kind.translate(delta),
            ShapePatch::Style(style) => self.style = style,
            ShapePatch::TextBody(body) => match &mut self.kind {
                ShapeKind::Text(label) => label.body = body,
                other => {
                    return Err(SurfaceError::PatchMismatch {
                        id: self.id,
                        expected: other.name(),
                        found: "text",
                    });
                }
            },
            ShapePatch::Geometry(kind) => {
                if std::mem::discriminant(&kind) != std::mem::discriminant(&self.kind) {
                    return Err(SurfaceError::PatchMismatch {
                        id: self.id,
                        expected: self.kind.name(),
                        found: kind.name(),
                    });
                }
                self.kind = kind;
            }
        }
        Ok(())
    }
}

/// Factory functions for creating shapes
pub mod factory {
    use super::*;

    pub fn create_path(points: Vec<Pos2>, style: StrokeStyle) -> Shape {
        Shape::new(ShapeKind::Path { points }, style)
    }

    pub fn create_arrow(start: Pos2, end: Pos2, style: StrokeStyle) -> Shape {
        Shape::new(ShapeKind::Arrow { start, end }, style)
    }

    /// Corners may be given in any order.
    pub fn create_rectangle(a: Pos2, b: Pos2, style: StrokeStyle) -> Shape {
        Shape::new(ShapeKind::Rectangle { rect: Rect::from_two_pos(a, b) }, style)
    }

    pub fn create_circle(center: Pos2, radius: f32, style: StrokeStyle) -> Shape {
        Shape::new(ShapeKind::Circle { center, radius }, style)
    }

    pub fn create_text(
        position: Pos2,
        body: impl Into<String>,
        font_size: f32,
        font_family: impl Into<String>,
        style: StrokeStyle,
    ) -> Shape {
        Shape::new(
            ShapeKind::Text(TextLabel {
                position,
                body: body.into(),
                font_size,
                font_family: font_family.into(),
            }),
            style,
        )
    }
}
