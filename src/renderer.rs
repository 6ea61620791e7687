// src/renderer.rs
use eframe::egui::{self, Align2, Color32, FontId, Painter, Pos2, Rect, Stroke, Vec2};

use crate::shape::{ArrowHead, ShapeKind, StrokeStyle, TextLabel};
use crate::surface::Surface;
use crate::texture_manager::TextureManager;
use crate::tool::Draft;

const CANVAS_COLOR: Color32 = Color32::WHITE;
const SELECTION_COLOR: Color32 = Color32::from_rgb(33, 150, 243);
const SELECTION_MARGIN: f32 = 4.0;

/// Maps a surface coordinate to screen space for a canvas whose top-left is `origin`.
pub fn to_screen(origin: Pos2, pos: Pos2) -> Pos2 {
    origin + pos.to_vec2()
}

/// Inverse of [`to_screen`].
pub fn to_surface(origin: Pos2, pos: Pos2) -> Pos2 {
    pos - origin.to_vec2()
}

/// Paints a [`Surface`] with egui shapes every frame.
#[derive(Debug, Default)]
pub struct CanvasRenderer {
    textures: TextureManager,
}

impl CanvasRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_frame(&mut self) {
        self.textures.begin_frame();
    }

    /// Drops cached textures, e.g. when the editor closes.
    pub fn clear(&mut self) {
        self.textures.clear();
    }

    /// Draws background, committed shapes, selection and the in-progress draft.
    pub fn render(
        &mut self,
        ctx: &egui::Context,
        painter: &Painter,
        origin: Pos2,
        surface: &Surface,
        draft: Option<&Draft>,
    ) {
        let canvas = Rect::from_min_size(origin, surface.size());
        let painter = painter.with_clip_rect(canvas);
        painter.rect_filled(canvas, 0.0, CANVAS_COLOR);

        if let (Some(placement), Some(pixels)) = (surface.background(), surface.background_pixels()) {
            let texture = self.textures.background_texture(ctx, pixels);
            let uv = Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0));
            painter.image(texture, placement.rect().translate(origin.to_vec2()), uv, Color32::WHITE);
        }

        for shape in surface.shapes() {
            paint_kind(&painter, origin, shape.kind(), shape.style());
        }

        if let Some(shape) = surface.selected().and_then(|id| surface.shape(id)) {
            let bounds = shape.bounds().translate(origin.to_vec2()).expand(SELECTION_MARGIN);
            painter.rect_stroke(bounds, 2.0, Stroke::new(1.5, SELECTION_COLOR));
        }

        if let Some(draft) = draft {
            paint_kind(&painter, origin, &draft.kind, &draft.style);
        }
    }
}

pub fn paint_kind(painter: &Painter, origin: Pos2, kind: &ShapeKind, style: &StrokeStyle) {
    let stroke = Stroke::new(style.width, style.color);
    let at = |pos: Pos2| to_screen(origin, pos);

    match kind {
        ShapeKind::Path { points } => match points.as_slice() {
            [] => {}
            [single] => {
                painter.circle_filled(at(*single), style.width / 2.0, style.color);
            }
            _ => {
                let points: Vec<Pos2> = points.iter().map(|p| at(*p)).collect();
                painter.add(egui::Shape::line(points, stroke));
            }
        },
        ShapeKind::Arrow { start, end } => {
            painter.line_segment([at(*start), at(*end)], stroke);
            if let Some(head) = ArrowHead::from_shaft(*start, *end) {
                for (a, b) in head.segments() {
                    painter.line_segment([at(a), at(b)], stroke);
                }
            }
        }
        ShapeKind::Rectangle { rect } => {
            painter.rect_stroke(rect.translate(origin.to_vec2()), 0.0, stroke);
        }
        ShapeKind::Circle { center, radius } => {
            painter.circle_stroke(at(*center), *radius, stroke);
        }
        ShapeKind::Text(label) => paint_text(painter, origin, label, style.color),
    }
}

fn paint_text(painter: &Painter, origin: Pos2, label: &TextLabel, color: Color32) {
    let font = match label.font_family.as_str() {
        "monospace" => FontId::monospace(label.font_size),
        _ => FontId::proportional(label.font_size),
    };
    painter.text(to_screen(origin, label.position), Align2::LEFT_TOP, &label.body, font, color);
}

/// Top-left of a surface of `size` centered inside `available`, never left of or above it.
pub fn centered_origin(available: Rect, size: Vec2) -> Pos2 {
    let slack = (available.size() - size).max(Vec2::ZERO);
    available.min + slack / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::factory;

    #[test]
    fn test_coordinate_mapping() {
        let origin = Pos2::new(120.0, 40.0);
        let pos = Pos2::new(10.0, 25.0);
        assert_eq!(to_screen(origin, pos), Pos2::new(130.0, 65.0));
        assert_eq!(to_surface(origin, to_screen(origin, pos)), pos);
    }

    #[test]
    fn test_centered_origin() {
        let available = Rect::from_min_size(Pos2::new(100.0, 0.0), Vec2::new(1000.0, 500.0));
        let origin = centered_origin(available, Vec2::new(800.0, 600.0));
        assert_eq!(origin, Pos2::new(200.0, 0.0));
    }

    #[test]
    fn test_render_basics() {
        let ctx = egui::Context::default();
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 300.0));
        let painter = Painter::new(ctx.clone(), egui::LayerId::background(), rect);

        let mut surface = Surface::new(rect.size(), 10.0);
        let style = StrokeStyle::new(Color32::RED, 3.0);
        surface.add_shape(factory::create_arrow(Pos2::new(10.0, 10.0), Pos2::new(90.0, 10.0), style));
        surface.add_shape(factory::create_circle(Pos2::new(50.0, 50.0), 20.0, style));

        let mut renderer = CanvasRenderer::new();
        renderer.begin_frame();
        renderer.render(&ctx, &painter, rect.min, &surface, None);
    }
}
