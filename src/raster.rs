//! Flattens a surface (background plus shapes) into a single raster image.

use std::io::Cursor;

use ab_glyph::{point, Font, FontArc, PxScale, ScaleFont};
use egui::{Color32, Pos2};
use image::{imageops, DynamicImage, ImageFormat, Rgba, RgbaImage};
use log::{debug, warn};

use crate::error::RasterizationError;
use crate::shape::{distance_to_line_segment, ArrowHead, ShapeKind, StrokeStyle, TextLabel};
use crate::surface::Surface;

/// Canvas color behind the background image.
pub const CANVAS_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            ExportFormat::Png => ImageFormat::Png,
            ExportFormat::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Renders surfaces at their own resolution. Text needs a font; without one
/// text shapes are skipped.
#[derive(Clone)]
pub struct Rasterizer {
    proportional: Option<FontArc>,
    monospace: Option<FontArc>,
}

impl std::fmt::Debug for Rasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rasterizer")
            .field("proportional", &self.proportional.is_some())
            .field("monospace", &self.monospace.is_some())
            .finish()
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::with_default_font()
    }
}

fn bundled_font(name: &str, data: &'static [u8]) -> Option<FontArc> {
    FontArc::try_from_slice(data)
        .map_err(|err| warn!("Bundled {name} font unusable, its text will not be rasterized: {err}"))
        .ok()
}

impl Rasterizer {
    pub fn new(proportional: Option<FontArc>, monospace: Option<FontArc>) -> Self {
        Self {
            proportional,
            monospace,
        }
    }

    /// Uses the Ubuntu-Light and Hack faces bundled with egui, matching what the canvas shows.
    pub fn with_default_font() -> Self {
        Self {
            proportional: bundled_font("proportional", epaint_default_fonts::UBUNTU_LIGHT),
            monospace: bundled_font("monospace", epaint_default_fonts::HACK_REGULAR),
        }
    }

    /// Loads a TrueType/OpenType face from memory for proportional text,
    /// falling back to the bundled one. Monospace text keeps the bundled face.
    pub fn with_font_bytes(bytes: Vec<u8>) -> Self {
        let mut rasterizer = Self::with_default_font();
        match FontArc::try_from_vec(bytes) {
            Ok(font) => rasterizer.proportional = Some(font),
            Err(err) => warn!("Invalid font data ({err}); using bundled font"),
        }
        rasterizer
    }

    /// Face used for `family`; anything but "monospace" is proportional.
    fn font_for(&self, family: &str) -> Option<&FontArc> {
        match family {
            "monospace" => self.monospace.as_ref().or(self.proportional.as_ref()),
            _ => self.proportional.as_ref(),
        }
    }

    /// Draws the surface into an RGBA buffer of the surface's size.
    pub fn render(&self, surface: &Surface) -> Result<RgbaImage, RasterizationError> {
        let size = surface.size();
        let (width, height) = (size.x.round() as u32, size.y.round() as u32);
        if width == 0 || height == 0 {
            return Err(RasterizationError::EmptySurface);
        }

        let mut canvas = RgbaImage::from_pixel(width, height, CANVAS_FILL);

        if let (Some(placement), Some(pixels)) = (surface.background(), surface.background_pixels()) {
            let scaled = placement.scaled_size();
            let (w, h) = (scaled.x.round().max(1.0) as u32, scaled.y.round().max(1.0) as u32);
            let resized = imageops::resize(pixels.image.as_ref(), w, h, imageops::FilterType::Triangle);
            imageops::overlay(
                &mut canvas,
                &resized,
                placement.position.x.round() as i64,
                placement.position.y.round() as i64,
            );
        }

        for shape in surface.shapes() {
            self.draw_kind(&mut canvas, shape.kind(), shape.style());
        }

        debug!("Rasterized {} shapes at {width}x{height}", surface.shapes().len());
        Ok(canvas)
    }

    /// Renders and encodes the surface.
    pub fn encode(&self, surface: &Surface, format: ExportFormat) -> Result<Vec<u8>, RasterizationError> {
        let canvas = self.render(surface)?;
        let image = match format {
            ExportFormat::Png => DynamicImage::ImageRgba8(canvas),
            // JPEG has no alpha channel.
            ExportFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8()),
        };

        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), format.image_format())?;
        Ok(bytes)
    }

    pub fn draw_kind(&self, canvas: &mut RgbaImage, kind: &ShapeKind, style: &StrokeStyle) {
        let (color, width) = (style.color, style.width);
        match kind {
            ShapeKind::Path { points } => match points.as_slice() {
                [] => {}
                [single] => draw_segment(canvas, *single, *single, width, color),
                _ => {
                    for w in points.windows(2) {
                        draw_segment(canvas, w[0], w[1], width, color);
                    }
                }
            },
            ShapeKind::Arrow { start, end } => {
                draw_segment(canvas, *start, *end, width, color);
                if let Some(head) = ArrowHead::from_shaft(*start, *end) {
                    for (a, b) in head.segments() {
                        draw_segment(canvas, a, b, width, color);
                    }
                }
            }
            ShapeKind::Rectangle { rect } => {
                let corners = [rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()];
                for i in 0..corners.len() {
                    draw_segment(canvas, corners[i], corners[(i + 1) % corners.len()], width, color);
                }
            }
            ShapeKind::Circle { center, radius } => draw_ring(canvas, *center, *radius, width, color),
            ShapeKind::Text(label) => self.draw_text(canvas, label, color),
        }
    }

    fn draw_text(&self, canvas: &mut RgbaImage, label: &TextLabel, color: Color32) {
        let Some(font) = self.font_for(&label.font_family) else {
            warn!("No {} font available; skipping text \"{}\"", label.font_family, label.body);
            return;
        };

        let scaled = font.as_scaled(PxScale::from(label.font_size));
        let line_height = scaled.height() + scaled.line_gap();

        for (line_index, line) in label.body.split('\n').enumerate() {
            let baseline = label.position.y + scaled.ascent() + line_index as f32 * line_height;
            let mut caret = label.position.x;
            let mut previous = None;

            for ch in line.chars() {
                let glyph_id = scaled.glyph_id(ch);
                if let Some(prev) = previous {
                    caret += scaled.kern(prev, glyph_id);
                }
                let glyph = glyph_id.with_scale_and_position(scaled.scale(), point(caret, baseline));
                caret += scaled.h_advance(glyph_id);
                previous = Some(glyph_id);

                let Some(outlined) = font.outline_glyph(glyph) else {
                    continue;
                };
                let bounds = outlined.px_bounds();
                outlined.draw(|gx, gy, coverage| {
                    let x = bounds.min.x as i64 + i64::from(gx);
                    let y = bounds.min.y as i64 + i64::from(gy);
                    blend(canvas, x, y, color, coverage);
                });
            }
        }
    }
}

/// Thick anti-aliased line segment with round caps.
fn draw_segment(canvas: &mut RgbaImage, a: Pos2, b: Pos2, width: f32, color: Color32) {
    let half = width.max(1.0) / 2.0;
    let reach = half + 1.0;
    let (min_x, max_x) = (a.x.min(b.x) - reach, a.x.max(b.x) + reach);
    let (min_y, max_y) = (a.y.min(b.y) - reach, a.y.max(b.y) + reach);

    for_each_pixel(canvas, min_x, min_y, max_x, max_y, |canvas, x, y, center| {
        let distance = distance_to_line_segment(center, a, b);
        blend(canvas, x, y, color, coverage(half - distance));
    });
}

/// Circle outline of the given stroke width.
fn draw_ring(canvas: &mut RgbaImage, center: Pos2, radius: f32, width: f32, color: Color32) {
    let half = width.max(1.0) / 2.0;
    let reach = radius + half + 1.0;

    for_each_pixel(
        canvas,
        center.x - reach,
        center.y - reach,
        center.x + reach,
        center.y + reach,
        |canvas, x, y, pixel_center| {
            let distance = (pixel_center.distance(center) - radius).abs();
            blend(canvas, x, y, color, coverage(half - distance));
        },
    );
}

/// Coverage of a pixel whose center lies `inside` units within an edge.
fn coverage(inside: f32) -> f32 {
    (inside + 0.5).clamp(0.0, 1.0)
}

fn for_each_pixel(
    canvas: &mut RgbaImage,
    min_x: f32,
    min_y: f32,
    max_x: f32,
    max_y: f32,
    mut f: impl FnMut(&mut RgbaImage, i64, i64, Pos2),
) {
    let x0 = min_x.floor().max(0.0) as i64;
    let y0 = min_y.floor().max(0.0) as i64;
    let x1 = (max_x.ceil() as i64).min(i64::from(canvas.width()) - 1);
    let y1 = (max_y.ceil() as i64).min(i64::from(canvas.height()) - 1);

    for y in y0..=y1 {
        for x in x0..=x1 {
            f(canvas, x, y, Pos2::new(x as f32 + 0.5, y as f32 + 0.5));
        }
    }
}

/// Source-over blend of `color` at `coverage` onto one pixel. Out-of-bounds is ignored.
fn blend(canvas: &mut RgbaImage, x: i64, y: i64, color: Color32, coverage: f32) {
    if coverage <= 0.0 || x < 0 || y < 0 || x >= i64::from(canvas.width()) || y >= i64::from(canvas.height()) {
        return;
    }

    let [r, g, b, a] = color.to_srgba_unmultiplied();
    let alpha = (f32::from(a) / 255.0) * coverage.min(1.0);
    let dst = canvas.get_pixel_mut(x as u32, y as u32);

    for (channel, src) in dst.0.iter_mut().take(3).zip([r, g, b]) {
        let mixed = f32::from(src) * alpha + f32::from(*channel) * (1.0 - alpha);
        *channel = mixed.round().clamp(0.0, 255.0) as u8;
    }
    let dst_alpha = f32::from(dst.0[3]) / 255.0;
    dst.0[3] = ((alpha + dst_alpha * (1.0 - alpha)) * 255.0).round() as u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_ramps_across_the_edge() {
        assert_eq!(coverage(2.0), 1.0);
        assert_eq!(coverage(-2.0), 0.0);
        assert!((coverage(0.0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn blend_ignores_out_of_bounds() {
        let mut canvas = RgbaImage::from_pixel(2, 2, CANVAS_FILL);
        blend(&mut canvas, -1, 0, Color32::RED, 1.0);
        blend(&mut canvas, 0, 5, Color32::RED, 1.0);
        assert!(canvas.pixels().all(|p| *p == CANVAS_FILL));

        blend(&mut canvas, 1, 1, Color32::RED, 1.0);
        assert_eq!(*canvas.get_pixel(1, 1), Rgba([255, 0, 0, 255]));
    }

    /// Rightmost column touched by drawing `family` text.
    fn text_extent(rasterizer: &Rasterizer, family: &str) -> Option<u32> {
        let label = crate::shape::factory::create_text(Pos2::new(2.0, 2.0), "iiii", 20.0, family, StrokeStyle::new(Color32::BLACK, 1.0));
        let mut canvas = RgbaImage::from_pixel(200, 40, CANVAS_FILL);
        rasterizer.draw_kind(&mut canvas, label.kind(), label.style());
        canvas
            .enumerate_pixels()
            .filter(|(_, _, p)| **p != CANVAS_FILL)
            .map(|(x, _, _)| x)
            .max()
    }

    #[test]
    fn monospace_text_uses_the_monospace_face() {
        let rasterizer = Rasterizer::with_default_font();
        let proportional = text_extent(&rasterizer, "sans-serif").unwrap();
        let monospace = text_extent(&rasterizer, "monospace").unwrap();
        // Narrow glyphs get a full cell in a fixed-width face.
        assert!(monospace > proportional + 10, "monospace {monospace}, proportional {proportional}");
    }

    #[test]
    fn text_is_skipped_without_a_font() {
        assert_eq!(text_extent(&Rasterizer::new(None, None), "sans-serif"), None);
        assert!(text_extent(&Rasterizer::new(None, None), "monospace").is_none());
    }
}
