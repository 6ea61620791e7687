use egui::{Pos2, Rect};

/// Extra slack around thin shapes so they stay clickable.
pub const HIT_TOLERANCE: f32 = 4.0;

/// Rough advance of one glyph relative to the font size, used for text bounds
/// when no font metrics are available.
pub(crate) const GLYPH_WIDTH_FACTOR: f32 = 0.6;
pub(crate) const LINE_HEIGHT_FACTOR: f32 = 1.2;

/// Calculate distance from a point to a line segment
pub fn distance_to_line_segment(point: Pos2, line_start: Pos2, line_end: Pos2) -> f32 {
    let line_vec = line_end - line_start;
    let point_vec = point - line_start;

    let line_len = line_vec.length();
    if line_len == 0.0 {
        return point_vec.length();
    }

    let t = ((point_vec.x * line_vec.x + point_vec.y * line_vec.y) / line_len).clamp(0.0, line_len);
    let projection = line_start + (line_vec * t / line_len);
    (point - projection).length()
}

/// Calculate the bounding box for a set of points
pub fn calculate_bounds(points: &[Pos2], padding: f32) -> Rect {
    if points.is_empty() {
        return Rect::NOTHING;
    }

    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;

    for point in points {
        min_x = min_x.min(point.x);
        min_y = min_y.min(point.y);
        max_x = max_x.max(point.x);
        max_y = max_y.max(point.y);
    }

    Rect::from_min_max(
        Pos2::new(min_x - padding, min_y - padding),
        Pos2::new(max_x + padding, max_y + padding),
    )
}

/// Minimum distance from `point` to any segment of the polyline
pub(crate) fn distance_to_polyline(point: Pos2, points: &[Pos2]) -> f32 {
    match points {
        [] => f32::INFINITY,
        [single] => point.distance(*single),
        _ => points
            .windows(2)
            .map(|w| distance_to_line_segment(point, w[0], w[1]))
            .fold(f32::INFINITY, f32::min),
    }
}
