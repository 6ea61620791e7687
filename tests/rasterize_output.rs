use eframe_annotate::raster::CANVAS_FILL;
use eframe_annotate::shape::{factory, StrokeStyle};
use eframe_annotate::{Rasterizer, Surface};
use egui::{Color32, Pos2, Vec2};
use image::{Rgba, RgbaImage};

const ROOF: Rgba<u8> = Rgba([30, 120, 200, 255]);

fn close_to(pixel: &Rgba<u8>, expected: Rgba<u8>) -> bool {
    pixel.0.iter().zip(expected.0).all(|(a, b)| a.abs_diff(b) <= 2)
}

fn roof_surface() -> Surface {
    let mut surface = Surface::new(Vec2::new(800.0, 600.0), 20.0);
    surface.load_background("roof.png", RgbaImage::from_pixel(400, 300, ROOF));
    surface
}

#[test]
fn test_background_fills_its_placement_only() {
    let surface = roof_surface();
    let placement = surface.background().unwrap().rect();
    let canvas = Rasterizer::default().render(&surface).unwrap();

    let center = placement.center();
    assert!(close_to(canvas.get_pixel(center.x as u32, center.y as u32), ROOF));
    let inner = placement.shrink(2.0);
    assert!(close_to(canvas.get_pixel(inner.min.x as u32, inner.min.y as u32), ROOF));
    assert!(close_to(canvas.get_pixel(inner.max.x as u32, inner.max.y as u32), ROOF));

    // Padding either side of the letterboxed image.
    assert_eq!(*canvas.get_pixel(5, 300), CANVAS_FILL);
    assert_eq!(*canvas.get_pixel(795, 300), CANVAS_FILL);
}

#[test]
fn test_rectangle_outline_over_background() {
    let mut surface = roof_surface();
    surface.add_shape(factory::create_rectangle(
        Pos2::new(100.0, 100.0),
        Pos2::new(300.0, 250.0),
        StrokeStyle::new(Color32::from_rgb(255, 0, 0), 4.0),
    ));
    let canvas = Rasterizer::default().render(&surface).unwrap();

    assert_eq!(*canvas.get_pixel(200, 100), Rgba([255, 0, 0, 255]));
    assert_eq!(*canvas.get_pixel(100, 175), Rgba([255, 0, 0, 255]));
    assert!(close_to(canvas.get_pixel(200, 175), ROOF), "interior keeps the background");
}

#[test]
fn test_text_is_drawn() {
    let plain = roof_surface();
    let mut labelled = roof_surface();
    labelled.add_shape(factory::create_text(
        Pos2::new(300.0, 400.0),
        "Hail damage",
        20.0,
        "sans-serif",
        StrokeStyle::new(Color32::BLACK, 3.0),
    ));

    let rasterizer = Rasterizer::default();
    let before = rasterizer.render(&plain).unwrap();
    let after = rasterizer.render(&labelled).unwrap();

    let changed = before.pixels().zip(after.pixels()).filter(|(a, b)| a != b).count();
    assert!(changed > 20, "only {changed} pixels changed");
    assert_eq!(before.get_pixel(200, 200), after.get_pixel(200, 200));
}
