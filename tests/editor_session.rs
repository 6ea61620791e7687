use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use eframe_annotate::editor::{EditorStatus, NoticeLevel};
use eframe_annotate::event::EventRecorder;
use eframe_annotate::loader::LocalFetcher;
use eframe_annotate::shape::ShapeKind;
use eframe_annotate::{
    AnnotationEditor, EditorEvent, EditorHost, EditorOptions, ImageFetcher, ImageLoadError, ImageSource, ToolKind,
};
use egui::{Pos2, Vec2};
use image::{ImageFormat, Rgba, RgbaImage};

fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba([30, 120, 200, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

fn wait_until_settled(editor: &mut AnnotationEditor) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while matches!(editor.status(), EditorStatus::Loading { .. }) {
        assert!(Instant::now() < deadline, "image never finished loading");
        editor.poll();
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn ready_editor(name: &str) -> AnnotationEditor {
    let mut editor = AnnotationEditor::new(EditorOptions::default());
    editor.open(ImageSource::from_bytes(name, png_bytes(400, 300)));
    wait_until_settled(&mut editor);
    assert_eq!(editor.status(), &EditorStatus::Ready);
    editor
}

fn drag(editor: &mut AnnotationEditor, from: Pos2, to: Pos2) {
    editor.pointer_down(from);
    let steps = 5;
    for i in 1..=steps {
        editor.pointer_move(from + (to - from) * (i as f32 / steps as f32));
    }
    editor.pointer_up(to);
}

#[derive(Default)]
struct RecordingHost {
    saved: Vec<Vec<u8>>,
    downloads: Vec<PathBuf>,
    closed: bool,
}

impl EditorHost for RecordingHost {
    fn on_save(&mut self, image: Vec<u8>) {
        self.saved.push(image);
    }

    fn on_download(&mut self, path: &Path) {
        self.downloads.push(path.to_owned());
    }

    fn on_close(&mut self) {
        self.closed = true;
    }
}

/// Serves sources named `slow*` only after the test opens the gate.
struct GatedFetcher {
    gate: Mutex<Receiver<()>>,
}

impl GatedFetcher {
    fn new() -> (Arc<Self>, Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        (
            Arc::new(Self {
                gate: Mutex::new(receiver),
            }),
            sender,
        )
    }
}

impl ImageFetcher for GatedFetcher {
    fn fetch(&self, source: &ImageSource) -> Result<Vec<u8>, ImageLoadError> {
        if source.display_name().starts_with("slow") {
            let gate = self.gate.lock().unwrap();
            let _ = gate.recv();
        }
        LocalFetcher.fetch(source)
    }
}

#[test]
fn test_baseline_snapshot_after_load() {
    let editor = ready_editor("roof.png");
    assert_eq!(editor.history().len(), 1);
    assert!(!editor.can_undo());
    assert!(editor.surface().unwrap().background_pixels().is_some());
}

#[test]
fn test_freehand_stroke_is_one_history_entry() {
    let mut editor = ready_editor("roof.png");
    editor.select_tool(ToolKind::Freehand);

    editor.pointer_down(Pos2::new(10.0, 10.0));
    for i in 1..=30 {
        editor.pointer_move(Pos2::new(10.0 + i as f32 * 3.0, 10.0 + i as f32));
        assert!(editor.surface().unwrap().shapes().is_empty(), "draft must stay off the surface");
    }
    editor.pointer_up(Pos2::new(100.0, 40.0));

    let shapes = editor.surface().unwrap().shapes();
    assert_eq!(shapes.len(), 1);
    match shapes[0].kind() {
        ShapeKind::Path { points } => assert!(points.len() >= 30),
        other => panic!("expected a path, got {other:?}"),
    }
    assert_eq!(editor.history().len(), 2);

    assert!(editor.undo());
    assert!(editor.surface().unwrap().shapes().is_empty());
    assert!(editor.redo());
    assert_eq!(editor.surface().unwrap().shapes().len(), 1);
}

#[test]
fn test_select_mode_never_draws() {
    let mut editor = ready_editor("roof.png");
    drag(&mut editor, Pos2::new(50.0, 50.0), Pos2::new(150.0, 150.0));
    assert_eq!(editor.surface().unwrap().shapes().len(), 1);
    let entries = editor.history().len();

    editor.select_tool(ToolKind::Select);
    drag(&mut editor, Pos2::new(200.0, 200.0), Pos2::new(300.0, 250.0));

    assert_eq!(editor.surface().unwrap().shapes().len(), 1);
    assert_eq!(editor.history().len(), entries);
    assert!(editor.draft().is_none());
}

#[test]
fn test_switching_tools_toggles_selection() {
    let mut editor = ready_editor("roof.png");
    editor.select_tool(ToolKind::Rectangle);
    drag(&mut editor, Pos2::new(200.0, 200.0), Pos2::new(50.0, 50.0));

    editor.select_tool(ToolKind::Select);
    assert!(editor.surface().unwrap().selection_enabled());
    editor.pointer_down(Pos2::new(50.0, 120.0));
    editor.pointer_up(Pos2::new(50.0, 120.0));
    let selected = editor.surface().unwrap().selected();
    assert_eq!(selected, Some(editor.surface().unwrap().shapes()[0].id()));

    editor.select_tool(ToolKind::Arrow);
    assert!(!editor.surface().unwrap().selection_enabled());
    assert_eq!(editor.surface().unwrap().selected(), None);
}

#[test]
fn test_shapes_snapshot_the_style_at_creation() {
    let mut editor = ready_editor("roof.png");
    editor.select_tool(ToolKind::Circle);
    editor.set_color(egui::Color32::from_rgb(0, 200, 0));
    editor.set_stroke_width(42);
    drag(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(130.0, 140.0));

    editor.set_color(egui::Color32::from_rgb(0, 0, 255));
    editor.set_stroke_width(1);

    let shape = &editor.surface().unwrap().shapes()[0];
    assert_eq!(shape.style().color, egui::Color32::from_rgb(0, 200, 0));
    assert_eq!(shape.style().width, 10.0);
    match shape.kind() {
        ShapeKind::Circle { center, radius } => {
            assert_eq!(*center, Pos2::new(100.0, 100.0));
            assert!((radius - 50.0).abs() < 1e-3);
        }
        other => panic!("expected a circle, got {other:?}"),
    }
}

#[test]
fn test_text_placement_delete_and_edit() {
    let mut editor = ready_editor("roof.png");
    editor.select_tool(ToolKind::Text);
    editor.pointer_down(Pos2::new(60.0, 60.0));
    editor.pointer_up(Pos2::new(60.0, 60.0));

    let id = editor.surface().unwrap().selected().expect("new text becomes active");
    editor.edit_text(id, "Missing shingles").unwrap();
    match editor.surface().unwrap().shape(id).unwrap().kind() {
        ShapeKind::Text(label) => {
            assert_eq!(label.body, "Missing shingles");
            assert_eq!(label.font_size, 20.0);
            assert_eq!(label.font_family, "sans-serif");
        }
        other => panic!("expected text, got {other:?}"),
    }
    assert_eq!(editor.history().len(), 3);

    assert!(editor.delete_selected().unwrap());
    assert!(editor.surface().unwrap().shapes().is_empty());
    assert!(!editor.delete_selected().unwrap());

    assert!(editor.undo());
    assert_eq!(editor.surface().unwrap().shapes().len(), 1);
}

#[test]
fn test_new_edit_after_undo_clears_redo() {
    let mut editor = ready_editor("roof.png");
    editor.select_tool(ToolKind::Arrow);
    drag(&mut editor, Pos2::new(10.0, 10.0), Pos2::new(90.0, 10.0));
    drag(&mut editor, Pos2::new(10.0, 50.0), Pos2::new(90.0, 50.0));

    assert!(editor.undo());
    assert!(editor.can_redo());

    drag(&mut editor, Pos2::new(10.0, 90.0), Pos2::new(90.0, 90.0));
    assert!(!editor.can_redo());
    assert!(!editor.redo());
    assert_eq!(editor.surface().unwrap().shapes().len(), 2);
}

#[test]
fn test_stale_load_never_reaches_surface() {
    let (fetcher, gate) = GatedFetcher::new();
    let recorder = EventRecorder::new();
    let mut editor = AnnotationEditor::with_fetcher(EditorOptions::default(), fetcher);
    editor.subscribe(Box::new(recorder.clone()));

    editor.open(ImageSource::from_bytes("slow.png", png_bytes(64, 64)));
    editor.open(ImageSource::from_bytes("fast.png", png_bytes(32, 32)));
    wait_until_settled(&mut editor);
    assert_eq!(editor.status(), &EditorStatus::Ready);

    gate.send(()).unwrap();
    for _ in 0..20 {
        editor.poll();
        std::thread::sleep(Duration::from_millis(5));
    }

    let background = editor.surface().unwrap().background().unwrap();
    assert_eq!(background.source, "fast.png");
    assert_eq!(background.pixel_size, [32, 32]);
    assert_eq!(editor.history().len(), 1);

    let loaded: Vec<_> = recorder
        .events()
        .into_iter()
        .filter(|e| matches!(e, EditorEvent::BackgroundLoaded { .. }))
        .collect();
    assert_eq!(loaded.len(), 1);
}

#[test]
fn test_load_timeout_reports_error() {
    let (fetcher, gate) = GatedFetcher::new();
    let options = EditorOptions {
        load_timeout: Duration::from_secs(1),
        ..EditorOptions::default()
    };
    let mut editor = AnnotationEditor::with_fetcher(options, fetcher);

    let start = Instant::now();
    editor.open_at(ImageSource::from_bytes("slow.png", png_bytes(8, 8)), start);
    assert!(!editor.poll_at(start));
    assert!(editor.poll_at(start + Duration::from_secs(2)));

    assert_eq!(editor.status(), &EditorStatus::LoadFailed);
    let notice = editor.notice().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("timed out"));

    // The surface stays usable without a background.
    editor.select_tool(ToolKind::Rectangle);
    drag(&mut editor, Pos2::new(10.0, 10.0), Pos2::new(60.0, 60.0));
    assert_eq!(editor.surface().unwrap().shapes().len(), 1);

    gate.send(()).unwrap();
}

#[test]
fn test_undecodable_image_fails_load() {
    let mut editor = AnnotationEditor::new(EditorOptions::default());
    editor.open(ImageSource::from_bytes("notes.png", b"plain text".to_vec()));
    wait_until_settled(&mut editor);
    assert_eq!(editor.status(), &EditorStatus::LoadFailed);
    assert!(editor.surface().unwrap().background().is_none());
}

#[test]
fn test_save_hands_png_to_host() {
    let mut editor = ready_editor("roof.png");
    drag(&mut editor, Pos2::new(100.0, 100.0), Pos2::new(300.0, 300.0));
    let mut host = RecordingHost::default();

    editor.save(&mut host).unwrap();

    assert_eq!(host.saved.len(), 1);
    let decoded = image::load_from_memory(&host.saved[0]).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (800, 600));
    assert_eq!(image::guess_format(&host.saved[0]).unwrap(), ImageFormat::Png);
}

#[test]
fn test_download_uses_edited_prefix() {
    let dir = std::env::temp_dir().join(format!("annotate-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let options = EditorOptions {
        output_dir: dir.clone(),
        ..EditorOptions::default()
    };
    let mut editor = AnnotationEditor::new(options);
    editor.open(ImageSource::from_bytes("claims/kitchen.jpg", png_bytes(100, 80)));
    wait_until_settled(&mut editor);
    let mut host = RecordingHost::default();

    let path = editor.download(&mut host).unwrap();

    assert_eq!(path, dir.join("edited-kitchen.png"));
    assert!(path.exists());
    assert_eq!(host.downloads, vec![path.clone()]);
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn test_close_discards_session() {
    let mut editor = ready_editor("roof.png");
    drag(&mut editor, Pos2::new(10.0, 10.0), Pos2::new(60.0, 60.0));
    let mut host = RecordingHost::default();

    editor.close(&mut host);

    assert!(host.closed);
    assert!(host.saved.is_empty());
    assert!(!editor.is_open());
    assert!(editor.history().is_empty());
    assert!(!editor.undo());
    assert!(editor.save(&mut host).is_err());
}

#[test]
fn test_surface_size_is_configurable() {
    let options = EditorOptions {
        surface_size: Vec2::new(300.0, 200.0),
        ..EditorOptions::default()
    };
    let mut editor = AnnotationEditor::new(options);
    editor.open(ImageSource::from_bytes("wide.png", png_bytes(900, 100)));
    wait_until_settled(&mut editor);

    let bytes = editor.rasterize(eframe_annotate::ExportFormat::Jpeg).unwrap();
    let decoded = image::load_from_memory(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (300, 200));
}

#[test]
fn test_failed_export_keeps_session_intact() {
    let options = EditorOptions {
        surface_size: Vec2::ZERO,
        ..EditorOptions::default()
    };
    let mut editor = AnnotationEditor::new(options);
    editor.open(ImageSource::from_bytes("roof.png", png_bytes(40, 30)));
    wait_until_settled(&mut editor);
    editor.select_tool(ToolKind::Rectangle);
    drag(&mut editor, Pos2::new(10.0, 10.0), Pos2::new(60.0, 60.0));

    let shapes = editor.surface().unwrap().shapes().to_vec();
    let snapshot = editor.surface().unwrap().serialize().unwrap();
    let (index, len) = (editor.history().index(), editor.history().len());
    let mut host = RecordingHost::default();

    assert!(editor.save(&mut host).is_err());
    assert_eq!(editor.notice().unwrap().level, NoticeLevel::Error);
    assert!(editor.download(&mut host).is_err());

    assert!(host.saved.is_empty());
    assert!(host.downloads.is_empty());
    assert_eq!(editor.surface().unwrap().shapes(), shapes.as_slice());
    assert_eq!(editor.surface().unwrap().serialize().unwrap(), snapshot);
    assert_eq!((editor.history().index(), editor.history().len()), (index, len));
    assert!(editor.is_open());
}

#[test]
fn test_rectangle_drag_direction_does_not_matter() {
    let mut editor = ready_editor("roof.png");
    editor.select_tool(ToolKind::Rectangle);
    drag(&mut editor, Pos2::new(200.0, 200.0), Pos2::new(50.0, 50.0));
    drag(&mut editor, Pos2::new(50.0, 50.0), Pos2::new(200.0, 200.0));

    let shapes = editor.surface().unwrap().shapes();
    assert_eq!(shapes.len(), 2);
    assert_eq!(shapes[0].kind(), shapes[1].kind());
    match shapes[0].kind() {
        ShapeKind::Rectangle { rect } => {
            assert_eq!(rect.min, Pos2::new(50.0, 50.0));
            assert_eq!(rect.max, Pos2::new(200.0, 200.0));
        }
        other => panic!("expected a rectangle, got {other:?}"),
    }
}
