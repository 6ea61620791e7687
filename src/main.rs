#![warn(clippy::all, rust_2018_idioms)]

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use eframe_annotate::{AnnotateApp, EditorOptions, ImageSource};

/// Draw arrows, boxes, circles, text and freehand marks on top of an image.
#[derive(Parser, Debug)]
#[command(name = "annotate", version)]
struct Args {
    /// Image to open on startup: a path, or a file:// URL.
    image: Option<String>,

    /// Directory downloads are written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Also write the PNG produced by "Save" to this file.
    #[arg(long, value_name = "FILE")]
    save_to: Option<PathBuf>,

    /// Give up on loading the background after this many seconds.
    #[arg(long, default_value_t = 15, value_name = "SECONDS")]
    timeout_secs: u64,

    /// Number of undo steps kept.
    #[arg(long, default_value_t = eframe_annotate::HISTORY_CAPACITY)]
    history: usize,

    /// TrueType/OpenType font used for text in exported images.
    #[arg(long, value_name = "FILE")]
    font: Option<PathBuf>,
}

fn main() -> eframe::Result {
    env_logger::init(); // Log to stderr (if you run with `RUST_LOG=debug`).

    let args = Args::parse();

    let font = args.font.as_ref().and_then(|path| match std::fs::read(path) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            log::warn!("Ignoring font {}: {err}", path.display());
            None
        }
    });
    let options = EditorOptions {
        load_timeout: Duration::from_secs(args.timeout_secs.max(1)),
        history_capacity: args.history.max(1),
        output_dir: args.output_dir,
        font,
        ..EditorOptions::default()
    };
    let initial = args.image.as_deref().map(ImageSource::parse);
    let save_to = args.save_to;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([600.0, 400.0])
            .with_drag_and_drop(true)
            .with_title("Annotate"),
        ..Default::default()
    };
    eframe::run_native(
        "eframe_annotate",
        native_options,
        Box::new(|cc| Ok(Box::new(AnnotateApp::new(cc, options, initial, save_to)))),
    )
}
