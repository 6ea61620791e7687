#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod components;
pub mod editor;
pub mod error;
pub mod event;
pub mod file_handler;
pub mod history;
pub mod input;
pub mod loader;
pub mod panels;
pub mod raster;
pub mod renderer;
pub mod shape;
pub mod surface;
pub mod texture_manager;
pub mod tool;

pub use app::AnnotateApp;
pub use editor::{AnnotationEditor, EditorHost, EditorOptions, EditorStatus};
pub use error::{EditorError, EditorResult, ImageLoadError, RasterizationError, SurfaceError};
pub use event::{EditorEvent, EventHandler, SurfaceChange};
pub use history::{SnapshotHistory, HISTORY_CAPACITY};
pub use loader::{ImageFetcher, ImageSource};
pub use raster::{ExportFormat, Rasterizer};
pub use renderer::CanvasRenderer;
pub use shape::{Shape, ShapeId, ShapeKind, ShapePatch, StrokeStyle};
pub use surface::{Snapshot, Surface};
pub use tool::{EditorConfig, ToolKind};
