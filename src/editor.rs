//! The editor shell: owns one surface, its history and the toolbar state,
//! and is the only thing the host application talks to.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use egui::{Color32, Pos2, Vec2};
use log::{debug, error, info, warn};

use crate::error::{EditorError, EditorResult, ImageLoadError};
use crate::event::{EditorEvent, EventBus, EventHandler, SurfaceChange};
use crate::history::{SnapshotHistory, HISTORY_CAPACITY};
use crate::loader::{ImageFetcher, ImageLoader, ImageSource, LoadPoll, LocalFetcher, DEFAULT_LOAD_TIMEOUT};
use crate::raster::{ExportFormat, Rasterizer};
use crate::shape::{ShapeId, ShapePatch};
use crate::surface::{Snapshot, Surface};
use crate::tool::{Draft, EditorConfig, ToolController, ToolKind, ToolOutcome};

/// Prefix given to downloaded files.
pub const DOWNLOAD_PREFIX: &str = "edited-";

/// Fixed settings of an editor instance.
#[derive(Debug, Clone)]
pub struct EditorOptions {
    pub surface_size: Vec2,
    /// Gap kept between the background image and the surface edge.
    pub padding: f32,
    pub load_timeout: Duration,
    pub history_capacity: usize,
    pub output_dir: PathBuf,
    /// TrueType/OpenType data for text rasterization; `None` uses the bundled font.
    pub font: Option<Vec<u8>>,
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            surface_size: Vec2::new(800.0, 600.0),
            padding: 20.0,
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            history_capacity: HISTORY_CAPACITY,
            output_dir: PathBuf::from("."),
            font: None,
        }
    }
}

/// Callbacks into the surrounding application.
pub trait EditorHost {
    /// Receives the rasterized PNG when the user commits their changes.
    fn on_save(&mut self, image: Vec<u8>);

    fn on_download(&mut self, _path: &Path) {}

    /// The user dismissed the editor.
    fn on_close(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorStatus {
    Closed,
    Loading { source: String },
    Ready,
    /// The background failed to load; the surface is still usable.
    LoadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A dismissible message shown inside the editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl EditorNotice {
    fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug)]
pub struct AnnotationEditor {
    options: EditorOptions,
    config: EditorConfig,
    surface: Option<Surface>,
    history: SnapshotHistory,
    tools: ToolController,
    loader: ImageLoader,
    rasterizer: Rasterizer,
    source: Option<ImageSource>,
    status: EditorStatus,
    notice: Option<EditorNotice>,
    events: EventBus,
}

impl Default for AnnotationEditor {
    fn default() -> Self {
        Self::new(EditorOptions::default())
    }
}

impl AnnotationEditor {
    pub fn new(options: EditorOptions) -> Self {
        Self::with_fetcher(options, Arc::new(LocalFetcher))
    }

    pub fn with_fetcher(options: EditorOptions, fetcher: Arc<dyn ImageFetcher>) -> Self {
        let rasterizer = match options.font.clone() {
            Some(bytes) => Rasterizer::with_font_bytes(bytes),
            None => Rasterizer::with_default_font(),
        };
        Self {
            loader: ImageLoader::new(fetcher, options.load_timeout),
            history: SnapshotHistory::with_capacity(options.history_capacity),
            options,
            config: EditorConfig::default(),
            surface: None,
            tools: ToolController::new(),
            rasterizer,
            source: None,
            status: EditorStatus::Closed,
            notice: None,
            events: EventBus::new(),
        }
    }

    pub fn subscribe(&self, handler: Box<dyn EventHandler>) {
        self.events.subscribe(handler);
    }

    pub fn options(&self) -> &EditorOptions {
        &self.options
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn history(&self) -> &SnapshotHistory {
        &self.history
    }

    pub fn status(&self) -> &EditorStatus {
        &self.status
    }

    pub fn notice(&self) -> Option<&EditorNotice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    pub fn source(&self) -> Option<&ImageSource> {
        self.source.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.surface.is_some()
    }

    /// A background load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loader.is_loading()
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.tools.draft()
    }

    pub fn tool_state_name(&self) -> &'static str {
        self.tools.current_state_name()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ---- lifecycle ----

    /// Starts a fresh session on `source`: empty surface, empty history, and a
    /// background load in flight. Any earlier load is invalidated.
    pub fn open(&mut self, source: ImageSource) {
        self.open_at(source, Instant::now());
    }

    pub fn open_at(&mut self, source: ImageSource, now: Instant) {
        let name = source.display_name();
        let mut surface = Surface::new(self.options.surface_size, self.options.padding);
        surface.set_selection_enabled(self.config.active_tool == ToolKind::Select);

        self.surface = Some(surface);
        self.history.clear();
        self.tools.cancel();
        self.notice = None;
        self.source = Some(source.clone());

        match self.loader.start_at(source, now) {
            Ok(_) => {
                self.status = EditorStatus::Loading { source: name.clone() };
                self.events.emit(EditorEvent::LoadStarted { source: name });
            }
            Err(err) => self.fail_load(name, err),
        }
    }

    /// Applies a finished background load. Call once per frame.
    /// Returns true when something visible changed.
    pub fn poll(&mut self) -> bool {
        self.poll_at(Instant::now())
    }

    pub fn poll_at(&mut self, now: Instant) -> bool {
        match self.loader.poll_at(now) {
            LoadPoll::Idle | LoadPoll::Pending => false,
            LoadPoll::Ready(loaded) => {
                let Some(surface) = self.surface.as_mut() else {
                    warn!("Image finished loading after the editor closed");
                    return false;
                };
                let name = loaded.source.display_name();
                let placement = surface.load_background(name.clone(), loaded.image);
                info!("Background {name} ready at scale {:.3}", placement.scale);

                self.status = EditorStatus::Ready;
                self.events.emit(EditorEvent::BackgroundLoaded {
                    source: name,
                    scale: placement.scale,
                });
                // Baseline so the first annotation can be undone.
                self.capture();
                true
            }
            LoadPoll::Failed { source, error } => {
                self.fail_load(source.display_name(), error);
                true
            }
        }
    }

    fn fail_load(&mut self, source: String, err: ImageLoadError) {
        self.status = EditorStatus::LoadFailed;
        self.notice = Some(EditorNotice::error(format!("Could not load image: {err}")));
        self.events.emit(EditorEvent::ImageLoadFailed {
            source,
            reason: err.to_string(),
        });
    }

    /// Throws away the session without saving.
    pub fn close(&mut self, host: &mut dyn EditorHost) {
        self.loader.cancel();
        self.tools.cancel();
        self.surface = None;
        self.history.clear();
        self.source = None;
        self.notice = None;
        self.status = EditorStatus::Closed;
        self.events.emit(EditorEvent::Closed);
        host.on_close();
    }

    // ---- toolbar ----

    pub fn select_tool(&mut self, tool: ToolKind) {
        let old = self.config.active_tool;
        if old == tool {
            return;
        }
        self.config.active_tool = tool;
        self.tools.cancel();
        if let Some(surface) = self.surface.as_mut() {
            surface.set_selection_enabled(tool == ToolKind::Select);
        }
        self.events.emit(EditorEvent::ToolChanged { old, new: tool });
    }

    pub fn set_color(&mut self, color: Color32) {
        self.config.color = color;
    }

    pub fn set_stroke_width(&mut self, width: u8) {
        self.config.set_stroke_width(width);
    }

    /// Replaces the whole toolbar state, e.g. when restoring persisted settings.
    pub fn apply_config(&mut self, config: EditorConfig) {
        let tool = config.active_tool;
        let current = self.config.active_tool;
        self.config = config;
        self.config.active_tool = current;
        self.select_tool(tool);
    }

    // ---- pointer input ----

    /// Returns true when the canvas needs a repaint.
    pub fn pointer_down(&mut self, pos: Pos2) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let outcome = self.tools.pointer_down(pos, &self.config, surface);
        self.handle_outcome(outcome)
    }

    pub fn pointer_move(&mut self, pos: Pos2) -> bool {
        if self.surface.is_none() {
            return false;
        }
        let outcome = self.tools.pointer_move(pos);
        self.handle_outcome(outcome)
    }

    pub fn pointer_up(&mut self, pos: Pos2) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        let outcome = self.tools.pointer_up(pos, surface);
        self.handle_outcome(outcome)
    }

    /// Abandons an in-progress drag.
    pub fn cancel_gesture(&mut self) -> bool {
        let was_active = self.tools.draft().is_some();
        self.tools.cancel();
        was_active
    }

    fn handle_outcome(&mut self, outcome: ToolOutcome) -> bool {
        match outcome {
            ToolOutcome::Ignored => false,
            ToolOutcome::Preview => true,
            ToolOutcome::Selected(id) => {
                self.events.emit(EditorEvent::SelectionChanged(id));
                true
            }
            ToolOutcome::Committed(change) => {
                self.record(change);
                true
            }
        }
    }

    // ---- structural edits outside the tools ----

    pub fn delete_selected(&mut self) -> EditorResult<bool> {
        let surface = self.surface.as_mut().ok_or(EditorError::Closed)?;
        let Some(id) = surface.selected() else {
            return Ok(false);
        };
        let change = surface.remove_shape(id)?;
        self.record(change);
        Ok(true)
    }

    pub fn edit_text(&mut self, id: ShapeId, body: impl Into<String>) -> EditorResult<()> {
        self.mutate_shape(id, ShapePatch::TextBody(body.into()))
    }

    pub fn mutate_shape(&mut self, id: ShapeId, patch: ShapePatch) -> EditorResult<()> {
        let surface = self.surface.as_mut().ok_or(EditorError::Closed)?;
        let change = surface.mutate_shape(id, patch)?;
        self.record(change);
        Ok(())
    }

    fn record(&mut self, change: SurfaceChange) {
        debug!("Recording change to shape {}", change.shape_id());
        self.events.emit(EditorEvent::SurfaceChanged(change));
        self.capture();
    }

    fn capture(&mut self) {
        let Some(surface) = self.surface.as_ref() else {
            return;
        };
        match surface.serialize() {
            Ok(snapshot) => {
                self.history.capture(snapshot);
                self.emit_history();
            }
            Err(err) => error!("Could not snapshot surface: {err}"),
        }
    }

    fn emit_history(&self) {
        self.events.emit(EditorEvent::HistoryChanged {
            index: self.history.index(),
            len: self.history.len(),
        });
    }

    // ---- undo / redo ----

    /// Returns true if the surface changed. Nothing to undo is a silent no-op.
    pub fn undo(&mut self) -> bool {
        if self.surface.is_none() {
            return false;
        }
        self.tools.cancel();
        let Some(snapshot) = self.history.undo() else {
            return false;
        };
        let restored = self.restore(&snapshot);
        if !restored {
            // Keep the cursor on the entry that is still displayed.
            self.history.redo();
        }
        restored
    }

    pub fn redo(&mut self) -> bool {
        if self.surface.is_none() {
            return false;
        }
        self.tools.cancel();
        let Some(snapshot) = self.history.redo() else {
            return false;
        };
        let restored = self.restore(&snapshot);
        if !restored {
            self.history.undo();
        }
        restored
    }

    fn restore(&mut self, snapshot: &Snapshot) -> bool {
        let Some(surface) = self.surface.as_mut() else {
            return false;
        };
        if let Err(err) = surface.restore(snapshot) {
            error!("Failed to restore snapshot: {err}");
            self.notice = Some(EditorNotice::error(format!("Could not restore history: {err}")));
            return false;
        }
        debug!("Restored history entry {:?}", self.history.index());
        self.emit_history();
        true
    }

    // ---- output ----

    pub fn rasterize(&self, format: ExportFormat) -> EditorResult<Vec<u8>> {
        let surface = self.surface.as_ref().ok_or(EditorError::Closed)?;
        Ok(surface.rasterize(&self.rasterizer, format)?)
    }

    /// Rasterizes to PNG and hands the bytes to the host. On failure the
    /// surface is untouched and an error notice is shown, so saving can be retried.
    pub fn save(&mut self, host: &mut dyn EditorHost) -> EditorResult<()> {
        let bytes = self.rasterize_or_notice()?;
        info!("Saving annotated image ({} bytes)", bytes.len());
        self.events.emit(EditorEvent::Saved { bytes: bytes.len() });
        host.on_save(bytes);
        Ok(())
    }

    /// Writes the PNG to `edited-<name>.png` in the output directory.
    pub fn download(&mut self, host: &mut dyn EditorHost) -> EditorResult<PathBuf> {
        let bytes = self.rasterize_or_notice()?;
        let path = self.options.output_dir.join(self.download_file_name());

        if let Err(err) = std::fs::write(&path, &bytes) {
            let err = EditorError::Rasterization(err.into());
            self.notice = Some(EditorNotice::error(format!("Download failed: {err}")));
            return Err(err);
        }

        info!("Downloaded annotated image to {}", path.display());
        self.notice = Some(EditorNotice::info(format!("Saved to {}", path.display())));
        self.events.emit(EditorEvent::Downloaded { path: path.clone() });
        host.on_download(&path);
        Ok(path)
    }

    pub fn download_file_name(&self) -> String {
        let stem = self
            .source
            .as_ref()
            .map(ImageSource::file_stem)
            .unwrap_or_else(|| "image".to_owned());
        format!("{DOWNLOAD_PREFIX}{stem}.{}", ExportFormat::Png.extension())
    }

    fn rasterize_or_notice(&mut self) -> EditorResult<Vec<u8>> {
        self.rasterize(ExportFormat::Png).inspect_err(|err| {
            error!("Rasterization failed: {err}");
            self.notice = Some(EditorNotice::error(format!("Could not export image: {err}")));
        })
    }
}
