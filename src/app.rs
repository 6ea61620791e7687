use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::editor::{AnnotationEditor, EditorHost, EditorOptions};
use crate::event::LogEventHandler;
use crate::file_handler::FileHandler;
use crate::input::InputHandler;
use crate::loader::ImageSource;
use crate::panels::{self, ToolbarAction, ToolbarState};
use crate::renderer::CanvasRenderer;
use crate::tool::EditorConfig;

const LOADING_REPAINT: Duration = Duration::from_millis(100);

/// Receives the editor's output on behalf of the desktop app.
#[derive(Debug, Default)]
pub struct AppHost {
    /// Where saved PNGs are written; without it they are only kept in memory.
    save_to: Option<PathBuf>,
    last_saved: Option<Vec<u8>>,
    closed: bool,
}

impl AppHost {
    pub fn new(save_to: Option<PathBuf>) -> Self {
        Self {
            save_to,
            ..Self::default()
        }
    }

    pub fn last_saved(&self) -> Option<&[u8]> {
        self.last_saved.as_deref()
    }

    /// The user closed the editor and nothing has been opened since.
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl EditorHost for AppHost {
    fn on_save(&mut self, image: Vec<u8>) {
        if let Some(path) = &self.save_to {
            match std::fs::write(path, &image) {
                Ok(()) => log::info!("Wrote saved image to {}", path.display()),
                Err(err) => log::error!("Could not write {}: {err}", path.display()),
            }
        }
        self.last_saved = Some(image);
    }

    fn on_download(&mut self, path: &Path) {
        log::info!("Download available at {}", path.display());
    }

    fn on_close(&mut self) {
        self.closed = true;
    }
}

/// We derive Deserialize/Serialize so the toolbar settings survive restarts.
#[derive(serde::Deserialize, serde::Serialize, Debug)]
#[serde(default)]
pub struct AnnotateApp {
    config: EditorConfig,
    last_path: String,

    #[serde(skip)]
    editor: AnnotationEditor,
    #[serde(skip)]
    renderer: CanvasRenderer,
    #[serde(skip)]
    input: InputHandler,
    #[serde(skip)]
    files: FileHandler,
    #[serde(skip)]
    toolbar: ToolbarState,
    #[serde(skip)]
    host: AppHost,
}

impl Default for AnnotateApp {
    fn default() -> Self {
        Self {
            config: EditorConfig::default(),
            last_path: String::new(),
            editor: AnnotationEditor::default(),
            renderer: CanvasRenderer::new(),
            input: InputHandler::new(),
            files: FileHandler::new(),
            toolbar: ToolbarState::default(),
            host: AppHost::default(),
        }
    }
}

impl AnnotateApp {
    /// Called once before the first frame.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        options: EditorOptions,
        initial: Option<ImageSource>,
        save_to: Option<PathBuf>,
    ) -> Self {
        let persisted: Self = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, eframe::APP_KEY))
            .unwrap_or_default();
        Self::with_parts(persisted.config, persisted.last_path, options, initial, save_to)
    }

    fn with_parts(
        config: EditorConfig,
        last_path: String,
        options: EditorOptions,
        initial: Option<ImageSource>,
        save_to: Option<PathBuf>,
    ) -> Self {
        let mut editor = AnnotationEditor::new(options);
        editor.subscribe(Box::new(LogEventHandler));
        editor.apply_config(config.clone());

        let mut app = Self {
            config,
            toolbar: ToolbarState::with_path(last_path.clone()),
            last_path,
            editor,
            host: AppHost::new(save_to),
            ..Self::default()
        };
        if let Some(source) = initial {
            app.open(source);
        }
        app
    }

    pub fn editor(&self) -> &AnnotationEditor {
        &self.editor
    }

    pub fn host(&self) -> &AppHost {
        &self.host
    }

    pub fn open(&mut self, source: ImageSource) {
        if let ImageSource::Path(path) = &source {
            self.last_path = path.display().to_string();
        }
        self.host.closed = false;
        self.renderer.clear();
        self.editor.open(source);
    }

    fn handle_action(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::Open(input) => self.open(ImageSource::parse(&input)),
            ToolbarAction::Save => {
                if let Err(err) = self.editor.save(&mut self.host) {
                    log::error!("Save failed: {err}");
                }
            }
            ToolbarAction::Download => {
                if let Err(err) = self.editor.download(&mut self.host) {
                    log::error!("Download failed: {err}");
                }
            }
            ToolbarAction::Close => {
                self.editor.close(&mut self.host);
                self.renderer.clear();
            }
        }
    }
}

impl eframe::App for AnnotateApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        self.config = self.editor.config().clone();
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.renderer.begin_frame();

        if self.editor.poll() {
            ctx.request_repaint();
        }
        if self.editor.is_loading() {
            ctx.request_repaint_after(LOADING_REPAINT);
        }

        if let Some(source) = self.files.take_dropped_image(ctx) {
            self.open(source);
        }

        for action in panels::tools_panel(&mut self.editor, &mut self.toolbar, ctx) {
            self.handle_action(action);
        }
        panels::central_panel(&mut self.editor, &mut self.renderer, &mut self.input, ctx);

        self.files.preview_files_being_dropped(ctx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_settings_are_applied() {
        let mut config = EditorConfig::with_tool(crate::tool::ToolKind::Circle);
        config.set_stroke_width(8);

        let app = AnnotateApp::with_parts(config, "a.png".to_owned(), EditorOptions::default(), None, None);

        assert_eq!(app.editor().config().active_tool, crate::tool::ToolKind::Circle);
        assert_eq!(app.editor().config().stroke_width(), 8);
        assert_eq!(app.toolbar.path_input, "a.png");
    }

    #[test]
    fn test_host_keeps_saved_bytes() {
        let mut host = AppHost::new(None);
        host.on_save(vec![1, 2, 3]);
        assert_eq!(host.last_saved(), Some(&[1u8, 2, 3][..]));
        host.on_close();
        assert!(host.is_closed());
    }
}
