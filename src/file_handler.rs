use eframe::egui;

use crate::loader::ImageSource;

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "webp", "bmp"];

/// Turns files dropped onto the window into image sources.
#[derive(Debug, Default)]
pub struct FileHandler;

impl FileHandler {
    pub fn new() -> Self {
        Self
    }

    /// Returns the last image dropped this frame, if any.
    pub fn take_dropped_image(&self, ctx: &egui::Context) -> Option<ImageSource> {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        let mut chosen = None;

        for file in &dropped {
            let name = dropped_file_name(file);
            if !is_image_file(file) {
                log::warn!("Dropped file is not a supported type: {name}");
                continue;
            }
            if let Some(bytes) = &file.bytes {
                log::info!("Image dropped from memory: {name} ({} bytes)", bytes.len());
                chosen = Some(ImageSource::from_bytes(name, bytes.clone()));
            } else if let Some(path) = &file.path {
                log::info!("Image dropped from path: {}", path.display());
                chosen = Some(ImageSource::Path(path.clone()));
            } else {
                log::warn!("Dropped file has no accessible data: {name}");
            }
        }
        chosen
    }

    /// Dims the window and lists the files while they hover over it.
    pub fn preview_files_being_dropped(&self, ctx: &egui::Context) {
        use egui::{Align2, Color32, FontId, Id, LayerId, Order};

        if ctx.input(|i| i.raw.hovered_files.is_empty()) {
            return;
        }

        let text = ctx.input(|i| {
            let mut text = "Drop to annotate:\n".to_owned();
            for file in &i.raw.hovered_files {
                match &file.path {
                    Some(path) => text += &format!("\n{}", path.display()),
                    None => text += "\n(path not available)",
                }
            }
            text
        });

        let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("file_drop_target")));
        let screen_rect = ctx.screen_rect();
        painter.rect_filled(screen_rect, 0.0, Color32::from_black_alpha(192));
        painter.text(
            screen_rect.center(),
            Align2::CENTER_CENTER,
            text,
            FontId::proportional(20.0),
            Color32::WHITE,
        );
    }
}

fn dropped_file_name(file: &egui::DroppedFile) -> String {
    if let Some(path) = &file.path {
        path.display().to_string()
    } else if !file.name.is_empty() {
        file.name.clone()
    } else {
        "unknown".to_owned()
    }
}

/// Checks the MIME type when present, the extension otherwise.
pub fn is_image_file(file: &egui::DroppedFile) -> bool {
    if !file.mime.is_empty() {
        return file.mime.starts_with("image/");
    }
    let name = match &file.path {
        Some(path) => path.to_string_lossy().into_owned(),
        None => file.name.clone(),
    };
    name.rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
