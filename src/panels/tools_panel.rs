use egui::{color_picker, Button, Slider};

use crate::components::ToolButton;
use crate::editor::{AnnotationEditor, EditorStatus};
use crate::shape::{ShapeId, ShapeKind};
use crate::tool::{ToolKind, STROKE_WIDTH_RANGE};

/// Toolbar requests that need the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolbarAction {
    Open(String),
    Save,
    Download,
    Close,
}

/// Toolbar state that outlives a single frame.
#[derive(Debug, Default)]
pub struct ToolbarState {
    pub path_input: String,
    /// Body being edited for the active text label.
    text_edit: Option<(ShapeId, String)>,
}

impl ToolbarState {
    pub fn with_path(path_input: impl Into<String>) -> Self {
        Self {
            path_input: path_input.into(),
            text_edit: None,
        }
    }
}

pub fn tools_panel(editor: &mut AnnotationEditor, state: &mut ToolbarState, ctx: &egui::Context) -> Vec<ToolbarAction> {
    let mut actions = Vec::new();

    egui::SidePanel::left("tools_panel")
        .resizable(true)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Image");
            ui.horizontal(|ui| {
                let field = ui.text_edit_singleline(&mut state.path_input);
                let submitted = field.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                if (ui.button("Open").clicked() || submitted) && !state.path_input.trim().is_empty() {
                    actions.push(ToolbarAction::Open(state.path_input.trim().to_owned()));
                }
            });
            if let EditorStatus::Loading { source } = editor.status() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(format!("Loading {source}"));
                });
            }
            ui.separator();

            ui.add_enabled_ui(editor.is_open(), |ui| {
                tool_section(editor, ui);
                ui.separator();
                history_section(editor, ui);
                ui.separator();
                text_section(editor, state, ui);

                ui.separator();
                ui.horizontal(|ui| {
                    if ui.button("💾 Save").clicked() {
                        actions.push(ToolbarAction::Save);
                    }
                    if ui.button("⬇ Download").clicked() {
                        actions.push(ToolbarAction::Download);
                    }
                    if ui.button("✖ Close").clicked() {
                        actions.push(ToolbarAction::Close);
                    }
                });
            });
        });

    actions
}

fn tool_section(editor: &mut AnnotationEditor, ui: &mut egui::Ui) {
    ui.heading("Tools");
    let active = editor.config().active_tool;
    ui.horizontal_wrapped(|ui| {
        for tool in ToolKind::ALL {
            if ToolButton::new(tool, tool == active).show(ui).clicked() {
                log::info!("Tool selected from UI: {}", tool.name());
                editor.select_tool(tool);
            }
        }
    });
    ui.label(format!("{} ({})", active.name(), editor.tool_state_name()));

    ui.horizontal(|ui| {
        ui.label("Color:");
        let mut color = editor.config().color;
        if color_picker::color_edit_button_srgba(ui, &mut color, color_picker::Alpha::Opaque).changed() {
            editor.set_color(color);
        }
    });
    ui.horizontal(|ui| {
        ui.label("Width:");
        let mut width = editor.config().stroke_width();
        if ui.add(Slider::new(&mut width, STROKE_WIDTH_RANGE)).changed() {
            editor.set_stroke_width(width);
        }
    });
}

fn history_section(editor: &mut AnnotationEditor, ui: &mut egui::Ui) {
    ui.horizontal(|ui| {
        if ui.add_enabled(editor.can_undo(), Button::new("Undo")).clicked() {
            editor.undo();
        }
        if ui.add_enabled(editor.can_redo(), Button::new("Redo")).clicked() {
            editor.redo();
        }
        let has_selection = editor.surface().and_then(|s| s.selected()).is_some();
        if ui.add_enabled(has_selection, Button::new("Delete")).clicked() {
            if let Err(err) = editor.delete_selected() {
                log::warn!("Delete failed: {err}");
            }
        }
    });

    let history = editor.history();
    let position = history.index().map_or(0, |i| i + 1);
    ui.label(format!("History {position}/{} (max {})", history.len(), history.capacity()));
}

fn text_section(editor: &mut AnnotationEditor, state: &mut ToolbarState, ui: &mut egui::Ui) {
    let active_text = editor.surface().and_then(|surface| {
        let id = surface.selected()?;
        match surface.shape(id)?.kind() {
            ShapeKind::Text(label) => Some((id, label.body.clone())),
            _ => None,
        }
    });

    let Some((id, body)) = active_text else {
        state.text_edit = None;
        return;
    };
    if state.text_edit.as_ref().map(|(edit_id, _)| *edit_id) != Some(id) {
        state.text_edit = Some((id, body.clone()));
    }
    let Some((_, buffer)) = state.text_edit.as_mut() else {
        return;
    };

    ui.label("Text:");
    let response = ui.text_edit_multiline(buffer);
    if response.lost_focus() && *buffer != body {
        if let Err(err) = editor.edit_text(id, buffer.clone()) {
            log::warn!("Text edit failed: {err}");
        }
    }
}
