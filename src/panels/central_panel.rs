use egui::{Align2, Color32, FontId, Rect, Sense};

use crate::editor::{AnnotationEditor, EditorStatus, NoticeLevel};
use crate::input::{route_event, InputHandler};
use crate::renderer::{centered_origin, CanvasRenderer};

pub fn central_panel(
    editor: &mut AnnotationEditor,
    renderer: &mut CanvasRenderer,
    input: &mut InputHandler,
    ctx: &egui::Context,
) {
    egui::CentralPanel::default().show(ctx, |ui| {
        notice_bar(editor, ui);

        let Some(size) = editor.surface().map(|s| s.size()) else {
            ui.centered_and_justified(|ui| {
                ui.label("Drop an image here or open one from the toolbar");
            });
            return;
        };

        let origin = centered_origin(ui.available_rect_before_wrap(), size);
        let canvas = Rect::from_min_size(origin, size);
        let response = ui.allocate_rect(canvas, Sense::click_and_drag());
        if response.hovered() {
            ctx.set_cursor_icon(editor.config().active_tool.cursor());
        }

        let mut changed = false;
        for event in input.process_input(ctx, canvas) {
            changed |= route_event(editor, event);
        }
        if changed || input.is_dragging() {
            ctx.request_repaint();
        }

        let painter = ui.painter_at(canvas);
        if let Some(surface) = editor.surface() {
            renderer.render(ctx, &painter, origin, surface, editor.draft());
        }

        if let EditorStatus::Loading { .. } = editor.status() {
            painter.text(
                canvas.center(),
                Align2::CENTER_CENTER,
                "Loading image…",
                FontId::proportional(18.0),
                Color32::DARK_GRAY,
            );
        }
    });
}

fn notice_bar(editor: &mut AnnotationEditor, ui: &mut egui::Ui) {
    let Some(notice) = editor.notice().cloned() else {
        return;
    };
    let color = match notice.level {
        NoticeLevel::Info => ui.visuals().text_color(),
        NoticeLevel::Error => ui.visuals().error_fg_color,
    };
    ui.horizontal(|ui| {
        ui.colored_label(color, notice.message);
        if ui.small_button("✖").clicked() {
            editor.dismiss_notice();
        }
    });
    ui.separator();
}
