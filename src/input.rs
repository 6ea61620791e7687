use egui::{Context, Key, Modifiers, Pos2, Rect};

use crate::editor::AnnotationEditor;
use crate::renderer::to_surface;

/// Keyboard commands understood by the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    Undo,
    Redo,
    DeleteSelected,
    CancelGesture,
}

impl Shortcut {
    /// `command` is Ctrl, or Cmd on macOS.
    pub fn from_key(key: Key, modifiers: Modifiers) -> Option<Self> {
        match key {
            Key::Z if modifiers.command && modifiers.shift => Some(Shortcut::Redo),
            Key::Z if modifiers.command => Some(Shortcut::Undo),
            Key::Y if modifiers.command => Some(Shortcut::Redo),
            Key::Delete | Key::Backspace if !modifiers.command => Some(Shortcut::DeleteSelected),
            Key::Escape => Some(Shortcut::CancelGesture),
            _ => None,
        }
    }
}

/// Canvas input in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasEvent {
    PointerDown(Pos2),
    PointerMove(Pos2),
    PointerUp(Pos2),
    Shortcut(Shortcut),
}

/// Converts raw egui input into [`CanvasEvent`]s for one canvas.
#[derive(Debug, Default)]
pub struct InputHandler {
    last_pointer_pos: Option<Pos2>,
    /// A press started on the canvas and has not been released yet.
    dragging: bool,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    /// `canvas` is the on-screen rect of the surface; presses outside it are ignored,
    /// but a drag that started inside keeps reporting after leaving it.
    pub fn process_input(&mut self, ctx: &Context, canvas: Rect) -> Vec<CanvasEvent> {
        let mut events = Vec::new();
        let origin = canvas.min;
        let keyboard_free = !ctx.wants_keyboard_input();

        ctx.input(|input| {
            let pointer = input.pointer.interact_pos().or(self.last_pointer_pos);

            if input.pointer.primary_pressed() {
                if let Some(pos) = pointer.filter(|pos| canvas.contains(*pos)) {
                    self.dragging = true;
                    events.push(CanvasEvent::PointerDown(to_surface(origin, pos)));
                }
            } else if self.dragging && pointer != self.last_pointer_pos {
                if let Some(pos) = pointer {
                    events.push(CanvasEvent::PointerMove(to_surface(origin, pos)));
                }
            }

            if self.dragging && input.pointer.primary_released() {
                self.dragging = false;
                if let Some(pos) = pointer {
                    events.push(CanvasEvent::PointerUp(to_surface(origin, pos)));
                }
            }
            self.last_pointer_pos = pointer;

            if keyboard_free {
                for event in &input.events {
                    if let egui::Event::Key {
                        key,
                        pressed: true,
                        modifiers,
                        ..
                    } = event
                    {
                        if let Some(shortcut) = Shortcut::from_key(*key, *modifiers) {
                            events.push(CanvasEvent::Shortcut(shortcut));
                        }
                    }
                }
            }
        });

        events
    }
}

/// Applies one event to the editor. Returns true when the canvas needs a repaint.
pub fn route_event(editor: &mut AnnotationEditor, event: CanvasEvent) -> bool {
    match event {
        CanvasEvent::PointerDown(pos) => editor.pointer_down(pos),
        CanvasEvent::PointerMove(pos) => editor.pointer_move(pos),
        CanvasEvent::PointerUp(pos) => editor.pointer_up(pos),
        CanvasEvent::Shortcut(Shortcut::Undo) => editor.undo(),
        CanvasEvent::Shortcut(Shortcut::Redo) => editor.redo(),
        CanvasEvent::Shortcut(Shortcut::CancelGesture) => editor.cancel_gesture(),
        CanvasEvent::Shortcut(Shortcut::DeleteSelected) => match editor.delete_selected() {
            Ok(deleted) => deleted,
            Err(err) => {
                log::warn!("Delete ignored: {err}");
                false
            }
        },
    }
}
