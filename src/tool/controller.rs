use egui::{Pos2, Rect};
use log::debug;

use crate::event::SurfaceChange;
use crate::shape::{factory, Shape, ShapeId, ShapeKind, StrokeStyle};
use crate::surface::Surface;
use crate::tool::{EditorConfig, ToolKind};

/// Body given to a text label when it is first placed.
pub const DEFAULT_TEXT_BODY: &str = "Text";

/// An in-progress shape that is rendered as a preview but not yet on the surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Draft {
    pub kind: ShapeKind,
    pub style: StrokeStyle,
}

/// Pointer interaction state. Only lives between a pointer-down and its pointer-up.
#[derive(Debug, Clone, Default, PartialEq)]
enum Interaction {
    #[default]
    Idle,
    Pressed {
        tool: ToolKind,
        start: Pos2,
        style: StrokeStyle,
    },
    Dragging {
        tool: ToolKind,
        start: Pos2,
        draft: Draft,
    },
}

/// What a pointer event did, so the shell knows whether to repaint or capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolOutcome {
    Ignored,
    /// The draft changed; repaint without touching history.
    Preview,
    Selected(Option<ShapeId>),
    /// A shape landed on the surface; the shell captures history.
    Committed(SurfaceChange),
}

/// Interprets pointer events according to the active tool.
#[derive(Debug, Clone, Default)]
pub struct ToolController {
    interaction: Interaction,
}

impl ToolController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_state_name(&self) -> &'static str {
        match self.interaction {
            Interaction::Idle => "Idle",
            Interaction::Pressed { .. } => "Pressed",
            Interaction::Dragging { .. } => "Dragging",
        }
    }

    pub fn is_idle(&self) -> bool {
        self.interaction == Interaction::Idle
    }

    /// Shape being dragged out, for preview rendering.
    pub fn draft(&self) -> Option<&Draft> {
        match &self.interaction {
            Interaction::Dragging { draft, .. } => Some(draft),
            _ => None,
        }
    }

    /// Drops any in-progress gesture without touching the surface.
    pub fn cancel(&mut self) {
        if !self.is_idle() {
            debug!("Tool session cancelled in state {}", self.current_state_name());
        }
        self.interaction = Interaction::Idle;
    }

    pub fn pointer_down(&mut self, pos: Pos2, config: &EditorConfig, surface: &mut Surface) -> ToolOutcome {
        // A lost pointer-up must not leak into the next gesture.
        self.cancel();

        let tool = config.active_tool;
        match tool {
            ToolKind::Select => ToolOutcome::Selected(surface.select_at(pos)),
            ToolKind::Text => {
                let shape = factory::create_text(
                    pos,
                    DEFAULT_TEXT_BODY,
                    config.font_size,
                    config.font_family.clone(),
                    config.stroke_style(),
                );
                let id = shape.id();
                let change = surface.add_shape(shape);
                surface.set_active(Some(id));
                ToolOutcome::Committed(change)
            }
            ToolKind::Freehand | ToolKind::Arrow | ToolKind::Rectangle | ToolKind::Circle => {
                self.interaction = Interaction::Pressed {
                    tool,
                    start: pos,
                    style: config.stroke_style(),
                };
                ToolOutcome::Ignored
            }
        }
    }

    pub fn pointer_move(&mut self, pos: Pos2) -> ToolOutcome {
        match &mut self.interaction {
            Interaction::Idle => ToolOutcome::Ignored,
            Interaction::Pressed { tool, start, style } => {
                let (tool, start, style) = (*tool, *start, *style);
                let Some(kind) = initial_geometry(tool, start, pos) else {
                    self.interaction = Interaction::Idle;
                    return ToolOutcome::Ignored;
                };
                self.interaction = Interaction::Dragging {
                    tool,
                    start,
                    draft: Draft { kind, style },
                };
                ToolOutcome::Preview
            }
            Interaction::Dragging { tool, start, draft } => {
                extend_geometry(*tool, *start, pos, &mut draft.kind);
                ToolOutcome::Preview
            }
        }
    }

    pub fn pointer_up(&mut self, pos: Pos2, surface: &mut Surface) -> ToolOutcome {
        match std::mem::take(&mut self.interaction) {
            Interaction::Dragging { tool, start, mut draft } => {
                extend_geometry(tool, start, pos, &mut draft.kind);
                if draft.kind.is_degenerate() {
                    debug!("Discarding degenerate {}", draft.kind.name());
                    return ToolOutcome::Ignored;
                }
                let change = surface.add_shape(Shape::new(draft.kind, draft.style));
                ToolOutcome::Committed(change)
            }
            // Press and release without movement draws nothing.
            Interaction::Pressed { .. } | Interaction::Idle => ToolOutcome::Ignored,
        }
    }
}

fn initial_geometry(tool: ToolKind, start: Pos2, pos: Pos2) -> Option<ShapeKind> {
    let kind = match tool {
        ToolKind::Freehand => ShapeKind::Path {
            points: vec![start, pos],
        },
        ToolKind::Arrow => ShapeKind::Arrow { start, end: pos },
        ToolKind::Rectangle => ShapeKind::Rectangle {
            rect: Rect::from_two_pos(start, pos),
        },
        ToolKind::Circle => ShapeKind::Circle {
            center: start,
            radius: start.distance(pos),
        },
        ToolKind::Select | ToolKind::Text => return None,
    };
    Some(kind)
}

/// Freehand appends to the same polyline; the other tools recompute from the anchor.
fn extend_geometry(tool: ToolKind, start: Pos2, pos: Pos2, kind: &mut ShapeKind) {
    match kind {
        ShapeKind::Path { points } => {
            if points.last() != Some(&pos) {
                points.push(pos);
            }
        }
        _ => {
            if let Some(next) = initial_geometry(tool, start, pos) {
                *kind = next;
            }
        }
    }
}
