use egui::CursorIcon;
use serde::{Deserialize, Serialize};

/// The interaction mode governing how pointer events are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Select,
    #[default]
    Freehand,
    Arrow,
    Rectangle,
    Circle,
    Text,
}

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::Select,
        ToolKind::Freehand,
        ToolKind::Arrow,
        ToolKind::Rectangle,
        ToolKind::Circle,
        ToolKind::Text,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Select => "Select",
            ToolKind::Freehand => "Draw",
            ToolKind::Arrow => "Arrow",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Circle => "Circle",
            ToolKind::Text => "Text",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            ToolKind::Select => "⬉",
            ToolKind::Freehand => "✏",
            ToolKind::Arrow => "➡",
            ToolKind::Rectangle => "⬜",
            ToolKind::Circle => "⭕",
            ToolKind::Text => "T",
        }
    }

    /// Tools that build their shape over a press-drag-release gesture.
    pub fn requires_drag(self) -> bool {
        matches!(
            self,
            ToolKind::Freehand | ToolKind::Arrow | ToolKind::Rectangle | ToolKind::Circle
        )
    }

    /// Drawing tools use a crosshair; only selection keeps the default pointer.
    pub fn cursor(self) -> CursorIcon {
        match self {
            ToolKind::Select => CursorIcon::Default,
            _ => CursorIcon::Crosshair,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_shape_tools_need_a_drag() {
        let dragging: Vec<_> = ToolKind::ALL.into_iter().filter(|t| t.requires_drag()).collect();
        assert_eq!(
            dragging,
            [ToolKind::Freehand, ToolKind::Arrow, ToolKind::Rectangle, ToolKind::Circle]
        );
        assert_eq!(ToolKind::Select.cursor(), CursorIcon::Default);
        assert_eq!(ToolKind::Text.cursor(), CursorIcon::Crosshair);
    }
}
