use std::ops::RangeInclusive;

use egui::Color32;
use serde::{Deserialize, Serialize};

use crate::shape::StrokeStyle;
use crate::tool::ToolKind;

pub const STROKE_WIDTH_RANGE: RangeInclusive<u8> = 1..=10;
pub const DEFAULT_FONT_SIZE: f32 = 20.0;
pub const DEFAULT_FONT_FAMILY: &str = "sans-serif";

/// Toolbar-driven input state, read by the tool controller on every pointer event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub active_tool: ToolKind,
    pub color: Color32,
    stroke_width: u8,
    pub font_size: f32,
    pub font_family: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            active_tool: ToolKind::default(),
            color: Color32::from_rgb(255, 0, 0),
            stroke_width: 3,
            font_size: DEFAULT_FONT_SIZE,
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
        }
    }
}

impl EditorConfig {
    pub fn with_tool(tool: ToolKind) -> Self {
        Self {
            active_tool: tool,
            ..Self::default()
        }
    }

    pub fn stroke_width(&self) -> u8 {
        self.stroke_width
            .clamp(*STROKE_WIDTH_RANGE.start(), *STROKE_WIDTH_RANGE.end())
    }

    /// Clamped into [`STROKE_WIDTH_RANGE`].
    pub fn set_stroke_width(&mut self, width: u8) {
        self.stroke_width = width.clamp(*STROKE_WIDTH_RANGE.start(), *STROKE_WIDTH_RANGE.end());
    }

    pub fn stroke_style(&self) -> StrokeStyle {
        StrokeStyle::new(self.color, f32::from(self.stroke_width()))
    }
}
