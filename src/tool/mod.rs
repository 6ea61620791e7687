mod config;
mod controller;
mod kind;

pub use config::{EditorConfig, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, STROKE_WIDTH_RANGE};
pub use controller::{Draft, ToolController, ToolOutcome, DEFAULT_TEXT_BODY};
pub use kind::ToolKind;
