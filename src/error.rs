use std::time::Duration;

use thiserror::Error;

use crate::shape::ShapeId;

/// Errors raised while fetching or decoding a background image
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("Image load timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Failed to fetch image: {0}")]
    Fetch(String),

    #[error("Failed to read image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Unsupported image source: {0}")]
    Unsupported(String),

    #[error("Image load was superseded")]
    Cancelled,
}

/// Errors raised while flattening the surface into an output image
#[derive(Debug, Error)]
pub enum RasterizationError {
    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Surface has no area to rasterize")]
    EmptySurface,

    #[error("Failed to write image: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by structural surface operations
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("No shape with id {0}")]
    UnknownShape(ShapeId),

    #[error("Cannot apply {found} patch to {expected} shape {id}")]
    PatchMismatch {
        id: ShapeId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Top-level error type surfaced by the editor shell
#[derive(Debug, Error)]
pub enum EditorError {
    #[error(transparent)]
    ImageLoad(#[from] ImageLoadError),

    #[error(transparent)]
    Rasterization(#[from] RasterizationError),

    #[error(transparent)]
    Surface(#[from] SurfaceError),

    #[error("Editor is closed")]
    Closed,
}

pub type EditorResult<T> = Result<T, EditorError>;
