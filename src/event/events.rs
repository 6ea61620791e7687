use std::path::PathBuf;

use crate::shape::ShapeId;
use crate::tool::ToolKind;

/// A structural surface mutation. Each one is the unit of history capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceChange {
    Added(ShapeId),
    Removed(ShapeId),
    Modified(ShapeId),
}

impl SurfaceChange {
    pub fn shape_id(&self) -> ShapeId {
        match self {
            SurfaceChange::Added(id) | SurfaceChange::Removed(id) | SurfaceChange::Modified(id) => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    ToolChanged {
        old: ToolKind,
        new: ToolKind,
    },
    SurfaceChanged(SurfaceChange),
    SelectionChanged(Option<ShapeId>),
    HistoryChanged {
        index: Option<usize>,
        len: usize,
    },
    LoadStarted {
        source: String,
    },
    BackgroundLoaded {
        source: String,
        scale: f32,
    },
    ImageLoadFailed {
        source: String,
        reason: String,
    },
    Saved {
        bytes: usize,
    },
    Downloaded {
        path: PathBuf,
    },
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_names_its_shape() {
        let id = ShapeId::new();
        for change in [SurfaceChange::Added(id), SurfaceChange::Removed(id), SurfaceChange::Modified(id)] {
            assert_eq!(change.shape_id(), id);
        }
    }
}
