//! The drawing surface: a non-interactive background image plus an ordered
//! list of annotation shapes (insertion order is z-order).

use std::sync::Arc;

use egui::{Pos2, Vec2};
use image::RgbaImage;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::{ImageLoadError, RasterizationError, SurfaceError};
use crate::event::SurfaceChange;
use crate::raster::{ExportFormat, Rasterizer};
use crate::shape::{Shape, ShapeId, ShapePatch};

/// Where the background sits on the surface and how it was scaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundPlacement {
    /// Display name of the image source, used to match decoded pixels on restore.
    pub source: String,
    /// Pixel dimensions of the decoded image.
    pub pixel_size: [u32; 2],
    /// Uniform scale applied to fit the surface.
    pub scale: f32,
    /// Top-left corner of the scaled image in surface coordinates.
    pub position: Pos2,
}

impl BackgroundPlacement {
    pub fn scaled_size(&self) -> Vec2 {
        Vec2::new(self.pixel_size[0] as f32, self.pixel_size[1] as f32) * self.scale
    }

    pub fn rect(&self) -> egui::Rect {
        egui::Rect::from_min_size(self.position, self.scaled_size())
    }
}

/// Decoded background pixels, tagged with the source they came from.
#[derive(Clone)]
pub struct BackgroundPixels {
    pub source: String,
    pub image: Arc<RgbaImage>,
}

impl std::fmt::Debug for BackgroundPixels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundPixels")
            .field("source", &self.source)
            .field("size", &self.image.dimensions())
            .finish()
    }
}

/// Immutable serialized copy of a surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    json: Arc<str>,
}

impl Snapshot {
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            json: Arc::from(json.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.json
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.json.as_bytes()
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    background: Option<&'a BackgroundPlacement>,
    shapes: &'a [Shape],
}

#[derive(Deserialize)]
struct SnapshotData {
    background: Option<BackgroundPlacement>,
    shapes: Vec<Shape>,
}

#[derive(Debug, Clone)]
pub struct Surface {
    size: Vec2,
    padding: f32,
    background: Option<BackgroundPlacement>,
    pixels: Option<BackgroundPixels>,
    shapes: Vec<Shape>,
    selected: Option<ShapeId>,
    selection_enabled: bool,
}

impl Surface {
    pub fn new(size: Vec2, padding: f32) -> Self {
        Self {
            size,
            padding,
            background: None,
            pixels: None,
            shapes: Vec::new(),
            selected: None,
            selection_enabled: false,
        }
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn background(&self) -> Option<&BackgroundPlacement> {
        self.background.as_ref()
    }

    /// Decoded background pixels, if they match the current placement.
    pub fn background_pixels(&self) -> Option<&BackgroundPixels> {
        let placement = self.background.as_ref()?;
        self.pixels
            .as_ref()
            .filter(|pixels| pixels.source == placement.source)
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.iter().find(|s| s.id() == id)
    }

    /// Computes the uniform scale and centered position that fits an image of
    /// `pixel_size` inside the surface minus padding.
    pub fn fit(&self, pixel_size: [u32; 2]) -> (f32, Pos2) {
        let image = Vec2::new(pixel_size[0].max(1) as f32, pixel_size[1].max(1) as f32);
        let available = (self.size - Vec2::splat(2.0 * self.padding)).max(Vec2::splat(1.0));
        let scale = (available.x / image.x).min(available.y / image.y);
        let position = Pos2::new(
            (self.size.x - image.x * scale) / 2.0,
            (self.size.y - image.y * scale) / 2.0,
        );
        (scale, position)
    }

    /// Installs an already decoded image as the bottom-most, non-interactive layer.
    pub fn load_background(&mut self, source: impl Into<String>, image: RgbaImage) -> BackgroundPlacement {
        let source = source.into();
        let pixel_size = [image.width(), image.height()];
        let (scale, position) = self.fit(pixel_size);

        let placement = BackgroundPlacement {
            source: source.clone(),
            pixel_size,
            scale,
            position,
        };
        debug!("Background {source} placed at {position:?} scale {scale:.3}");

        self.background = Some(placement.clone());
        self.pixels = Some(BackgroundPixels {
            source,
            image: Arc::new(image),
        });
        placement
    }

    /// Decodes `bytes` and installs the result as background. On failure the
    /// surface is left untouched.
    pub fn load_background_bytes(
        &mut self,
        source: impl Into<String>,
        bytes: &[u8],
    ) -> Result<BackgroundPlacement, ImageLoadError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        Ok(self.load_background(source, image))
    }

    pub fn add_shape(&mut self, shape: Shape) -> SurfaceChange {
        let id = shape.id();
        debug!("Adding {} {id}", shape.kind().name());
        self.shapes.push(shape);
        SurfaceChange::Added(id)
    }

    pub fn remove_shape(&mut self, id: ShapeId) -> Result<SurfaceChange, SurfaceError> {
        let index = self
            .shapes
            .iter()
            .position(|s| s.id() == id)
            .ok_or(SurfaceError::UnknownShape(id))?;
        self.shapes.remove(index);
        if self.selected == Some(id) {
            self.selected = None;
        }
        Ok(SurfaceChange::Removed(id))
    }

    pub fn mutate_shape(&mut self, id: ShapeId, patch: ShapePatch) -> Result<SurfaceChange, SurfaceError> {
        let shape = self
            .shapes
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or(SurfaceError::UnknownShape(id))?;
        shape.apply(patch)?;
        Ok(SurfaceChange::Modified(id))
    }

    /// Top-most shape under `pos`. The background never participates.
    pub fn hit_test(&self, pos: Pos2) -> Option<ShapeId> {
        self.shapes.iter().rev().find(|s| s.hit_test(pos)).map(Shape::id)
    }

    pub fn selection_enabled(&self) -> bool {
        self.selection_enabled
    }

    /// Enabling is tied to the select tool; disabling drops the current selection.
    pub fn set_selection_enabled(&mut self, enabled: bool) {
        self.selection_enabled = enabled;
        if !enabled {
            self.selected = None;
        }
    }

    /// Native selection behavior. Only effective while selection is enabled.
    pub fn select_at(&mut self, pos: Pos2) -> Option<ShapeId> {
        if !self.selection_enabled {
            return None;
        }
        self.selected = self.hit_test(pos);
        self.selected
    }

    pub fn selected(&self) -> Option<ShapeId> {
        self.selected
    }

    /// Marks a shape as the active one regardless of selection mode
    /// (used for freshly placed text).
    pub fn set_active(&mut self, id: Option<ShapeId>) {
        self.selected = id.filter(|id| self.shape(*id).is_some());
    }

    pub fn serialize(&self) -> Result<Snapshot, SurfaceError> {
        let json = serde_json::to_string(&SnapshotRef {
            background: self.background.as_ref(),
            shapes: &self.shapes,
        })?;
        Ok(Snapshot::from_json(json))
    }

    /// Replaces shapes and background reference from a snapshot. Decoded
    /// pixels are kept only while they belong to the restored background.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<(), SurfaceError> {
        let data: SnapshotData = serde_json::from_str(snapshot.as_str())?;

        let pixels_match = match (&data.background, &self.pixels) {
            (Some(placement), Some(pixels)) => placement.source == pixels.source,
            _ => false,
        };
        if !pixels_match && self.pixels.is_some() {
            warn!("Restored snapshot references a different background; dropping decoded pixels");
            self.pixels = None;
        }

        self.background = data.background;
        self.shapes = data.shapes;
        if let Some(id) = self.selected {
            if self.shape(id).is_none() {
                self.selected = None;
            }
        }
        Ok(())
    }

    pub fn rasterize(&self, rasterizer: &Rasterizer, format: ExportFormat) -> Result<Vec<u8>, RasterizationError> {
        rasterizer.encode(self, format)
    }
}
