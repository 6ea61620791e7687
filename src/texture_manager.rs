use std::collections::HashMap;

use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use image::RgbaImage;

use crate::surface::BackgroundPixels;

/// Keeps GPU textures for decoded backgrounds, keyed by image source.
/// Entries survive snapshot restores; the least recently drawn is evicted first.
pub struct TextureManager {
    textures: HashMap<String, TextureHandle>,
    last_used: HashMap<String, u64>,
    current_frame: u64,
    max_cache_size: usize,
}

impl std::fmt::Debug for TextureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureManager")
            .field("cached", &self.textures.len())
            .field("current_frame", &self.current_frame)
            .finish()
    }
}

impl Default for TextureManager {
    fn default() -> Self {
        Self::new(4)
    }
}

impl TextureManager {
    pub fn new(max_cache_size: usize) -> Self {
        Self {
            textures: HashMap::new(),
            last_used: HashMap::new(),
            current_frame: 0,
            max_cache_size: max_cache_size.max(1),
        }
    }

    /// Should be called at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    pub fn background_texture(&mut self, ctx: &Context, pixels: &BackgroundPixels) -> TextureId {
        if let Some(handle) = self.textures.get(&pixels.source) {
            self.last_used.insert(pixels.source.clone(), self.current_frame);
            return handle.id();
        }

        self.prune_to(self.max_cache_size - 1);

        let handle = ctx.load_texture(
            format!("background:{}", pixels.source),
            to_color_image(&pixels.image),
            TextureOptions::LINEAR,
        );
        let id = handle.id();
        log::debug!("Uploaded background texture for {}", pixels.source);
        self.textures.insert(pixels.source.clone(), handle);
        self.last_used.insert(pixels.source.clone(), self.current_frame);
        id
    }

    pub fn invalidate(&mut self, source: &str) {
        self.textures.remove(source);
        self.last_used.remove(source);
    }

    /// Evicts least recently used textures until at most `limit` remain.
    fn prune_to(&mut self, limit: usize) {
        if self.textures.len() <= limit {
            return;
        }
        let mut entries: Vec<(String, u64)> = self
            .last_used
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        entries.sort_by_key(|(_, frame)| *frame);

        let excess = self.textures.len() - limit;
        for (source, _) in entries.into_iter().take(excess) {
            self.invalidate(&source);
        }
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.last_used.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.textures.len()
    }

    pub fn contains(&self, source: &str) -> bool {
        self.textures.contains_key(source)
    }
}

fn to_color_image(image: &RgbaImage) -> ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    ColorImage::from_rgba_unmultiplied(size, image.as_raw())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn pixels(source: &str) -> BackgroundPixels {
        BackgroundPixels {
            source: source.to_owned(),
            image: Arc::new(RgbaImage::from_pixel(4, 3, image::Rgba([10, 20, 30, 255]))),
        }
    }

    #[test]
    fn test_cache_hit() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(4);

        let first = manager.background_texture(&ctx, &pixels("a.png"));
        let second = manager.background_texture(&ctx, &pixels("a.png"));

        assert_eq!(first, second);
        assert_eq!(manager.cache_size(), 1);
    }

    #[test]
    fn test_lru_eviction() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(2);

        manager.background_texture(&ctx, &pixels("a.png"));
        manager.begin_frame();
        manager.background_texture(&ctx, &pixels("b.png"));
        manager.begin_frame();
        manager.background_texture(&ctx, &pixels("c.png"));

        assert_eq!(manager.cache_size(), 2);
        assert!(!manager.contains("a.png"));
        assert!(manager.contains("b.png"));
        assert!(manager.contains("c.png"));
    }

    #[test]
    fn test_invalidation() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(4);
        manager.background_texture(&ctx, &pixels("a.png"));
        manager.invalidate("a.png");
        assert_eq!(manager.cache_size(), 0);
    }
}
