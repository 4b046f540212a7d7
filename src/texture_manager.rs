use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use image::RgbaImage;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextureGenerationError {
    #[error("image {0} is not decoded yet")]
    NotReady(String),
    #[error("cannot upload an empty {0}x{1} image")]
    InvalidDimensions(u32, u32),
}

/// Convert decoded pixels into an egui image
pub fn color_image(image: &RgbaImage) -> Result<ColorImage, TextureGenerationError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(TextureGenerationError::InvalidDimensions(width, height));
    }
    Ok(ColorImage::from_rgba_unmultiplied(
        [width as usize, height as usize],
        image.as_raw(),
    ))
}

struct CachedTexture {
    handle: TextureHandle,
    /// Frame counter value when the texture was last drawn
    last_used: u64,
}

/// GPU textures of raster assets, keyed by source URL, evicted least recently used first
pub struct TextureManager {
    textures: HashMap<String, CachedTexture>,
    current_frame: u64,
    capacity: usize,
}

impl std::fmt::Debug for TextureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureManager")
            .field("textures", &self.textures.len())
            .field("current_frame", &self.current_frame)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl TextureManager {
    pub fn new(capacity: usize) -> Self {
        Self {
            textures: HashMap::new(),
            current_frame: 0,
            capacity: capacity.max(1),
        }
    }

    /// Advance the use clock; call once per UI frame
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Texture for `url`, uploading the generator's image on a miss
    pub fn get_or_create_texture<F>(&mut self, url: &str, generator: F, ctx: &Context) -> Result<TextureId, TextureGenerationError>
    where
        F: FnOnce() -> Result<ColorImage, TextureGenerationError>,
    {
        let now = self.current_frame;
        if let Some(cached) = self.textures.get_mut(url) {
            cached.last_used = now;
            return Ok(cached.handle.id());
        }

        let handle = ctx.load_texture(format!("asset:{url}"), generator()?, TextureOptions::LINEAR);
        let id = handle.id();
        self.textures.insert(url.to_owned(), CachedTexture { handle, last_used: now });
        self.evict_over_capacity();
        Ok(id)
    }

    /// Drop the texture of `url`, e.g. after its cache entry was evicted
    pub fn invalidate(&mut self, url: &str) {
        self.textures.remove(url);
    }

    fn evict_over_capacity(&mut self) {
        while self.textures.len() > self.capacity {
            let Some(oldest) = self
                .textures
                .iter()
                .min_by_key(|(_, cached)| cached.last_used)
                .map(|(url, _)| url.clone())
            else {
                return;
            };
            log::debug!("evicting texture {}", oldest);
            self.textures.remove(&oldest);
        }
    }

    pub fn clear_cache(&mut self) {
        self.textures.clear();
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.textures.contains_key(url)
    }
}
