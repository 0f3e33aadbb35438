use crate::config::AtlasConfig;
use crate::error::{Result, TileFillError};
use crate::model::{ImagePosition, PackerStats, Rect};
use crate::packer::ShelfBinPacker;
use crate::render::PatternAtlas;
use image::{Rgba, RgbaImage, imageops};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument, trace};

/// Decode an image file into RGBA pixels, guessing the format from its contents.
pub fn load_rgba(path: &Path) -> Result<RgbaImage> {
    let img = image::ImageReader::open(path)?.with_guessed_format()?.decode()?;
    Ok(img.to_rgba8())
}

/// Region of the atlas texture that changed since the last upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl UpdateRegion {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        (self.width as u64) * (self.height as u64)
    }
}

#[derive(Debug, Clone, Copy)]
struct SpriteEntry {
    /// Reserved slot, padding included.
    slot: Rect,
    width: u32,
    height: u32,
    pixel_ratio: f32,
}

/// Sprite atlas: shelf-packed RGBA images with a growable backing texture.
///
/// Each image is surrounded by `padding` transparent pixels. When the packer runs out of
/// room the atlas doubles in both dimensions (capped at the configured maximum) and keeps
/// every existing placement where it was.
pub struct SpriteAtlas {
    cfg: AtlasConfig,
    packer: ShelfBinPacker,
    image: RgbaImage,
    entries: HashMap<String, SpriteEntry>,
    dirty: Vec<UpdateRegion>,
}

impl SpriteAtlas {
    pub fn new(cfg: AtlasConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            packer: ShelfBinPacker::new(cfg.width, cfg.height),
            image: RgbaImage::from_pixel(cfg.width, cfg.height, Rgba([0, 0, 0, 0])),
            entries: HashMap::new(),
            dirty: Vec::new(),
            cfg,
        })
    }

    pub fn width(&self) -> u32 {
        self.packer.width()
    }

    pub fn height(&self) -> u32 {
        self.packer.height()
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.cfg
    }

    pub fn packer(&self) -> &ShelfBinPacker {
        &self.packer
    }

    /// Backing pixels.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }

    /// Padded slot reserved for `id`.
    pub fn slot(&self, id: &str) -> Option<Rect> {
        self.entries.get(id).map(|e| e.slot)
    }

    /// Add an image, or return the existing position if `id` is already present.
    ///
    /// `pixel_ratio` defaults to the configured one and only affects the reported logical
    /// size. Fails with [`TileFillError::OutOfSpace`] once the atlas is at its maximum size
    /// and still has no room.
    pub fn add_image(
        &mut self,
        id: &str,
        image: &RgbaImage,
        pixel_ratio: Option<f32>,
    ) -> Result<ImagePosition> {
        if let Some(pos) = self.get_position(id) {
            return Ok(pos);
        }
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return Err(TileFillError::InvalidInput(format!(
                "image '{id}' has no pixels"
            )));
        }
        let pixel_ratio = pixel_ratio.unwrap_or(self.cfg.pixel_ratio);
        if !(pixel_ratio.is_finite() && pixel_ratio > 0.0) {
            return Err(TileFillError::InvalidInput(format!(
                "image '{id}' has invalid pixel ratio {pixel_ratio}"
            )));
        }

        let pad = self.cfg.padding;
        let slot = self.reserve(w + 2 * pad, h + 2 * pad)?;
        imageops::replace(&mut self.image, image, (slot.x + pad) as i64, (slot.y + pad) as i64);
        self.dirty.push(UpdateRegion {
            x: slot.x,
            y: slot.y,
            width: slot.w,
            height: slot.h,
        });
        trace!(id, x = slot.x, y = slot.y, w, h, "sprite added");

        let entry = SpriteEntry {
            slot,
            width: w,
            height: h,
            pixel_ratio,
        };
        let position = self.position_of(&entry);
        self.entries.insert(id.to_string(), entry);
        Ok(position)
    }

    /// Forget `id`. Its pixels and slot stay where they are; the space is not reused.
    pub fn remove_image(&mut self, id: &str) -> bool {
        match self.entries.remove(id) {
            Some(entry) => {
                self.packer.release(&entry.slot);
                true
            }
            None => false,
        }
    }

    /// Normalized position of `id` against the current atlas size.
    pub fn get_position(&self, id: &str) -> Option<ImagePosition> {
        self.entries.get(id).map(|e| self.position_of(e))
    }

    fn position_of(&self, e: &SpriteEntry) -> ImagePosition {
        let (aw, ah) = (self.width() as f32, self.height() as f32);
        let pad = self.cfg.padding;
        let (x, y) = ((e.slot.x + pad) as f32, (e.slot.y + pad) as f32);
        ImagePosition {
            tl: [x / aw, y / ah],
            br: [(x + e.width as f32) / aw, (y + e.height as f32) / ah],
            size: [e.width as f32 / e.pixel_ratio, e.height as f32 / e.pixel_ratio],
        }
    }

    /// Regions changed since the last call, in the order they were written.
    pub fn take_dirty(&mut self) -> Vec<UpdateRegion> {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn stats(&self) -> PackerStats {
        self.packer.stats()
    }

    fn reserve(&mut self, w: u32, h: u32) -> Result<Rect> {
        if w > self.cfg.max_width || h > self.cfg.max_height {
            return Err(TileFillError::OutOfSpace);
        }
        loop {
            if let Some(rect) = self.packer.allocate(w, h) {
                return Ok(rect);
            }
            self.grow()?;
        }
    }

    #[instrument(level = "debug", skip(self), fields(w = self.width(), h = self.height()))]
    fn grow(&mut self) -> Result<()> {
        let (new_w, new_h) = self.cfg.grown_size(self.width(), self.height());
        if new_w == self.width() && new_h == self.height() {
            debug!("atlas at maximum size");
            return Err(TileFillError::OutOfSpace);
        }
        if !self.packer.resize(new_w, new_h) {
            return Err(TileFillError::OutOfSpace);
        }
        let mut grown = RgbaImage::from_pixel(new_w, new_h, Rgba([0, 0, 0, 0]));
        imageops::replace(&mut grown, &self.image, 0, 0);
        self.image = grown;
        // Positions are normalized against the atlas size, so everything must be re-uploaded.
        self.dirty.clear();
        self.dirty.push(UpdateRegion {
            x: 0,
            y: 0,
            width: new_w,
            height: new_h,
        });
        debug!(new_w, new_h, "atlas grown");
        Ok(())
    }
}

impl PatternAtlas for SpriteAtlas {
    fn position(&self, id: &str) -> Option<ImagePosition> {
        self.get_position(id)
    }
}
