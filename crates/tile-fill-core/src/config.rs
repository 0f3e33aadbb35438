use crate::render::{BufferId, VertexArray};
use serde::{Deserialize, Serialize};

/// Sprite atlas configuration.
///
/// `width`/`height` are the initial packer dimensions. When an image does not fit the
/// atlas doubles in both dimensions until it reaches `max_width`/`max_height`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AtlasConfig {
    /// Initial atlas width in pixels.
    pub width: u32,
    /// Initial atlas height in pixels.
    pub height: u32,
    /// Largest width the atlas may grow to.
    #[serde(default = "default_max_dim")]
    pub max_width: u32,
    /// Largest height the atlas may grow to.
    #[serde(default = "default_max_dim")]
    pub max_height: u32,
    /// Transparent pixels reserved around every image (sampling safety).
    #[serde(default = "default_padding")]
    pub padding: u32,
    /// Default ratio between physical and logical pixels of added images.
    #[serde(default = "default_pixel_ratio")]
    pub pixel_ratio: f32,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            max_width: default_max_dim(),
            max_height: default_max_dim(),
            padding: default_padding(),
            pixel_ratio: default_pixel_ratio(),
        }
    }
}

impl AtlasConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - Initial dimensions are zero
    /// - Maximum dimensions are smaller than the initial ones
    /// - The pixel ratio is not a positive finite number
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::TileFillError;

        if self.width == 0 || self.height == 0 {
            return Err(TileFillError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.max_width < self.width || self.max_height < self.height {
            return Err(TileFillError::InvalidConfig(format!(
                "max dimensions ({}x{}) are smaller than the initial size ({}x{})",
                self.max_width, self.max_height, self.width, self.height
            )));
        }
        if !(self.pixel_ratio.is_finite() && self.pixel_ratio > 0.0) {
            return Err(TileFillError::InvalidConfig(format!(
                "pixel_ratio must be positive, got {}",
                self.pixel_ratio
            )));
        }
        if self.padding.saturating_mul(2) >= self.width.min(self.height) {
            return Err(TileFillError::InvalidConfig(format!(
                "padding ({}) * 2 leaves no usable space in a {}x{} atlas",
                self.padding, self.width, self.height
            )));
        }
        Ok(())
    }

    /// Size an atlas of `width`x`height` grows to: doubled, capped at the maximum.
    pub fn grown_size(&self, width: u32, height: u32) -> (u32, u32) {
        (
            width.saturating_mul(2).min(self.max_width),
            height.saturating_mul(2).min(self.max_height),
        )
    }

    /// Create a fluent builder for `AtlasConfig`.
    pub fn builder() -> AtlasConfigBuilder {
        AtlasConfigBuilder::new()
    }
}

fn default_max_dim() -> u32 {
    2048
}
fn default_padding() -> u32 {
    1
}
fn default_pixel_ratio() -> f32 {
    1.0
}

/// Builder for `AtlasConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct AtlasConfigBuilder {
    cfg: AtlasConfig,
}

impl AtlasConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: AtlasConfig::default(),
        }
    }
    pub fn with_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.width = w;
        self.cfg.height = h;
        self
    }
    pub fn with_max_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.max_width = w;
        self.cfg.max_height = h;
        self
    }
    pub fn padding(mut self, v: u32) -> Self {
        self.cfg.padding = v;
        self
    }
    pub fn pixel_ratio(mut self, v: f32) -> Self {
        self.cfg.pixel_ratio = v;
        self
    }
    pub fn build(self) -> AtlasConfig {
        self.cfg
    }
}

/// Frame parameters for painters that are not driven by a live map view, such as
/// [`TracePainter`](crate::render::TracePainter).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PainterConfig {
    /// Zoom level tiles are drawn at.
    pub tile_zoom: f32,
    pub device_pixel_ratio: f32,
    /// Drawing buffer size in physical pixels.
    pub drawing_buffer_size: [f32; 2],
    /// Logical pixel size of one tile at its own zoom level.
    pub tile_size: f32,
    /// Tile-extent quad used by the color pass.
    pub tile_extent_buffer: VertexArray,
}

impl Default for PainterConfig {
    fn default() -> Self {
        Self {
            tile_zoom: 0.0,
            device_pixel_ratio: 1.0,
            drawing_buffer_size: [512.0, 512.0],
            tile_size: 512.0,
            tile_extent_buffer: VertexArray {
                buffer: BufferId(0),
                count: 4,
            },
        }
    }
}

impl PainterConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::TileFillError;

        if !(self.tile_zoom.is_finite() && self.tile_zoom >= 0.0) {
            return Err(TileFillError::InvalidConfig(format!(
                "tile_zoom must be a non-negative number, got {}",
                self.tile_zoom
            )));
        }
        if !(self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0) {
            return Err(TileFillError::InvalidConfig(format!(
                "device_pixel_ratio must be positive, got {}",
                self.device_pixel_ratio
            )));
        }
        if !(self.tile_size.is_finite() && self.tile_size > 0.0) {
            return Err(TileFillError::InvalidConfig(format!(
                "tile_size must be positive, got {}",
                self.tile_size
            )));
        }
        let [w, h] = self.drawing_buffer_size;
        if !(w >= 1.0 && h >= 1.0) {
            return Err(TileFillError::InvalidConfig(format!(
                "drawing buffer must be at least 1x1, got {w}x{h}"
            )));
        }
        Ok(())
    }
}
