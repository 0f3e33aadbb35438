use super::gpu::GpuContext;
use super::paint::{RenderPass, TranslateAnchor};
use super::tile::{Mat4, Tile, TileCoord, VertexArray};
use crate::model::ImagePosition;
use std::collections::HashMap;

/// Sprite lookup used to resolve pattern images.
pub trait PatternAtlas {
    /// Position of `id` in the atlas, or `None` while the image is not resident yet.
    fn position(&self, id: &str) -> Option<ImagePosition>;
}

impl PatternAtlas for HashMap<String, ImagePosition> {
    fn position(&self, id: &str) -> Option<ImagePosition> {
        self.get(id).copied()
    }
}

/// Per-frame state owned by the map painter and handed to layer renderers.
///
/// Implementations own the GPU context and the frame-wide helpers the fill renderer
/// relies on. [`set_clipping_mask`](Self::set_clipping_mask) configures the stencil test
/// against the tile's clip bit (`0x80`) and must not change the stencil write mask.
pub trait Painter {
    type Gpu: GpuContext;

    fn gpu(&mut self) -> &mut Self::Gpu;

    fn pass(&self) -> RenderPass;

    /// Tile-to-clip matrix for `coord`.
    fn calculate_matrix(&self, coord: &TileCoord, max_zoom: u8) -> Mat4;

    /// `matrix` shifted by a paint translation, interpreted according to `anchor`.
    fn translate_matrix(
        &self,
        matrix: &Mat4,
        tile: &Tile,
        translate: [f32; 2],
        anchor: TranslateAnchor,
    ) -> Mat4;

    fn set_clipping_mask(&mut self, coord: &TileCoord);

    /// Select the depth slot used to order the passes drawn for one tile.
    fn set_sublayer(&mut self, n: u8);

    /// Integer zoom level tiles are currently rendered at.
    fn tile_zoom(&self) -> f32;

    fn device_pixel_ratio(&self) -> f32;

    /// Drawing buffer size in physical pixels.
    fn drawing_buffer_size(&self) -> [f32; 2];

    /// Quad covering the whole tile extent, drawn as a triangle strip.
    fn tile_extent_buffer(&self) -> VertexArray;

    fn sprite_atlas(&self) -> &dyn PatternAtlas;

    /// Bind the sprite atlas texture to unit 0.
    fn bind_sprite_atlas(&mut self);
}
