use super::gpu::{CompareFunction, GpuContext};
use super::paint::{RenderPass, TranslateAnchor};
use super::painter::{Painter, PatternAtlas};
use super::recorder::{GpuCommand, RecordingContext};
use super::tile::{EXTENT, Mat4, Tile, TileCoord, VertexArray};
use crate::config::PainterConfig;
use crate::error::Result;

/// Painter over a [`RecordingContext`] for inspecting what the fill renderer submits.
///
/// The view is anchored at the world origin with no bearing or pitch. Every tile is laid
/// out at [`PainterConfig::tile_size`], for both placement and pixel translation. Clip mask
/// and sublayer changes are written into the command stream as markers.
pub struct TracePainter<A> {
    gpu: RecordingContext,
    cfg: PainterConfig,
    pass: RenderPass,
    atlas: A,
}

impl<A: PatternAtlas> TracePainter<A> {
    pub fn new(cfg: PainterConfig, pass: RenderPass, atlas: A) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            gpu: RecordingContext::new(),
            cfg,
            pass,
            atlas,
        })
    }

    pub fn set_pass(&mut self, pass: RenderPass) {
        self.pass = pass;
    }

    pub fn recorder(&self) -> &RecordingContext {
        &self.gpu
    }

    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        self.gpu.take_commands()
    }

    fn zoom_scale(&self, z: u8) -> f32 {
        2f32.powf(self.cfg.tile_zoom - z as f32)
    }
}

impl<A: PatternAtlas> Painter for TracePainter<A> {
    type Gpu = RecordingContext;

    fn gpu(&mut self) -> &mut RecordingContext {
        &mut self.gpu
    }

    fn pass(&self) -> RenderPass {
        self.pass
    }

    fn calculate_matrix(&self, coord: &TileCoord, _max_zoom: u8) -> Mat4 {
        let [w, h] = self.cfg.drawing_buffer_size;
        let tile_px = self.cfg.tile_size * self.zoom_scale(coord.z) * self.cfg.device_pixel_ratio;
        let unit = tile_px / EXTENT;
        // column-major: tile units -> buffer pixels -> clip space, y down
        let (sx, sy) = (2.0 / w, -2.0 / h);
        let mut m = [0.0; 16];
        m[0] = unit * sx;
        m[5] = unit * sy;
        m[10] = 1.0;
        m[12] = coord.x as f32 * tile_px * sx - 1.0;
        m[13] = coord.y as f32 * tile_px * sy + 1.0;
        m[15] = 1.0;
        m
    }

    fn translate_matrix(
        &self,
        matrix: &Mat4,
        tile: &Tile,
        translate: [f32; 2],
        // Without a bearing both anchors resolve to the same offset.
        _anchor: TranslateAnchor,
    ) -> Mat4 {
        if translate == [0.0, 0.0] {
            return *matrix;
        }
        let units_per_px = EXTENT / (self.cfg.tile_size * self.zoom_scale(tile.coord.z));
        let (tx, ty) = (translate[0] * units_per_px, translate[1] * units_per_px);
        let mut m = *matrix;
        for row in 0..4 {
            m[12 + row] += matrix[row] * tx + matrix[4 + row] * ty;
        }
        m
    }

    fn set_clipping_mask(&mut self, coord: &TileCoord) {
        self.gpu.marker(format!("clip {coord}"));
        self.gpu.set_stencil_func(CompareFunction::Equal, 0x80, 0x80);
    }

    fn set_sublayer(&mut self, n: u8) {
        self.gpu.marker(format!("sublayer {n}"));
    }

    fn tile_zoom(&self) -> f32 {
        self.cfg.tile_zoom
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.cfg.device_pixel_ratio
    }

    fn drawing_buffer_size(&self) -> [f32; 2] {
        self.cfg.drawing_buffer_size
    }

    fn tile_extent_buffer(&self) -> VertexArray {
        self.cfg.tile_extent_buffer
    }

    fn sprite_atlas(&self) -> &dyn PatternAtlas {
        &self.atlas
    }

    fn bind_sprite_atlas(&mut self) {
        self.gpu.marker("bind sprite atlas");
    }
}
