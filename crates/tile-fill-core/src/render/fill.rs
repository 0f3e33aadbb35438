//! Nonzero-winding polygon fill drawn with the stencil buffer.
//!
//! Tiles carry fill geometry as unordered triangle fans: outer rings wound counter-clockwise
//! and holes clockwise. Each tile/layer is drawn in up to three steps:
//!
//! 1. Stencil: the low seven stencil bits are cleared and every triangle is drawn with color
//!    and depth writes off, incrementing on front faces and decrementing on back faces.
//!    Pixels that end non-zero are inside the polygon under the nonzero rule.
//! 2. Color: one quad covering the tile is drawn with the stencil test `low bits != 0`,
//!    shaded with the flat color or the cross-faded pattern.
//! 3. Outline: the layer's line list, either as an explicit outline on top of the fill or as
//!    the fill's antialiased edge beneath it.
//!
//! The top stencil bit belongs to the painter's tile clip mask and is never written here.

use super::gpu::{CompareFunction, Face, GpuContext, Primitive, Program, StencilOp, Uniform};
use super::guard::MaskGuard;
use super::paint::{FillLayer, FillPaint, PatternFade};
use super::painter::Painter;
use super::tile::{ElementGroups, Mat4, Tile, TileBuffers, TileCoord, TileSource, EXTENT};
use crate::model::ImagePosition;
use tracing::trace;

/// Stencil bits used for winding counts.
pub const WINDING_BITS: u8 = 0x7F;

/// Sublayer of the stencil and color passes.
pub const SUBLAYER_FILL: u8 = 1;
/// Sublayer of an outline with its own color, drawn over the fill.
pub const SUBLAYER_OUTLINE: u8 = 2;
/// Sublayer of the antialiased fill edge, kept beneath the fill so only the part outside
/// the polygon shows.
pub const SUBLAYER_ANTIALIAS: u8 = 0;

/// Draws fill layers. Holds no per-frame state.
#[derive(Debug, Clone)]
pub struct FillRenderer {
    line_width_factor: f32,
}

impl Default for FillRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FillRenderer {
    pub fn new() -> Self {
        Self {
            line_width_factor: 2.0,
        }
    }

    /// Outline width in device pixels is `factor * device_pixel_ratio`.
    pub fn with_line_width_factor(mut self, factor: f32) -> Self {
        self.line_width_factor = factor;
        self
    }

    /// Draw `layer` for every tile in `coords`, in order.
    pub fn draw<P: Painter>(
        &self,
        painter: &mut P,
        source: &dyn TileSource,
        layer: &FillLayer,
        coords: &[TileCoord],
    ) {
        for coord in coords {
            self.draw_tile(painter, source, layer, coord);
        }
    }

    /// Draw one tile. Missing tiles, buffers, layer geometry or pattern images skip the
    /// tile silently; they are expected while data is still loading.
    pub fn draw_tile<P: Painter>(
        &self,
        painter: &mut P,
        source: &dyn TileSource,
        layer: &FillLayer,
        coord: &TileCoord,
    ) {
        let Some(tile) = source.tile(coord) else {
            trace!(%coord, layer = %layer.id, "skip fill: tile not loaded");
            return;
        };
        let Some(buffers) = tile.buffers.as_ref() else {
            trace!(%coord, layer = %layer.id, "skip fill: no buffers");
            return;
        };
        let Some(groups) = tile.element_groups.get(layer.bucket_id()) else {
            trace!(%coord, layer = %layer.id, "skip fill: no geometry for layer");
            return;
        };

        let paint = &layer.paint;
        let pass = painter.pass();
        let draw_fill = paint.draws_in_pass(pass);
        let draw_outline = paint.draws_outline(pass);
        if !draw_fill && !draw_outline {
            return;
        }

        let shading = match (&paint.pattern, draw_fill) {
            (Some(fade), true) => {
                let atlas = painter.sprite_atlas();
                match (atlas.position(&fade.from), atlas.position(&fade.to)) {
                    (Some(a), Some(b)) => Some(Shading::Pattern { fade, a, b }),
                    _ => {
                        trace!(%coord, layer = %layer.id, "skip fill: pattern not in atlas");
                        return;
                    }
                }
            }
            (None, true) => Some(Shading::Flat),
            (_, false) => None,
        };

        let pos_matrix = painter.calculate_matrix(coord, source.max_zoom());
        let translated =
            painter.translate_matrix(&pos_matrix, tile, paint.translate, paint.translate_anchor);

        let mut painter = MaskGuard::new(painter);
        if let Some(shading) = shading {
            draw_stencil(&mut *painter, coord, buffers, groups, &translated);
            draw_color(&mut *painter, coord, tile, paint, shading, &pos_matrix);
        }
        if draw_outline {
            self.draw_outline(&mut *painter, coord, buffers, groups, paint, &translated);
        }
    }

    fn draw_outline<P: Painter>(
        &self,
        painter: &mut P,
        coord: &TileCoord,
        buffers: &TileBuffers,
        groups: &ElementGroups,
        paint: &FillPaint,
        matrix: &Mat4,
    ) {
        let width = self.line_width_factor * painter.device_pixel_ratio();
        let world = painter.drawing_buffer_size();

        let gpu = painter.gpu();
        gpu.use_program(Program::Outline);
        gpu.set_uniform("u_matrix", Uniform::Mat4(*matrix));
        gpu.set_line_width(width);

        // An explicit outline ignores the winding bits and sits above the fill. Without one
        // the lines are the fill's antialiased edge and go beneath it, so only the part
        // outside the polygon blends in.
        let color = match paint.outline_color {
            Some(c) => {
                painter.set_sublayer(SUBLAYER_OUTLINE);
                c
            }
            None => {
                painter.set_sublayer(SUBLAYER_ANTIALIAS);
                paint.color
            }
        };

        let gpu = painter.gpu();
        gpu.set_uniform("u_world", Uniform::Vec2(world));
        gpu.set_uniform("u_color", Uniform::Vec4(color.to_array()));
        gpu.bind_index_buffer(buffers.fill_second_element.id);

        painter.set_clipping_mask(coord);

        let gpu = painter.gpu();
        for group in groups {
            gpu.bind_vertex_buffer(
                buffers.fill_vertex.id,
                group.vertex_start_index * buffers.fill_vertex.item_size,
            );
            gpu.draw_elements(
                Primitive::Lines,
                group.second_element_length * 2,
                group.second_element_start_index * buffers.fill_second_element.item_size,
            );
        }
    }
}

enum Shading<'a> {
    Flat,
    Pattern {
        fade: &'a PatternFade,
        a: ImagePosition,
        b: ImagePosition,
    },
}

fn draw_stencil<P: Painter>(
    painter: &mut P,
    coord: &TileCoord,
    buffers: &TileBuffers,
    groups: &ElementGroups,
    matrix: &Mat4,
) {
    painter.set_sublayer(SUBLAYER_FILL);

    let gpu = painter.gpu();
    gpu.set_stencil_mask(WINDING_BITS);
    gpu.clear_stencil();

    painter.set_clipping_mask(coord);

    let gpu = painter.gpu();
    // Count coverage by counter-clockwise triangles minus coverage by clockwise ones.
    gpu.set_stencil_op(Face::Front, StencilOp::Keep, StencilOp::Keep, StencilOp::IncrWrap);
    gpu.set_stencil_op(Face::Back, StencilOp::Keep, StencilOp::Keep, StencilOp::DecrWrap);
    gpu.set_color_mask(false);
    gpu.set_depth_mask(false);

    gpu.use_program(Program::Fill);
    gpu.set_uniform("u_matrix", Uniform::Mat4(*matrix));
    gpu.bind_index_buffer(buffers.fill_element.id);
    for group in groups {
        gpu.bind_vertex_buffer(
            buffers.fill_vertex.id,
            group.vertex_start_index * buffers.fill_vertex.item_size,
        );
        gpu.draw_elements(
            Primitive::Triangles,
            group.element_length * 3,
            group.element_start_index * buffers.fill_element.item_size,
        );
    }
}

fn draw_color<P: Painter>(
    painter: &mut P,
    coord: &TileCoord,
    tile: &Tile,
    paint: &FillPaint,
    shading: Shading<'_>,
    matrix: &Mat4,
) {
    let tile_zoom = painter.tile_zoom();
    let extent = painter.tile_extent_buffer();

    let gpu = painter.gpu();
    gpu.set_color_mask(true);
    gpu.set_depth_mask(true);
    gpu.set_stencil_op(Face::FrontAndBack, StencilOp::Keep, StencilOp::Keep, StencilOp::Keep);
    gpu.set_stencil_mask(0);

    match shading {
        Shading::Pattern { fade, a, b } => {
            let factor = pattern_factor(tile, tile_zoom);
            gpu.use_program(Program::Pattern);
            gpu.set_uniform("u_matrix", Uniform::Mat4(*matrix));
            gpu.set_uniform("u_image", Uniform::Int(0));
            gpu.set_uniform("u_pattern_tl_a", Uniform::Vec2(a.tl));
            gpu.set_uniform("u_pattern_br_a", Uniform::Vec2(a.br));
            gpu.set_uniform("u_pattern_tl_b", Uniform::Vec2(b.tl));
            gpu.set_uniform("u_pattern_br_b", Uniform::Vec2(b.br));
            gpu.set_uniform("u_opacity", Uniform::Float(paint.opacity));
            gpu.set_uniform("u_mix", Uniform::Float(fade.t));
            gpu.set_uniform(
                "u_patternscale_a",
                Uniform::Vec2(pattern_scale(a.size, factor, fade.from_scale)),
            );
            gpu.set_uniform(
                "u_patternscale_b",
                Uniform::Vec2(pattern_scale(b.size, factor, fade.to_scale)),
            );
            painter.bind_sprite_atlas();
        }
        Shading::Flat => {
            gpu.use_program(Program::Fill);
            gpu.set_uniform("u_matrix", Uniform::Mat4(*matrix));
            gpu.set_uniform("u_color", Uniform::Vec4(paint.color.to_array()));
        }
    }

    let gpu = painter.gpu();
    // Only pixels with a non-zero winding count.
    gpu.set_stencil_func(CompareFunction::NotEqual, 0, WINDING_BITS);
    gpu.bind_vertex_buffer(extent.buffer, 0);
    gpu.draw_arrays(Primitive::TriangleStrip, 0, extent.count);

    gpu.set_stencil_mask(0);
    painter.set_clipping_mask(coord);
}

/// Tile units per pattern pixel at the current zoom: geometry units per tile pixel,
/// reduced by how far the tile is being over- or underzoomed.
pub fn pattern_factor(tile: &Tile, tile_zoom: f32) -> f32 {
    (EXTENT / tile.tile_size) / 2f32.powf(tile_zoom - tile.coord.z as f32)
}

/// Texture-space scale for an image of `size` logical pixels drawn at `image_scale`.
pub fn pattern_scale(size: [f32; 2], factor: f32, image_scale: f32) -> [f32; 2] {
    [
        1.0 / (size[0] * factor * image_scale),
        1.0 / (size[1] * factor * image_scale),
    ]
}
