//! Stencil-based fill rendering for vector map tiles, and the shelf-packed sprite atlas
//! that feeds its patterns.
//!
//! - Rendering: [`FillRenderer`] draws fill layers with a nonzero-winding stencil pass, a
//!   stencil-tested color pass and an optional antialiased outline, through the
//!   [`Painter`]/[`GpuContext`] traits.
//! - Packing: [`ShelfBinPacker`] places rectangles on fixed-height shelves (best height fit);
//!   [`SpriteAtlas`] adds pixels, padding and growth on top of it.
//!
//! Quick example:
//! ```ignore
//! use tile_fill_core::prelude::*;
//! let mut packer = ShelfBinPacker::new(100, 100);
//! assert_eq!(packer.allocate(10, 10), Some(Rect::new(0, 0, 10, 10)));
//! assert_eq!(packer.allocate(10, 10), Some(Rect::new(10, 0, 10, 10)));
//! assert_eq!(packer.allocate(5, 20), Some(Rect::new(0, 10, 5, 20)));
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod packer;
pub mod render;
pub mod sprite_atlas;

pub use config::*;
pub use error::*;
pub use export::*;
pub use model::*;
pub use packer::*;
pub use render::{FillRenderer, GpuContext, Painter, PatternAtlas};
pub use sprite_atlas::{SpriteAtlas, UpdateRegion, load_rgba};

/// Convenience prelude for common types and functions.
/// Importing `tile_fill_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{AtlasConfig, AtlasConfigBuilder, PainterConfig};
    pub use crate::export::{Placement, to_json_placements, to_sprite_json, write_json};
    pub use crate::model::{ImagePosition, PackerStats, Rect};
    pub use crate::packer::{Shelf, ShelfBinPacker};
    pub use crate::render::{
        BufferId, Color, CompareFunction, ElementGroup, ElementGroups, Face, FillLayer,
        FillPaint, FillRenderer, GpuCommand, GpuContext, IndexBuffer, MaskGuard, MaskState,
        Mat4, Painter, PatternAtlas, PatternFade, Primitive, Program, RecordingContext,
        RenderPass, StencilOp, Tile, TileBuffers, TileCoord, TileSet, TileSource,
        TracePainter, TranslateAnchor, Uniform, VertexArray, VertexBuffer,
    };
    pub use crate::sprite_atlas::{SpriteAtlas, UpdateRegion, load_rgba};
}
