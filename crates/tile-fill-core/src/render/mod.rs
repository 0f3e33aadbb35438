//! Fill layer rendering against an abstract GPU context.

pub mod fill;
pub mod gpu;
pub mod guard;
pub mod paint;
pub mod painter;
pub mod recorder;
pub mod tile;
pub mod trace;

pub use fill::FillRenderer;
pub use gpu::{
    BufferId, CompareFunction, Face, GpuContext, MaskState, Primitive, Program, StencilOp, Uniform,
};
pub use guard::MaskGuard;
pub use paint::{Color, FillLayer, FillPaint, PatternFade, RenderPass, TranslateAnchor};
pub use painter::{Painter, PatternAtlas};
pub use recorder::{GpuCommand, RecordingContext};
pub use tile::{
    ElementGroup, ElementGroups, IndexBuffer, Mat4, Tile, TileBuffers, TileCoord, TileSet,
    TileSource, VertexArray, VertexBuffer, EXTENT, MAX_GROUP_VERTICES,
};
pub use trace::TracePainter;
