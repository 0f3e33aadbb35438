//! The slice of GPU state the fill renderer drives.
//!
//! Shader compilation, uniform locations and buffer uploads live behind [`GpuContext`];
//! the renderer only selects programs, uploads values by name, flips masks and submits
//! indexed or array draws.

use serde::{Deserialize, Serialize};

/// Opaque handle to a GPU buffer owned by the embedding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferId(pub u32);

/// Shader programs used by the fill layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    /// Flat color; also used for the stencil-only pass.
    Fill,
    /// Two-image cross-faded pattern sampled from the sprite atlas.
    Pattern,
    /// Antialiased outline lines.
    Outline,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Uniform {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Face {
    Front,
    Back,
    FrontAndBack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrWrap,
    DecrWrap,
}

impl StencilOp {
    /// Apply the operation to a stored stencil value, honouring the write mask.
    pub fn apply(self, current: u8, reference: u8, write_mask: u8) -> u8 {
        let next = match self {
            StencilOp::Keep => current,
            StencilOp::Zero => 0,
            StencilOp::Replace => reference,
            StencilOp::IncrWrap => current.wrapping_add(1),
            StencilOp::DecrWrap => current.wrapping_sub(1),
        };
        (current & !write_mask) | (next & write_mask)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareFunction {
    Never,
    Always,
    Equal,
    NotEqual,
}

impl CompareFunction {
    /// Stencil test: compares `reference & mask` against `stored & mask`.
    pub fn test(self, reference: u8, stored: u8, mask: u8) -> bool {
        let (r, s) = (reference & mask, stored & mask);
        match self {
            CompareFunction::Never => false,
            CompareFunction::Always => true,
            CompareFunction::Equal => r == s,
            CompareFunction::NotEqual => r != s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Triangles,
    TriangleStrip,
    Lines,
}

/// Write masks that every draw must hand back unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskState {
    pub color: bool,
    pub depth: bool,
    pub stencil: u8,
}

impl MaskState {
    pub fn capture<G: GpuContext + ?Sized>(gpu: &G) -> Self {
        Self {
            color: gpu.color_mask(),
            depth: gpu.depth_mask(),
            stencil: gpu.stencil_mask(),
        }
    }

    pub fn apply<G: GpuContext + ?Sized>(&self, gpu: &mut G) {
        gpu.set_color_mask(self.color);
        gpu.set_depth_mask(self.depth);
        gpu.set_stencil_mask(self.stencil);
    }
}

/// GPU state and draw submission.
///
/// Index buffers hold unsigned 16-bit indices. Byte offsets passed to
/// [`bind_vertex_buffer`](Self::bind_vertex_buffer) and
/// [`draw_elements`](Self::draw_elements) are already scaled by the buffer's item size.
pub trait GpuContext {
    fn use_program(&mut self, program: Program);
    fn set_uniform(&mut self, name: &'static str, value: Uniform);

    fn color_mask(&self) -> bool;
    fn set_color_mask(&mut self, enabled: bool);
    fn depth_mask(&self) -> bool;
    fn set_depth_mask(&mut self, enabled: bool);
    fn stencil_mask(&self) -> u8;
    fn set_stencil_mask(&mut self, mask: u8);

    /// Clear the stencil buffer. Only bits enabled in the current stencil mask are cleared.
    fn clear_stencil(&mut self);
    fn set_stencil_func(&mut self, func: CompareFunction, reference: u8, mask: u8);
    fn set_stencil_op(&mut self, face: Face, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp);

    fn set_line_width(&mut self, width: f32);

    /// Bind a vertex buffer and point the position attribute at `byte_offset`.
    fn bind_vertex_buffer(&mut self, buffer: BufferId, byte_offset: usize);
    fn bind_index_buffer(&mut self, buffer: BufferId);
    fn draw_elements(&mut self, primitive: Primitive, count: usize, byte_offset: usize);
    fn draw_arrays(&mut self, primitive: Primitive, first: usize, count: usize);
}
