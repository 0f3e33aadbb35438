use super::gpu::{
    BufferId, CompareFunction, Face, GpuContext, MaskState, Primitive, Program, StencilOp, Uniform,
};
use serde::{Deserialize, Serialize};

/// One call made against a [`RecordingContext`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GpuCommand {
    UseProgram {
        program: Program,
    },
    SetUniform {
        name: String,
        value: Uniform,
    },
    ColorMask {
        enabled: bool,
    },
    DepthMask {
        enabled: bool,
    },
    StencilMask {
        mask: u8,
    },
    ClearStencil {
        mask: u8,
    },
    StencilFunc {
        func: CompareFunction,
        reference: u8,
        mask: u8,
    },
    StencilOp {
        face: Face,
        fail: StencilOp,
        depth_fail: StencilOp,
        pass: StencilOp,
    },
    LineWidth {
        width: f32,
    },
    BindVertexBuffer {
        buffer: BufferId,
        byte_offset: usize,
    },
    BindIndexBuffer {
        buffer: BufferId,
    },
    DrawElements {
        primitive: Primitive,
        count: usize,
        byte_offset: usize,
    },
    DrawArrays {
        primitive: Primitive,
        first: usize,
        count: usize,
    },
    /// Not a GPU call: lets a painter note clip/sublayer changes in the same stream.
    Marker {
        label: String,
    },
}

impl GpuCommand {
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            GpuCommand::DrawElements { .. } | GpuCommand::DrawArrays { .. }
        )
    }
}

/// [`GpuContext`] that executes nothing and records every call.
///
/// Mask state is tracked so mask restoration can be checked after a draw.
#[derive(Debug, Clone)]
pub struct RecordingContext {
    commands: Vec<GpuCommand>,
    masks: MaskState,
}

impl Default for RecordingContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingContext {
    /// Starts with GL default masks: color and depth writes on, stencil writes on all bits.
    pub fn new() -> Self {
        Self::with_masks(MaskState {
            color: true,
            depth: true,
            stencil: 0xFF,
        })
    }

    pub fn with_masks(masks: MaskState) -> Self {
        Self {
            commands: Vec::new(),
            masks,
        }
    }

    pub fn masks(&self) -> MaskState {
        self.masks
    }

    pub fn commands(&self) -> &[GpuCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn marker(&mut self, label: impl Into<String>) {
        self.commands.push(GpuCommand::Marker {
            label: label.into(),
        });
    }

    /// Draw calls only, in submission order.
    pub fn draws(&self) -> impl Iterator<Item = &GpuCommand> {
        self.commands.iter().filter(|c| c.is_draw())
    }
}

impl GpuContext for RecordingContext {
    fn use_program(&mut self, program: Program) {
        self.commands.push(GpuCommand::UseProgram { program });
    }

    fn set_uniform(&mut self, name: &'static str, value: Uniform) {
        self.commands.push(GpuCommand::SetUniform {
            name: name.to_string(),
            value,
        });
    }

    fn color_mask(&self) -> bool {
        self.masks.color
    }

    fn set_color_mask(&mut self, enabled: bool) {
        self.masks.color = enabled;
        self.commands.push(GpuCommand::ColorMask { enabled });
    }

    fn depth_mask(&self) -> bool {
        self.masks.depth
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.masks.depth = enabled;
        self.commands.push(GpuCommand::DepthMask { enabled });
    }

    fn stencil_mask(&self) -> u8 {
        self.masks.stencil
    }

    fn set_stencil_mask(&mut self, mask: u8) {
        self.masks.stencil = mask;
        self.commands.push(GpuCommand::StencilMask { mask });
    }

    fn clear_stencil(&mut self) {
        self.commands.push(GpuCommand::ClearStencil {
            mask: self.masks.stencil,
        });
    }

    fn set_stencil_func(&mut self, func: CompareFunction, reference: u8, mask: u8) {
        self.commands.push(GpuCommand::StencilFunc {
            func,
            reference,
            mask,
        });
    }

    fn set_stencil_op(&mut self, face: Face, fail: StencilOp, depth_fail: StencilOp, pass: StencilOp) {
        self.commands.push(GpuCommand::StencilOp {
            face,
            fail,
            depth_fail,
            pass,
        });
    }

    fn set_line_width(&mut self, width: f32) {
        self.commands.push(GpuCommand::LineWidth { width });
    }

    fn bind_vertex_buffer(&mut self, buffer: BufferId, byte_offset: usize) {
        self.commands.push(GpuCommand::BindVertexBuffer {
            buffer,
            byte_offset,
        });
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.commands.push(GpuCommand::BindIndexBuffer { buffer });
    }

    fn draw_elements(&mut self, primitive: Primitive, count: usize, byte_offset: usize) {
        self.commands.push(GpuCommand::DrawElements {
            primitive,
            count,
            byte_offset,
        });
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: usize, count: usize) {
        self.commands.push(GpuCommand::DrawArrays {
            primitive,
            first,
            count,
        });
    }
}
