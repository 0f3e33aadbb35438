#![allow(dead_code)]

use std::collections::HashMap;
use tile_fill_core::prelude::*;

pub const VERTEX_STRIDE: usize = 4; // two i16
pub const TRIANGLE_SIZE: usize = 6; // three u16
pub const LINE_SIZE: usize = 4; // two u16

pub const VERTEX_BUFFER: BufferId = BufferId(1);
pub const TRIANGLE_BUFFER: BufferId = BufferId(2);
pub const LINE_BUFFER: BufferId = BufferId(3);
pub const EXTENT_BUFFER: BufferId = BufferId(4);

/// Lets a test painter interleave its own events with the GPU stream.
pub trait Annotate {
    fn note(&mut self, _label: String) {}
}

impl Annotate for RecordingContext {
    fn note(&mut self, label: String) {
        self.marker(label);
    }
}

/// Atlas backed by a fixed map of positions.
#[derive(Default)]
pub struct StaticAtlas(pub HashMap<String, ImagePosition>);

impl PatternAtlas for StaticAtlas {
    fn position(&self, id: &str) -> Option<ImagePosition> {
        self.0.get(id).copied()
    }
}

/// Painter with identity matrices; the translate matrix carries the paint translation in
/// its last column so tests can tell the two apart.
pub struct TestPainter<G> {
    pub gpu: G,
    pub pass: RenderPass,
    pub atlas: StaticAtlas,
    pub tile_zoom: f32,
    pub device_pixel_ratio: f32,
    pub extent: VertexArray,
    pub sublayers: Vec<u8>,
    pub clip_calls: usize,
    pub atlas_binds: usize,
}

impl<G: GpuContext + Annotate> TestPainter<G> {
    pub fn new(gpu: G, pass: RenderPass) -> Self {
        Self {
            gpu,
            pass,
            atlas: StaticAtlas::default(),
            tile_zoom: 0.0,
            device_pixel_ratio: 1.0,
            extent: VertexArray {
                buffer: EXTENT_BUFFER,
                count: 4,
            },
            sublayers: Vec::new(),
            clip_calls: 0,
            atlas_binds: 0,
        }
    }
}

pub fn identity() -> Mat4 {
    let mut m = [0.0; 16];
    m[0] = 1.0;
    m[5] = 1.0;
    m[10] = 1.0;
    m[15] = 1.0;
    m
}

impl<G: GpuContext + Annotate> Painter for TestPainter<G> {
    type Gpu = G;

    fn gpu(&mut self) -> &mut G {
        &mut self.gpu
    }

    fn pass(&self) -> RenderPass {
        self.pass
    }

    fn calculate_matrix(&self, _coord: &TileCoord, _max_zoom: u8) -> Mat4 {
        identity()
    }

    fn translate_matrix(
        &self,
        matrix: &Mat4,
        _tile: &Tile,
        translate: [f32; 2],
        _anchor: TranslateAnchor,
    ) -> Mat4 {
        let mut m = *matrix;
        m[12] += translate[0];
        m[13] += translate[1];
        m
    }

    fn set_clipping_mask(&mut self, coord: &TileCoord) {
        self.clip_calls += 1;
        self.gpu.note(format!("clip {coord}"));
        self.gpu.set_stencil_func(CompareFunction::Equal, 0x80, 0x80);
    }

    fn set_sublayer(&mut self, n: u8) {
        self.sublayers.push(n);
        self.gpu.note(format!("sublayer {n}"));
    }

    fn tile_zoom(&self) -> f32 {
        self.tile_zoom
    }

    fn device_pixel_ratio(&self) -> f32 {
        self.device_pixel_ratio
    }

    fn drawing_buffer_size(&self) -> [f32; 2] {
        [800.0, 600.0]
    }

    fn tile_extent_buffer(&self) -> VertexArray {
        self.extent
    }

    fn sprite_atlas(&self) -> &dyn PatternAtlas {
        &self.atlas
    }

    fn bind_sprite_atlas(&mut self) {
        self.atlas_binds += 1;
        self.gpu.note("bind atlas".into());
    }
}

/// Triangle fan and outline for each ring, written into one group's worth of buffers.
#[derive(Default)]
pub struct Geometry {
    pub vertices: Vec<[i16; 2]>,
    pub triangles: Vec<u16>,
    pub lines: Vec<u16>,
}

impl Geometry {
    /// Add a closed ring (first point not repeated). Orientation is preserved.
    pub fn ring(&mut self, points: &[[i16; 2]]) -> &mut Self {
        let base = self.vertices.len() as u16;
        self.vertices.extend_from_slice(points);
        let n = points.len() as u16;
        for i in 1..n - 1 {
            self.triangles.extend_from_slice(&[base, base + i, base + i + 1]);
        }
        for i in 0..n {
            self.lines.extend_from_slice(&[base + i, base + (i + 1) % n]);
        }
        self
    }

    /// Lay several independently indexed geometries out back to back, one group each.
    pub fn batched(parts: &[Geometry]) -> (Geometry, Vec<ElementGroup>) {
        let mut out = Geometry::default();
        let mut groups = Vec::new();
        for part in parts {
            groups.push(ElementGroup {
                vertex_start_index: out.vertices.len(),
                vertex_length: part.vertices.len(),
                element_start_index: out.triangles.len() / 3,
                element_length: part.triangles.len() / 3,
                second_element_start_index: out.lines.len() / 2,
                second_element_length: part.lines.len() / 2,
            });
            out.vertices.extend_from_slice(&part.vertices);
            out.triangles.extend_from_slice(&part.triangles);
            out.lines.extend_from_slice(&part.lines);
        }
        (out, groups)
    }

    pub fn group(&self) -> ElementGroup {
        ElementGroup {
            vertex_start_index: 0,
            vertex_length: self.vertices.len(),
            element_start_index: 0,
            element_length: self.triangles.len() / 3,
            second_element_start_index: 0,
            second_element_length: self.lines.len() / 2,
        }
    }
}

pub fn buffers() -> TileBuffers {
    TileBuffers {
        fill_vertex: VertexBuffer {
            id: VERTEX_BUFFER,
            item_size: VERTEX_STRIDE,
        },
        fill_element: IndexBuffer {
            id: TRIANGLE_BUFFER,
            item_size: TRIANGLE_SIZE,
        },
        fill_second_element: IndexBuffer {
            id: LINE_BUFFER,
            item_size: LINE_SIZE,
        },
    }
}

/// A tile set holding one loaded tile at 0/0/0 with the given groups for `layer`.
pub fn tile_set(layer: &str, groups: Vec<ElementGroup>) -> TileSet {
    let mut set = TileSet::new(14);
    set.insert(
        Tile::new(TileCoord::new(0, 0, 0), 512.0)
            .with_buffers(buffers())
            .with_groups(layer, ElementGroups::from_groups(groups)),
    );
    set
}

pub fn origin() -> TileCoord {
    TileCoord::new(0, 0, 0)
}

/// Minimal software GPU: a square framebuffer with a stencil and a color plane.
///
/// Vertex positions are pixel coordinates. Triangles with positive signed area
/// (counter-clockwise with y pointing up) are front facing. Pixel centres on a shared
/// edge are owned by exactly one of the triangles.
pub struct SoftwareGpu {
    pub size: usize,
    pub stencil: Vec<u8>,
    pub color: Vec<Option<[f32; 4]>>,
    masks: MaskState,
    func: (CompareFunction, u8, u8),
    front_pass: StencilOp,
    back_pass: StencilOp,
    vertex_buffers: HashMap<BufferId, Vec<[i16; 2]>>,
    index_buffers: HashMap<BufferId, Vec<u16>>,
    bound_vertex: (BufferId, usize),
    bound_index: BufferId,
    program: Program,
    uniforms: HashMap<&'static str, Uniform>,
    pub lines_drawn: usize,
}

impl Annotate for SoftwareGpu {}

impl SoftwareGpu {
    /// Every pixel starts with the clip bit set.
    pub fn new(size: usize, geometry: &Geometry) -> Self {
        let s = size as i16;
        let mut vertex_buffers = HashMap::new();
        vertex_buffers.insert(VERTEX_BUFFER, geometry.vertices.clone());
        vertex_buffers.insert(EXTENT_BUFFER, vec![[0, 0], [s, 0], [0, s], [s, s]]);
        let mut index_buffers = HashMap::new();
        index_buffers.insert(TRIANGLE_BUFFER, geometry.triangles.clone());
        index_buffers.insert(LINE_BUFFER, geometry.lines.clone());
        Self {
            size,
            stencil: vec![0x80; size * size],
            color: vec![None; size * size],
            masks: MaskState {
                color: true,
                depth: true,
                stencil: 0xFF,
            },
            func: (CompareFunction::Always, 0, 0xFF),
            front_pass: StencilOp::Keep,
            back_pass: StencilOp::Keep,
            vertex_buffers,
            index_buffers,
            bound_vertex: (VERTEX_BUFFER, 0),
            bound_index: TRIANGLE_BUFFER,
            program: Program::Fill,
            uniforms: HashMap::new(),
            lines_drawn: 0,
        }
    }

    pub fn masks(&self) -> MaskState {
        self.masks
    }

    pub fn is_colored(&self, x: usize, y: usize) -> bool {
        self.color[y * self.size + x].is_some()
    }

    pub fn colored_count(&self) -> usize {
        self.color.iter().filter(|c| c.is_some()).count()
    }

    /// Clear the clip bit for every pixel in columns `x0..x1`.
    pub fn clip_out_columns(&mut self, x0: usize, x1: usize) {
        for y in 0..self.size {
            for x in x0..x1 {
                self.stencil[y * self.size + x] &= 0x7F;
            }
        }
    }

    fn vertex(&self, index: usize) -> [i64; 2] {
        let (buffer, offset) = self.bound_vertex;
        let v = self.vertex_buffers[&buffer][offset / VERTEX_STRIDE + index];
        [v[0] as i64 * 2, v[1] as i64 * 2]
    }

    fn fragment_color(&self) -> [f32; 4] {
        match (self.program, self.uniforms.get("u_color")) {
            (Program::Fill, Some(Uniform::Vec4(c))) => *c,
            _ => [1.0, 1.0, 1.0, 1.0],
        }
    }

    fn raster_triangle(&mut self, a: [i64; 2], b: [i64; 2], c: [i64; 2]) {
        let area = cross(a, b, c);
        if area == 0 {
            return;
        }
        let front = area > 0;
        let (b, c) = if front { (b, c) } else { (c, b) };
        let op = if front { self.front_pass } else { self.back_pass };
        let color = self.fragment_color();
        let (func, reference, mask) = self.func;
        for py in 0..self.size {
            for px in 0..self.size {
                let p = [px as i64 * 2 + 1, py as i64 * 2 + 1];
                if !(covers(a, b, p) && covers(b, c, p) && covers(c, a, p)) {
                    continue;
                }
                let i = py * self.size + px;
                if !func.test(reference, self.stencil[i], mask) {
                    continue;
                }
                self.stencil[i] = op.apply(self.stencil[i], reference, self.masks.stencil);
                if self.masks.color {
                    self.color[i] = Some(color);
                }
            }
        }
    }
}

fn cross(a: [i64; 2], b: [i64; 2], c: [i64; 2]) -> i64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

// Inside test for one edge of a positively oriented triangle, with a tie rule so that a
// centre lying on an edge shared by two triangles is claimed by exactly one of them.
fn covers(from: [i64; 2], to: [i64; 2], p: [i64; 2]) -> bool {
    let e = cross(from, to, p);
    let d = [to[0] - from[0], to[1] - from[1]];
    e > 0 || (e == 0 && (d[1] > 0 || (d[1] == 0 && d[0] < 0)))
}

impl GpuContext for SoftwareGpu {
    fn use_program(&mut self, program: Program) {
        self.program = program;
    }

    fn set_uniform(&mut self, name: &'static str, value: Uniform) {
        self.uniforms.insert(name, value);
    }

    fn color_mask(&self) -> bool {
        self.masks.color
    }

    fn set_color_mask(&mut self, enabled: bool) {
        self.masks.color = enabled;
    }

    fn depth_mask(&self) -> bool {
        self.masks.depth
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.masks.depth = enabled;
    }

    fn stencil_mask(&self) -> u8 {
        self.masks.stencil
    }

    fn set_stencil_mask(&mut self, mask: u8) {
        self.masks.stencil = mask;
    }

    fn clear_stencil(&mut self) {
        let mask = self.masks.stencil;
        for s in &mut self.stencil {
            *s &= !mask;
        }
    }

    fn set_stencil_func(&mut self, func: CompareFunction, reference: u8, mask: u8) {
        self.func = (func, reference, mask);
    }

    fn set_stencil_op(&mut self, face: Face, _fail: StencilOp, _depth_fail: StencilOp, pass: StencilOp) {
        match face {
            Face::Front => self.front_pass = pass,
            Face::Back => self.back_pass = pass,
            Face::FrontAndBack => {
                self.front_pass = pass;
                self.back_pass = pass;
            }
        }
    }

    fn set_line_width(&mut self, _width: f32) {}

    fn bind_vertex_buffer(&mut self, buffer: BufferId, byte_offset: usize) {
        self.bound_vertex = (buffer, byte_offset);
    }

    fn bind_index_buffer(&mut self, buffer: BufferId) {
        self.bound_index = buffer;
    }

    fn draw_elements(&mut self, primitive: Primitive, count: usize, byte_offset: usize) {
        let start = byte_offset / 2;
        let indices: Vec<usize> = self.index_buffers[&self.bound_index][start..start + count]
            .iter()
            .map(|i| *i as usize)
            .collect();
        match primitive {
            Primitive::Triangles => {
                for tri in indices.chunks_exact(3) {
                    let (a, b, c) = (self.vertex(tri[0]), self.vertex(tri[1]), self.vertex(tri[2]));
                    self.raster_triangle(a, b, c);
                }
            }
            Primitive::Lines => self.lines_drawn += count / 2,
            Primitive::TriangleStrip => unreachable!("strips are drawn with draw_arrays"),
        }
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: usize, count: usize) {
        assert_eq!(primitive, Primitive::TriangleStrip);
        let verts: Vec<[i64; 2]> = (first..first + count).map(|i| self.vertex(i)).collect();
        for w in verts.windows(3) {
            self.raster_triangle(w[0], w[1], w[2]);
        }
    }
}
