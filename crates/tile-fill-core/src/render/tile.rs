use super::gpu::BufferId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of geometry units along one edge of a tile.
pub const EXTENT: f32 = 4096.0;

/// Most vertices one [`ElementGroup`] can address with 16-bit indices.
pub const MAX_GROUP_VERTICES: usize = u16::MAX as usize;

/// Column-major 4x4 matrix as uploaded to the GPU.
pub type Mat4 = [f32; 16];

/// Tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

/// Vertex buffer handle. `item_size` is the byte stride of one vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexBuffer {
    pub id: BufferId,
    pub item_size: usize,
}

/// Index buffer handle. `item_size` is the byte size of one primitive: 6 for a triangle
/// (three u16 indices), 4 for a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBuffer {
    pub id: BufferId,
    pub item_size: usize,
}

/// Array buffer drawn with `draw_arrays`, e.g. the quad covering a whole tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexArray {
    pub buffer: BufferId,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBuffers {
    pub fill_vertex: VertexBuffer,
    /// Triangle list.
    pub fill_element: IndexBuffer,
    /// Line list used for outlines.
    pub fill_second_element: IndexBuffer,
}

/// A contiguous slice of a tile's shared buffers.
///
/// `element_*` counts triangles and `second_element_*` counts lines. Indices inside a
/// group are relative to `vertex_start_index`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementGroup {
    pub vertex_start_index: usize,
    #[serde(default)]
    pub vertex_length: usize,
    pub element_start_index: usize,
    pub element_length: usize,
    pub second_element_start_index: usize,
    pub second_element_length: usize,
}

/// The groups holding one layer's geometry, in storage order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementGroups {
    groups: Vec<ElementGroup>,
}

impl ElementGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_groups(groups: Vec<ElementGroup>) -> Self {
        Self { groups }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ElementGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Returns the group that should receive `num_vertices` more vertices, opening a new one
    /// at the current buffer positions when the last group would overflow 16-bit indices.
    ///
    /// `vertex_pos`, `element_pos` and `second_element_pos` are the current lengths of the
    /// vertex, triangle and line buffers.
    pub fn make_room_for(
        &mut self,
        num_vertices: usize,
        vertex_pos: usize,
        element_pos: usize,
        second_element_pos: usize,
    ) -> &mut ElementGroup {
        let needs_new = self
            .groups
            .last()
            .is_none_or(|g| g.vertex_length + num_vertices > MAX_GROUP_VERTICES);
        if needs_new {
            self.groups.push(ElementGroup {
                vertex_start_index: vertex_pos,
                vertex_length: 0,
                element_start_index: element_pos,
                element_length: 0,
                second_element_start_index: second_element_pos,
                second_element_length: 0,
            });
        }
        let last = self.groups.len() - 1;
        &mut self.groups[last]
    }
}

impl<'a> IntoIterator for &'a ElementGroups {
    type Item = &'a ElementGroup;
    type IntoIter = std::slice::Iter<'a, ElementGroup>;
    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Decoded tile geometry as seen by the renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    /// Native address of the tile data.
    pub coord: TileCoord,
    /// Tile size in pixels at its native zoom.
    pub tile_size: f32,
    /// `None` until the tile's buffers have been uploaded.
    #[serde(default)]
    pub buffers: Option<TileBuffers>,
    /// Fill geometry keyed by layer id.
    #[serde(default)]
    pub element_groups: HashMap<String, ElementGroups>,
}

impl Tile {
    pub fn new(coord: TileCoord, tile_size: f32) -> Self {
        Self {
            coord,
            tile_size,
            buffers: None,
            element_groups: HashMap::new(),
        }
    }

    pub fn with_buffers(mut self, buffers: TileBuffers) -> Self {
        self.buffers = Some(buffers);
        self
    }

    pub fn with_groups(mut self, layer: impl Into<String>, groups: ElementGroups) -> Self {
        self.element_groups.insert(layer.into(), groups);
        self
    }
}

/// Where the renderer gets tiles from.
pub trait TileSource {
    fn tile(&self, coord: &TileCoord) -> Option<&Tile>;
    /// Highest zoom level the source has data for.
    fn max_zoom(&self) -> u8;
}

/// In-memory [`TileSource`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TileSet {
    pub max_zoom: u8,
    #[serde(with = "tile_list")]
    pub tiles: HashMap<TileCoord, Tile>,
}

impl TileSet {
    pub fn new(max_zoom: u8) -> Self {
        Self {
            max_zoom,
            tiles: HashMap::new(),
        }
    }

    pub fn insert(&mut self, tile: Tile) {
        self.tiles.insert(tile.coord, tile);
    }

    /// Coordinates of every tile, lowest zoom first.
    pub fn coords(&self) -> Vec<TileCoord> {
        let mut coords: Vec<TileCoord> = self.tiles.keys().copied().collect();
        coords.sort_unstable();
        coords
    }
}

impl TileSource for TileSet {
    fn tile(&self, coord: &TileCoord) -> Option<&Tile> {
        self.tiles.get(coord)
    }
    fn max_zoom(&self) -> u8 {
        self.max_zoom
    }
}

// JSON object keys must be strings; store tiles as a list and key them by their coord.
mod tile_list {
    use super::{Tile, TileCoord};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::HashMap;

    pub fn serialize<S: Serializer>(
        tiles: &HashMap<TileCoord, Tile>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        s.collect_seq(tiles.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<HashMap<TileCoord, Tile>, D::Error> {
        let list = Vec::<Tile>::deserialize(d)?;
        Ok(list.into_iter().map(|t| (t.coord, t)).collect())
    }
}
