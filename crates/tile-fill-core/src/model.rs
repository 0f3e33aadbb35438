use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pixel rectangle in atlas space, origin at the top-left corner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Exclusive right edge (`x + w`).
    pub fn x2(&self) -> u32 {
        self.x + self.w
    }
    /// Exclusive bottom edge (`y + h`).
    pub fn y2(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u64 {
        (self.w as u64) * (self.h as u64)
    }
    /// Returns true if the two rectangles share at least one pixel.
    pub fn intersects(&self, other: &Rect) -> bool {
        !(self.x >= other.x2() || other.x >= self.x2() || self.y >= other.y2() || other.y >= self.y2())
    }
}

/// Where a sprite image lives inside the atlas texture.
///
/// `tl`/`br` are normalized texture coordinates of the image interior (padding excluded);
/// `size` is the image size in logical pixels, i.e. physical pixels divided by the image's
/// pixel ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ImagePosition {
    pub tl: [f32; 2],
    pub br: [f32; 2],
    pub size: [f32; 2],
}

/// Statistics about a shelf packer's occupancy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackerStats {
    /// Current packer width.
    pub width: u32,
    /// Current packer height.
    pub height: u32,
    /// Number of shelves created so far.
    pub num_shelves: usize,
    /// Number of successful allocations.
    pub num_allocations: usize,
    /// Sum of shelf heights (vertical space consumed by shelves).
    pub used_height: u32,
    /// Sum of all allocated rectangle areas.
    pub used_area: u64,
    /// used_area / (width * height), 0.0 to 1.0.
    pub occupancy: f64,
    /// Successful allocations bucketed by requested height.
    pub height_histogram: BTreeMap<u32, usize>,
}

impl PackerStats {
    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Size: {}x{}, Shelves: {}, Allocations: {}, Used Height: {} px, Occupancy: {:.2}%",
            self.width,
            self.height,
            self.num_shelves,
            self.num_allocations,
            self.used_height,
            self.occupancy * 100.0,
        )
    }

    /// Area not covered by any allocation.
    pub fn wasted_area(&self) -> u64 {
        let total = (self.width as u64) * (self.height as u64);
        total.saturating_sub(self.used_area)
    }
}
