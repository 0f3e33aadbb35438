use crate::model::{PackerStats, Rect};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// A fixed-height row of the atlas. Allocations are handed out left to right.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shelf {
    y: u32,
    width: u32,
    height: u32,
    free: u32,
    cursor_x: u32,
}

impl Shelf {
    fn new(y: u32, width: u32, height: u32) -> Self {
        Self {
            y,
            width,
            height,
            free: width,
            cursor_x: 0,
        }
    }

    /// Top edge of the shelf inside the atlas.
    pub fn y_offset(&self) -> u32 {
        self.y
    }
    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn height(&self) -> u32 {
        self.height
    }
    /// Horizontal space still available to the right of the cursor.
    pub fn free_width(&self) -> u32 {
        self.free
    }
    /// X coordinate of the next allocation.
    pub fn cursor_x(&self) -> u32 {
        self.cursor_x
    }

    fn fits(&self, w: u32, h: u32) -> bool {
        w <= self.free && h <= self.height
    }

    fn alloc(&mut self, w: u32, h: u32) -> Option<Rect> {
        if !self.fits(w, h) {
            return None;
        }
        let x = self.cursor_x;
        self.cursor_x += w;
        self.free -= w;
        Some(Rect::new(x, self.y, w, h))
    }

    fn resize(&mut self, w: u32) -> bool {
        if w < self.width {
            return false;
        }
        self.free += w - self.width;
        self.width = w;
        true
    }
}

/// Shelf Best Height Fit bin packer.
///
/// Allocation prefers a shelf of exactly the requested height, then the shelf with the
/// least vertical waste (earliest wins ties), and only then opens a new shelf below the
/// existing ones. Shelves are never removed or reordered, and [`release`](Self::release)
/// does not reclaim space, so earlier placements stay where they are for the lifetime of
/// the packer.
#[derive(Debug, Clone)]
pub struct ShelfBinPacker {
    width: u32,
    height: u32,
    shelves: Vec<Shelf>,
    // Diagnostic only; never consulted when choosing a shelf.
    histogram: BTreeMap<u32, usize>,
    used_area: u64,
}

impl ShelfBinPacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            shelves: Vec::new(),
            histogram: BTreeMap::new(),
            used_area: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Shelves in creation order (top to bottom).
    pub fn shelves(&self) -> &[Shelf] {
        &self.shelves
    }

    /// Number of successful allocations per requested height.
    pub fn height_histogram(&self) -> &BTreeMap<u32, usize> {
        &self.histogram
    }

    /// Sum of the heights of all shelves.
    pub fn used_height(&self) -> u32 {
        self.shelves.iter().map(|s| s.height).sum()
    }

    /// Reserve a `req_w` x `req_h` rectangle.
    ///
    /// Returns `None` when no shelf can take the request and there is not enough room left
    /// below the last shelf to open a new one. Nothing is modified in that case.
    pub fn allocate(&mut self, req_w: u32, req_h: u32) -> Option<Rect> {
        if req_w == 0 || req_h == 0 {
            return None;
        }

        let mut y = 0;
        let mut best: Option<(usize, u32)> = None;
        for (i, shelf) in self.shelves.iter().enumerate() {
            y += shelf.height;

            // exact height with width to spare: take it
            if req_h == shelf.height && req_w <= shelf.free {
                return self.alloc_in(i, req_w, req_h);
            }
            if req_h > shelf.height || req_w > shelf.free {
                continue;
            }
            let waste = shelf.height - req_h;
            if best.is_none_or(|(_, w)| waste < w) {
                best = Some((i, waste));
            }
        }

        if let Some((i, _)) = best {
            return self.alloc_in(i, req_w, req_h);
        }

        if req_h <= self.height.saturating_sub(y) && req_w <= self.width {
            debug!(y, height = req_h, index = self.shelves.len(), "open shelf");
            self.shelves.push(Shelf::new(y, self.width, req_h));
            return self.alloc_in(self.shelves.len() - 1, req_w, req_h);
        }

        trace!(w = req_w, h = req_h, "allocation failed: out of space");
        None
    }

    fn alloc_in(&mut self, index: usize, w: u32, h: u32) -> Option<Rect> {
        let rect = self.shelves[index].alloc(w, h)?;
        *self.histogram.entry(h).or_insert(0) += 1;
        self.used_area += rect.area();
        trace!(shelf = index, x = rect.x, y = rect.y, w, h, "allocated");
        Some(rect)
    }

    /// Space is never reclaimed: this is intentionally a no-op so that existing
    /// placements (and the shelves they live on) stay stable for the packer's lifetime.
    pub fn release(&mut self, _rect: &Rect) {}

    /// Grow the packer. Shrinking in either dimension is rejected with `false` and leaves
    /// the packer untouched. Shelves keep their heights and offsets; each gains
    /// `req_w - width` free width.
    pub fn resize(&mut self, req_w: u32, req_h: u32) -> bool {
        if req_w < self.width || req_h < self.height {
            return false;
        }
        debug!(
            from_w = self.width,
            from_h = self.height,
            to_w = req_w,
            to_h = req_h,
            "resize packer"
        );
        self.width = req_w;
        self.height = req_h;
        for shelf in &mut self.shelves {
            shelf.resize(req_w);
        }
        true
    }

    pub fn stats(&self) -> PackerStats {
        let total = (self.width as u64) * (self.height as u64);
        PackerStats {
            width: self.width,
            height: self.height,
            num_shelves: self.shelves.len(),
            num_allocations: self.histogram.values().sum(),
            used_height: self.used_height(),
            used_area: self.used_area,
            occupancy: if total > 0 {
                self.used_area as f64 / total as f64
            } else {
                0.0
            },
            height_histogram: self.histogram.clone(),
        }
    }
}
