//! Atlas space allocation.
//!
//! Only the shelf strategy is provided: allocations are placed left-to-right on fixed-height
//! rows, and space is never reclaimed, so the layout of an atlas only ever grows.

pub mod shelf;

pub use shelf::{Shelf, ShelfBinPacker};
