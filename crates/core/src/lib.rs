//! `recap-core`: cell values, grid snapshots and the value normalizer.
//!
//! Shared by the drill engine and the file adapters. No IO.

pub mod grid;
pub mod value;

pub use grid::{Coord, Grid};
pub use value::{normalize, CellValue};
