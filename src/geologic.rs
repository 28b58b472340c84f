//! Baked geologic data: the coarse precomputation artifact.
//!
//! Geologic data is neighborhood-dependent (moisture flow, biome boundaries,
//! structure placement), so it is baked at a coarse step over a grid of
//! cells larger than one chunk before any chunk's fine terrain can be
//! derived consistently.

use std::collections::HashMap;

use crate::terrain::ChunkField;

/// Coarse maps baked for one cell of the precomputation grid.
#[derive(Clone, PartialEq)]
pub struct BakedCellMaps {
    /// Sampling distance the cell was baked at
    pub step: f32,
    /// Coarse elevation
    pub terrain: ChunkField<f32>,
    /// Moisture, 0.0-1.0
    pub wetness: ChunkField<f32>,
    /// Temperature, 0.0-1.0 normalized
    pub temperature: ChunkField<f32>,
}

/// The single mutable baked-data slot owned by a graph instance.
///
/// Cells are written by Geologic-mode evaluations and persist until the next
/// bake overwrites them; the slot is never reset automatically and is never
/// serialized. Its lifetime spans the graph instance, not one evaluation.
#[derive(Default)]
pub struct GeologicBakedData {
    cells: HashMap<(u32, u32), BakedCellMaps>,
}

impl GeologicBakedData {
    pub fn new() -> Self {
        Self {
            cells: HashMap::new(),
        }
    }

    /// Store the maps for one grid cell, replacing any previous bake of it.
    pub fn insert_cell(&mut self, x: u32, y: u32, maps: BakedCellMaps) {
        self.cells.insert((x, y), maps);
    }

    pub fn cell(&self, x: u32, y: u32) -> Option<&BakedCellMaps> {
        self.cells.get(&(x, y))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Drop every baked cell. Useful after shrinking the precomputation
    /// grid, when stale outer cells would otherwise linger.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}
