//! Chunk-local field storage and the terrain output artifact.

use crate::math::Vec3;

/// A square, row-major grid of per-sample values for one chunk.
#[derive(Clone, PartialEq)]
pub struct ChunkField<T> {
    size: usize,
    data: Vec<T>,
}

impl<T: Clone + Default> ChunkField<T> {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            data: vec![T::default(); size * size],
        }
    }
}

impl<T: Clone> ChunkField<T> {
    pub fn new_with(size: usize, value: T) -> Self {
        Self {
            size,
            data: vec![value; size * size],
        }
    }

    /// Side length of the field, in samples.
    pub fn size(&self) -> usize {
        self.size
    }

    fn index(&self, x: usize, y: usize) -> usize {
        y * self.size + x
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.data[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let idx = self.index(x, y);
        &mut self.data[idx]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// All samples in row-major order.
    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.data
    }
}

/// The displayable terrain produced by a Normal-mode evaluation.
///
/// Size and step record the *effective* resolution the artifact was sampled
/// at, which differs from the authoritative parameters while a scaled
/// preview is active.
#[derive(Clone, PartialEq)]
pub struct FinalTerrain {
    /// World-space anchor the chunk was evaluated at
    pub chunk_position: Vec3,
    /// Side length the artifact was sampled at, in grid units
    pub chunk_size: u32,
    /// Sampling distance the artifact was sampled at
    pub step: f32,
    /// Elevation per grid point
    pub heights: ChunkField<f32>,
}
