//! Reference graph evaluator built on layered Perlin sampling.
//!
//! Geologic evaluations bake coarse terrain/wetness/temperature fields for
//! the current sweep cell; Normal evaluations sample the fine height field
//! and damp it by any baked wetness covering the chunk, so the coarse pass
//! visibly feeds the fine one. Fully deterministic for a given parameter
//! set.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use noise::{NoiseFn, Perlin, Seedable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::evaluator::{AnchorKind, EvalContext, EvalError, GraphEvaluator, GridCell, NodeRef};
use crate::geologic::BakedCellMaps;
use crate::math::Vec2;
use crate::mode::ProcessMode;
use crate::terrain::{ChunkField, FinalTerrain};

/// Derive a system seed from the master seed and a system name.
fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}

/// Sample one Perlin field of `size` x `size` points spaced `step` apart,
/// anchored at world coordinates (`origin_x`, `origin_z`). Values are raw
/// noise in -1.0..1.0.
///
/// A seeded domain offset decorrelates fields that share a Perlin
/// permutation table but were derived for different systems.
fn noise_field(
    seed: u64,
    origin_x: f32,
    origin_z: f32,
    size: usize,
    step: f32,
    frequency: f64,
) -> ChunkField<f32> {
    let perlin = Perlin::new(1).set_seed(seed as u32);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let offset_x: f64 = rng.gen_range(-10_000.0..10_000.0);
    let offset_z: f64 = rng.gen_range(-10_000.0..10_000.0);

    let mut field = ChunkField::new(size);
    for y in 0..size {
        for x in 0..size {
            let wx = (origin_x + x as f32 * step) as f64;
            let wz = (origin_z + y as f32 * step) as f64;
            let value = perlin.get([wx * frequency + offset_x, wz * frequency + offset_z]);
            field.set(x, y, value as f32);
        }
    }
    field
}

/// Remap raw noise to the 0.0-1.0 range used by the wetness and
/// temperature maps.
fn to_unit(field: &mut ChunkField<f32>) {
    for value in field.values_mut() {
        *value = (*value + 1.0) * 0.5;
    }
}

/// A node installed through the boundary.
struct AnchorNode {
    kind: AnchorKind,
    position: Vec2,
    label: String,
}

/// Reference [`GraphEvaluator`] producing terrain from Perlin noise.
pub struct PerlinGraphEvaluator {
    nodes: Vec<AnchorNode>,
    terrains: HashMap<NodeRef, FinalTerrain>,
    /// Height amplitude, in world units
    pub amplitude: f32,
    /// Sampling frequency applied to world coordinates
    pub frequency: f64,
    /// How strongly baked wetness damps fine heights, 0.0-1.0
    pub wetness_damping: f32,
}

impl PerlinGraphEvaluator {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            terrains: HashMap::new(),
            amplitude: 64.0,
            frequency: 0.013,
            wetness_damping: 0.35,
        }
    }

    /// Label of an installed node, for editor display.
    pub fn node_label(&self, node: NodeRef) -> Option<&str> {
        self.nodes.get(node.0 as usize).map(|n| n.label.as_str())
    }

    /// Editor-plane position of an installed node.
    pub fn node_position(&self, node: NodeRef) -> Option<Vec2> {
        self.nodes.get(node.0 as usize).map(|n| n.position)
    }

    fn require_output_anchor(&self, node: NodeRef) -> Result<(), EvalError> {
        match self.nodes.get(node.0 as usize) {
            Some(anchor) if anchor.kind == AnchorKind::WorldOutput => Ok(()),
            _ => Err(EvalError::MissingAnchor(AnchorKind::WorldOutput)),
        }
    }

    fn bake_cell(&mut self, ctx: EvalContext<'_>) -> Result<(), EvalError> {
        self.require_output_anchor(ctx.output_node)?;

        let cell = ctx.cell.unwrap_or(GridCell { x: 0, y: 0 });
        let size = ctx.resolution.chunk_size as usize;
        let step = ctx.resolution.step;
        let span = size as f32 * step;
        let origin_x = ctx.chunk_position.x + cell.x as f32 * span;
        let origin_z = ctx.chunk_position.z + cell.y as f32 * span;

        let mut terrain = noise_field(
            derive_seed(ctx.seed, "geologic-terrain"),
            origin_x,
            origin_z,
            size,
            step,
            self.frequency,
        );
        for value in terrain.values_mut() {
            *value *= self.amplitude;
        }

        let mut wetness = noise_field(
            derive_seed(ctx.seed, "wetness"),
            origin_x,
            origin_z,
            size,
            step,
            self.frequency,
        );
        to_unit(&mut wetness);

        let mut temperature = noise_field(
            derive_seed(ctx.seed, "temperature"),
            origin_x,
            origin_z,
            size,
            step,
            self.frequency,
        );
        to_unit(&mut temperature);

        ctx.baked.insert_cell(
            cell.x,
            cell.y,
            BakedCellMaps {
                step,
                terrain,
                wetness,
                temperature,
            },
        );
        Ok(())
    }

    fn sample_terrain(&mut self, ctx: EvalContext<'_>) -> Result<(), EvalError> {
        self.require_output_anchor(ctx.output_node)?;

        let size = ctx.resolution.chunk_size as usize;
        let step = ctx.resolution.step;
        let mut heights = noise_field(
            derive_seed(ctx.seed, "terrain"),
            ctx.chunk_position.x,
            ctx.chunk_position.z,
            size,
            step,
            self.frequency,
        );
        for value in heights.values_mut() {
            *value *= self.amplitude;
        }

        // The chunk footprint sits inside sweep cell (0, 0) of the bake;
        // damp fine heights by its coarse wetness when one exists.
        if let Some(baked) = ctx.baked.cell(0, 0) {
            if baked.step > 0.0 {
                let coarse_size = baked.wetness.size();
                for y in 0..size {
                    for x in 0..size {
                        let cx = ((x as f32 * step / baked.step) as usize).min(coarse_size - 1);
                        let cy = ((y as f32 * step / baked.step) as usize).min(coarse_size - 1);
                        let wet = *baked.wetness.get(cx, cy);
                        *heights.get_mut(x, y) *= 1.0 - self.wetness_damping * wet;
                    }
                }
            }
        }

        self.terrains.insert(
            ctx.output_node,
            FinalTerrain {
                chunk_position: ctx.chunk_position,
                chunk_size: ctx.resolution.chunk_size,
                step,
                heights,
            },
        );
        Ok(())
    }
}

impl Default for PerlinGraphEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphEvaluator for PerlinGraphEvaluator {
    fn evaluate(&mut self, ctx: EvalContext<'_>) -> Result<(), EvalError> {
        match ctx.mode {
            ProcessMode::Geologic => self.bake_cell(ctx),
            ProcessMode::Normal => self.sample_terrain(ctx),
        }
    }

    fn create_node(
        &mut self,
        kind: AnchorKind,
        position: Vec2,
        label: &str,
        _is_input: bool,
        _is_output: bool,
    ) -> NodeRef {
        let node = NodeRef(self.nodes.len() as u32);
        self.nodes.push(AnchorNode {
            kind,
            position,
            label: label.to_string(),
        });
        node
    }

    fn output_terrain(&self, node: NodeRef) -> Option<&FinalTerrain> {
        self.terrains.get(&node)
    }
}
