//! Simulation parameters for a world graph.
//!
//! Mutators are guarded assignments: they commit the new value and report
//! whether the matching change notification should fire. Dispatch itself
//! lives on [`WorldGraph`](crate::graph::WorldGraph), so state mutation stays
//! testable without any listener plumbing attached.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Editor-only resolution override.
///
/// While enabled, evaluation substitutes `chunk_size` and multiplies the
/// real step by `ratio`, without touching the authoritative parameters:
/// disabling the preview instantly restores real-mode resolution with no
/// stored state to rebuild.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaledPreview {
    /// Whether the preview override is active
    pub enabled: bool,
    /// Multiplier applied to the real step while the preview is active
    pub ratio: f32,
    /// Chunk side length substituted while the preview is active
    pub chunk_size: u32,
}

impl Default for ScaledPreview {
    fn default() -> Self {
        Self {
            enabled: false,
            ratio: 8.0,
            chunk_size: 32,
        }
    }
}

/// The parameter block shared by every evaluation of one graph.
///
/// Serializable so the embedding application can persist it alongside the
/// graph; runtime state (mode, baked data, flags) lives on the graph itself
/// and is never serialized.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorldParams {
    /// Generation entropy source
    seed: u64,
    /// Nominal chunk side length, in grid units
    chunk_size: u32,
    /// World-space anchor of the chunk being evaluated
    chunk_position: Vec3,
    /// Nominal sampling distance between grid points
    step: f32,
    /// Sampling distance for the coarse geologic pass, independent of `step`
    geologic_step: f32,
    /// Side length, in chunks, of the geologic precomputation grid
    geologic_distance_check: u32,
    /// Upper bound for step controls in editors; carries no change event
    max_step: f32,
    scaled_preview: ScaledPreview,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            seed: 0,
            chunk_size: 16,
            chunk_position: Vec3::zero(),
            step: 1.0,
            geologic_step: 8.0,
            geologic_distance_check: 2,
            max_step: 4.0,
            scaled_preview: ScaledPreview::default(),
        }
    }
}

impl WorldParams {
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Commit a new seed. Returns whether a notification should fire.
    #[must_use]
    pub fn set_seed(&mut self, value: u64) -> bool {
        if self.seed == value {
            return false;
        }
        self.seed = value;
        true
    }

    /// The authoritative chunk size. Never affected by the scaled preview;
    /// the substituted value only exists as derived effective resolution.
    pub fn chunk_size(&self) -> u32 {
        self.chunk_size
    }

    /// Commit a new chunk size. A silent no-op while the scaled preview is
    /// enabled, so preview-mode edits cannot corrupt the real baseline.
    #[must_use]
    pub fn set_chunk_size(&mut self, value: u32) -> bool {
        if self.scaled_preview.enabled || self.chunk_size == value {
            return false;
        }
        self.chunk_size = value;
        true
    }

    pub fn chunk_position(&self) -> Vec3 {
        self.chunk_position
    }

    #[must_use]
    pub fn set_chunk_position(&mut self, value: Vec3) -> bool {
        if self.chunk_position == value {
            return false;
        }
        self.chunk_position = value;
        true
    }

    /// The authoritative step. Never affected by the scaled preview.
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Commit a new step. A silent no-op while the scaled preview is
    /// enabled.
    #[must_use]
    pub fn set_step(&mut self, value: f32) -> bool {
        if self.scaled_preview.enabled || self.step == value {
            return false;
        }
        self.step = value;
        true
    }

    /// Write the raw step, skipping the preview freeze and firing nothing.
    ///
    /// Reserved for the geologic sweep's scoped override: the value is
    /// transient and restored before any caller can observe it.
    pub(crate) fn override_step(&mut self, value: f32) {
        self.step = value;
    }

    pub fn geologic_step(&self) -> f32 {
        self.geologic_step
    }

    #[must_use]
    pub fn set_geologic_step(&mut self, value: f32) -> bool {
        if self.geologic_step == value {
            return false;
        }
        self.geologic_step = value;
        true
    }

    pub fn geologic_distance_check(&self) -> u32 {
        self.geologic_distance_check
    }

    pub fn set_geologic_distance_check(&mut self, value: u32) {
        self.geologic_distance_check = value;
    }

    pub fn max_step(&self) -> f32 {
        self.max_step
    }

    pub fn set_max_step(&mut self, value: f32) {
        self.max_step = value;
    }

    pub fn scaled_preview(&self) -> ScaledPreview {
        self.scaled_preview
    }

    /// Flip the preview on or off. Carries no change event; the effective
    /// resolution is derived at evaluation time.
    pub fn set_scaled_preview_enabled(&mut self, enabled: bool) {
        self.scaled_preview.enabled = enabled;
    }

    /// Commit a new preview ratio. Fires the step-changed notification,
    /// since it alters the effective step an editor displays.
    #[must_use]
    pub fn set_scaled_preview_ratio(&mut self, value: f32) -> bool {
        if self.scaled_preview.ratio == value {
            return false;
        }
        self.scaled_preview.ratio = value;
        true
    }

    /// Commit a new preview chunk size. Fires the chunk-size-changed
    /// notification.
    #[must_use]
    pub fn set_scaled_preview_chunk_size(&mut self, value: u32) -> bool {
        if self.scaled_preview.chunk_size == value {
            return false;
        }
        self.scaled_preview.chunk_size = value;
        true
    }
}
