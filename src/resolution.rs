//! Effective resolution derivation.
//!
//! The (chunk size, step) pair actually handed to the evaluator is derived
//! from the parameter store at each evaluation, never cached or stored.

use crate::mode::ProcessMode;
use crate::params::WorldParams;

/// The resolution pair one evaluation runs at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EffectiveResolution {
    /// Side length of the evaluated chunk, in grid units
    pub chunk_size: u32,
    /// Sampling distance between grid points
    pub step: f32,
}

/// Resolve the resolution for one evaluation.
///
/// In `Normal` mode with the scaled preview enabled, the preview chunk size
/// and ratio-scaled step are substituted. `Geologic` mode always reads the
/// real fields: the sweep has already overridden the step, and an active
/// editor preview must not leak into baked data.
pub fn effective_resolution(params: &WorldParams, mode: ProcessMode) -> EffectiveResolution {
    let preview = params.scaled_preview();
    if mode == ProcessMode::Normal && preview.enabled {
        EffectiveResolution {
            chunk_size: preview.chunk_size,
            step: params.step() * preview.ratio,
        }
    } else {
        EffectiveResolution {
            chunk_size: params.chunk_size(),
            step: params.step(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_without_preview_passes_real_values_through() {
        let params = WorldParams::default();
        let res = effective_resolution(&params, ProcessMode::Normal);
        assert_eq!(res.chunk_size, params.chunk_size());
        assert_eq!(res.step, params.step());
    }

    #[test]
    fn test_normal_with_preview_substitutes() {
        let mut params = WorldParams::default();
        params.set_scaled_preview_enabled(true);

        let res = effective_resolution(&params, ProcessMode::Normal);
        assert_eq!(res.chunk_size, 32);
        assert_eq!(res.step, 1.0 * 8.0);
    }

    #[test]
    fn test_geologic_bypasses_preview() {
        let mut params = WorldParams::default();
        params.set_scaled_preview_enabled(true);

        let res = effective_resolution(&params, ProcessMode::Geologic);
        assert_eq!(res.chunk_size, 16);
        assert_eq!(res.step, 1.0);
    }

    #[test]
    fn test_preview_step_scales_with_real_step() {
        let mut params = WorldParams::default();
        assert!(params.set_step(0.25));
        params.set_scaled_preview_enabled(true);

        let res = effective_resolution(&params, ProcessMode::Normal);
        assert_eq!(res.step, 0.25 * 8.0);
    }
}
