//! The graph-evaluator boundary.
//!
//! The core never walks or mutates graph topology. It drives an opaque
//! collaborator through [`GraphEvaluator`] and only guarantees *when*, *how
//! often*, and *at what resolution* [`GraphEvaluator::evaluate`] runs.

use crate::geologic::GeologicBakedData;
use crate::math::{Vec2, Vec3};
use crate::mode::ProcessMode;
use crate::resolution::EffectiveResolution;
use crate::terrain::FinalTerrain;

/// Opaque handle to a node owned by the evaluator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeRef(pub u32);

/// The two anchor nodes installed at graph construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnchorKind {
    /// Entry anchor the evaluation context is fed through
    WorldInput,
    /// Exit anchor holding the final terrain
    WorldOutput,
}

/// One cell of the geologic precomputation grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridCell {
    pub x: u32,
    pub y: u32,
}

/// Everything one evaluation may read, snapshotted by the orchestrator.
pub struct EvalContext<'a> {
    /// Generation entropy source
    pub seed: u64,
    /// World-space anchor of the chunk being evaluated
    pub chunk_position: Vec3,
    /// Resolution actually in effect for this evaluation
    pub resolution: EffectiveResolution,
    /// Active processing mode
    pub mode: ProcessMode,
    /// True only while an external biome driver runs the evaluation
    pub processed_from_biome: bool,
    /// Sweep cell during a geologic bake, `None` otherwise. The orchestrator
    /// never repositions `chunk_position`; interpreting the cell against the
    /// anchor is the evaluator's responsibility.
    pub cell: Option<GridCell>,
    /// The graph-owned baked artifact: Geologic evaluations write it, Normal
    /// evaluations may read it
    pub baked: &'a mut GeologicBakedData,
    /// Input anchor installed at construction
    pub input_node: NodeRef,
    /// Output anchor whose stored artifact
    /// [`GraphEvaluator::output_terrain`] reads
    pub output_node: NodeRef,
}

/// Errors surfaced across the evaluator boundary.
///
/// The core performs no retries; its only contract on failure is that
/// mode/step/flag overrides are unwound before the error propagates.
#[derive(Debug)]
pub enum EvalError {
    /// An anchor the evaluation needs was never installed
    MissingAnchor(AnchorKind),
    /// Topological evaluation found a dependency cycle
    CycleDetected,
    /// A node failed while computing its output
    NodeFailed {
        /// Label of the failing node
        label: String,
        /// Evaluator-provided failure description
        message: String,
    },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::MissingAnchor(kind) => write!(f, "missing anchor node: {:?}", kind),
            EvalError::CycleDetected => write!(f, "dependency cycle in graph"),
            EvalError::NodeFailed { label, message } => {
                write!(f, "node '{}' failed: {}", label, message)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// The opaque evaluation capability this core orchestrates.
pub trait GraphEvaluator {
    /// Evaluate the graph once at the context's resolution and mode,
    /// updating the output anchor's stored artifact. Safe to call
    /// repeatedly.
    fn evaluate(&mut self, ctx: EvalContext<'_>) -> Result<(), EvalError>;

    /// Install a node. Called once per anchor during graph construction,
    /// never during steady-state processing.
    fn create_node(
        &mut self,
        kind: AnchorKind,
        position: Vec2,
        label: &str,
        is_input: bool,
        is_output: bool,
    ) -> NodeRef;

    /// The terrain last stored on `node`, if any evaluation produced one.
    fn output_terrain(&self, node: NodeRef) -> Option<&FinalTerrain>;
}
