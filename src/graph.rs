//! The world graph: parameter store, mode controller, baking orchestrator
//! and evaluation entry points wrapped around an opaque graph evaluator.
//!
//! Everything here is single-threaded and synchronous: parameter commits
//! strictly precede their notifications, and the transient overrides applied
//! during a geologic sweep are visible to every evaluation in the sweep and
//! to nothing outside it.

use crate::evaluator::{AnchorKind, EvalContext, EvalError, GraphEvaluator, GridCell, NodeRef};
use crate::events::Signal;
use crate::geologic::GeologicBakedData;
use crate::math::{Vec2, Vec3};
use crate::mode::ProcessMode;
use crate::params::{ScaledPreview, WorldParams};
use crate::resolution::{effective_resolution, EffectiveResolution};
use crate::terrain::FinalTerrain;

/// Named change events, one per observable parameter.
///
/// Listeners run synchronously on the mutating call, in registration order,
/// after the new value is committed. The geologic-step event carries the new
/// value; the others carry nothing.
#[derive(Default)]
pub struct GraphEvents {
    pub on_seed_changed: Signal,
    pub on_chunk_size_changed: Signal,
    pub on_step_changed: Signal,
    pub on_chunk_position_changed: Signal,
    pub on_geologic_step_changed: Signal<f32>,
}

/// Orchestration core for one procedural world graph.
///
/// Owns the simulation parameters, the processing mode, the baked geologic
/// artifact and the two anchor nodes; drives the evaluator it wraps. All
/// parameter writes go through the setters here so the matching change
/// events fire.
pub struct WorldGraph<E> {
    /// Graph name shown by editors
    pub name: String,
    /// Change events, one per observable parameter
    pub events: GraphEvents,
    params: WorldParams,
    mode: ProcessMode,
    processed_from_biome: bool,
    baked: GeologicBakedData,
    input_node: NodeRef,
    output_node: NodeRef,
    evaluator: E,
}

/// Scoped mode/step override for the geologic sweep.
///
/// Entering saves the current mode and the raw step, then forces
/// `Geologic` mode and the geologic step. Dropping restores both, so the
/// restore runs on every exit path out of the sweep, early error returns
/// included.
struct GeologicSweep<'a, E> {
    graph: &'a mut WorldGraph<E>,
    saved_mode: ProcessMode,
    saved_step: f32,
}

impl<'a, E> GeologicSweep<'a, E> {
    fn enter(graph: &'a mut WorldGraph<E>) -> Self {
        let saved_mode = graph.mode;
        let saved_step = graph.params.step();
        let geologic_step = graph.params.geologic_step();
        graph.mode = ProcessMode::Geologic;
        graph.params.override_step(geologic_step);
        Self {
            graph,
            saved_mode,
            saved_step,
        }
    }
}

impl<E> Drop for GeologicSweep<'_, E> {
    fn drop(&mut self) {
        self.graph.params.override_step(self.saved_step);
        self.graph.mode = self.saved_mode;
    }
}

/// Scoped acquire/release of the biome-driver flag: set on enter, cleared
/// on drop on every exit path.
struct BiomeScope<'a, E> {
    graph: &'a mut WorldGraph<E>,
}

impl<'a, E> BiomeScope<'a, E> {
    fn enter(graph: &'a mut WorldGraph<E>) -> Self {
        graph.processed_from_biome = true;
        Self { graph }
    }
}

impl<E> Drop for BiomeScope<'_, E> {
    fn drop(&mut self) {
        self.graph.processed_from_biome = false;
    }
}

impl<E: GraphEvaluator> WorldGraph<E> {
    /// Build a graph around `evaluator`: install the input/output anchor
    /// nodes and apply default parameters.
    pub fn new(mut evaluator: E) -> Self {
        let input_node = evaluator.create_node(
            AnchorKind::WorldInput,
            Vec2::new(-100.0, 0.0),
            "World Graph Input",
            true,
            false,
        );
        let output_node = evaluator.create_node(
            AnchorKind::WorldOutput,
            Vec2::new(100.0, 0.0),
            "World Graph Output",
            true,
            false,
        );

        let mut graph = Self {
            name: String::new(),
            events: GraphEvents::default(),
            params: WorldParams::default(),
            mode: ProcessMode::Normal,
            processed_from_biome: false,
            baked: GeologicBakedData::new(),
            input_node,
            output_node,
            evaluator,
        };
        graph.initialize();
        graph
    }

    /// Reset the graph to its default world values.
    ///
    /// Routed through the evented setters, so registered listeners observe
    /// the reset like any other mutation.
    pub fn initialize(&mut self) {
        self.set_chunk_size(16);
        self.set_step(1.0);
        self.set_max_step(4.0);
        self.name = "New Procedural Graph".to_string();

        self.set_geologic_step(8.0);
        self.set_geologic_distance_check(2);

        self.mode = ProcessMode::Normal;
    }

    /// Read-only view of the parameter block.
    pub fn params(&self) -> &WorldParams {
        &self.params
    }

    pub fn seed(&self) -> u64 {
        self.params.seed()
    }

    pub fn set_seed(&mut self, value: u64) {
        if self.params.set_seed(value) {
            self.events.on_seed_changed.emit(());
        }
    }

    pub fn chunk_size(&self) -> u32 {
        self.params.chunk_size()
    }

    /// Set the authoritative chunk size. A silent no-op while the scaled
    /// preview is enabled.
    pub fn set_chunk_size(&mut self, value: u32) {
        if self.params.set_chunk_size(value) {
            self.events.on_chunk_size_changed.emit(());
        }
    }

    pub fn chunk_position(&self) -> Vec3 {
        self.params.chunk_position()
    }

    pub fn set_chunk_position(&mut self, value: Vec3) {
        if self.params.set_chunk_position(value) {
            self.events.on_chunk_position_changed.emit(());
        }
    }

    pub fn step(&self) -> f32 {
        self.params.step()
    }

    /// Set the authoritative step. A silent no-op while the scaled preview
    /// is enabled.
    pub fn set_step(&mut self, value: f32) {
        if self.params.set_step(value) {
            self.events.on_step_changed.emit(());
        }
    }

    pub fn geologic_step(&self) -> f32 {
        self.params.geologic_step()
    }

    pub fn set_geologic_step(&mut self, value: f32) {
        if self.params.set_geologic_step(value) {
            let committed = self.params.geologic_step();
            self.events.on_geologic_step_changed.emit(committed);
        }
    }

    pub fn geologic_distance_check(&self) -> u32 {
        self.params.geologic_distance_check()
    }

    pub fn set_geologic_distance_check(&mut self, value: u32) {
        self.params.set_geologic_distance_check(value);
    }

    pub fn max_step(&self) -> f32 {
        self.params.max_step()
    }

    pub fn set_max_step(&mut self, value: f32) {
        self.params.set_max_step(value);
    }

    pub fn scaled_preview(&self) -> ScaledPreview {
        self.params.scaled_preview()
    }

    pub fn set_scaled_preview_enabled(&mut self, enabled: bool) {
        self.params.set_scaled_preview_enabled(enabled);
    }

    /// Changing the ratio changes the effective step an editor displays, so
    /// it fires the step-changed event.
    pub fn set_scaled_preview_ratio(&mut self, value: f32) {
        if self.params.set_scaled_preview_ratio(value) {
            self.events.on_step_changed.emit(());
        }
    }

    /// Changing the preview chunk size changes the effective chunk size, so
    /// it fires the chunk-size-changed event.
    pub fn set_scaled_preview_chunk_size(&mut self, value: u32) {
        if self.params.set_scaled_preview_chunk_size(value) {
            self.events.on_chunk_size_changed.emit(());
        }
    }

    /// Active processing mode. `Geologic` is only ever set by
    /// [`bake_geologic_data`](Self::bake_geologic_data) for the duration of
    /// the sweep; callers always observe `Normal`.
    pub fn mode(&self) -> ProcessMode {
        self.mode
    }

    /// True only while [`process_from_biome`](Self::process_from_biome) is
    /// executing.
    pub fn processed_from_biome(&self) -> bool {
        self.processed_from_biome
    }

    /// The resolution the next evaluation would run at.
    pub fn effective_resolution(&self) -> EffectiveResolution {
        effective_resolution(&self.params, self.mode)
    }

    /// The baked geologic artifact from the most recent sweep.
    pub fn baked_geologic_data(&self) -> &GeologicBakedData {
        &self.baked
    }

    pub fn clear_baked_geologic_data(&mut self) {
        self.baked.clear();
    }

    pub fn input_node(&self) -> NodeRef {
        self.input_node
    }

    pub fn output_node(&self) -> NodeRef {
        self.output_node
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    pub fn evaluator_mut(&mut self) -> &mut E {
        &mut self.evaluator
    }

    fn run_evaluator(&mut self, cell: Option<GridCell>) -> Result<(), EvalError> {
        let ctx = EvalContext {
            seed: self.params.seed(),
            chunk_position: self.params.chunk_position(),
            resolution: effective_resolution(&self.params, self.mode),
            mode: self.mode,
            processed_from_biome: self.processed_from_biome,
            cell,
            baked: &mut self.baked,
            input_node: self.input_node,
            output_node: self.output_node,
        };
        self.evaluator.evaluate(ctx)
    }

    /// Evaluate the graph once in the current mode and resolution.
    pub fn process(&mut self) -> Result<(), EvalError> {
        self.run_evaluator(None)
    }

    /// Evaluate on behalf of an external biome driver.
    ///
    /// `processed_from_biome` reads true from inside any evaluator hook for
    /// the duration of the call and is cleared again on every exit path,
    /// evaluation failure included.
    pub fn process_from_biome(&mut self) -> Result<(), EvalError> {
        let scope = BiomeScope::enter(self);
        scope.graph.run_evaluator(None)
    }

    /// Run the geologic precomputation sweep.
    ///
    /// Overrides mode and step for the duration of the sweep, then invokes
    /// the evaluator once per cell of the `geologic_distance_check`-sided
    /// grid in row-major order, `x` outer. Later cells may read neighbor
    /// data written by earlier cells through the baked artifact, so the
    /// order is part of the contract. Mode and step are restored bit-for-bit
    /// before this returns, whether the sweep completed or an evaluation
    /// failed.
    pub fn bake_geologic_data(&mut self) -> Result<(), EvalError> {
        let sweep = GeologicSweep::enter(self);

        let cells = sweep.graph.params.geologic_distance_check();
        for x in 0..cells {
            for y in 0..cells {
                sweep.graph.run_evaluator(Some(GridCell { x, y }))?;
            }
        }
        Ok(())
    }

    /// The terrain most recently stored on the output anchor, or `None` if
    /// no Normal-mode evaluation has run yet.
    pub fn output_terrain(&self) -> Option<&FinalTerrain> {
        self.evaluator.output_terrain(self.output_node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// What the test evaluator saw at one `evaluate` call.
    #[derive(Clone, Debug, PartialEq)]
    struct EvalRecord {
        mode: ProcessMode,
        chunk_size: u32,
        step: f32,
        cell: Option<(u32, u32)>,
        from_biome: bool,
    }

    /// Evaluator double that records every call and can fail on demand.
    struct RecordingEvaluator {
        calls: Rc<RefCell<Vec<EvalRecord>>>,
        /// Fail once this many calls have succeeded
        fail_after: Option<usize>,
        created_nodes: u32,
    }

    impl GraphEvaluator for RecordingEvaluator {
        fn evaluate(&mut self, ctx: EvalContext<'_>) -> Result<(), EvalError> {
            self.calls.borrow_mut().push(EvalRecord {
                mode: ctx.mode,
                chunk_size: ctx.resolution.chunk_size,
                step: ctx.resolution.step,
                cell: ctx.cell.map(|c| (c.x, c.y)),
                from_biome: ctx.processed_from_biome,
            });
            match self.fail_after {
                Some(limit) if self.calls.borrow().len() > limit => Err(EvalError::CycleDetected),
                _ => Ok(()),
            }
        }

        fn create_node(
            &mut self,
            _kind: AnchorKind,
            _position: Vec2,
            _label: &str,
            _is_input: bool,
            _is_output: bool,
        ) -> NodeRef {
            let node = NodeRef(self.created_nodes);
            self.created_nodes += 1;
            node
        }

        fn output_terrain(&self, _node: NodeRef) -> Option<&FinalTerrain> {
            None
        }
    }

    fn recording_graph(
        fail_after: Option<usize>,
    ) -> (WorldGraph<RecordingEvaluator>, Rc<RefCell<Vec<EvalRecord>>>) {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let evaluator = RecordingEvaluator {
            calls: Rc::clone(&calls),
            fail_after,
            created_nodes: 0,
        };
        (WorldGraph::new(evaluator), calls)
    }

    #[test]
    fn test_initialize_defaults() {
        let (graph, _) = recording_graph(None);
        assert_eq!(graph.chunk_size(), 16);
        assert_eq!(graph.step(), 1.0);
        assert_eq!(graph.max_step(), 4.0);
        assert_eq!(graph.geologic_step(), 8.0);
        assert_eq!(graph.geologic_distance_check(), 2);
        assert_eq!(graph.mode(), ProcessMode::Normal);
        assert_eq!(graph.name, "New Procedural Graph");
        assert!(!graph.processed_from_biome());
    }

    #[test]
    fn test_anchor_nodes_installed() {
        let (graph, _) = recording_graph(None);
        assert_ne!(graph.input_node(), graph.output_node());
        assert_eq!(graph.evaluator().created_nodes, 2);
    }

    #[test]
    fn test_same_value_write_fires_nothing() {
        let (mut graph, _) = recording_graph(None);
        let fired = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&fired);
        graph.events.on_seed_changed.connect(move |()| *sink.borrow_mut() += 1);

        graph.set_seed(0);
        assert_eq!(*fired.borrow(), 0);
    }

    #[test]
    fn test_changed_value_fires_exactly_once_after_commit() {
        let (mut graph, _) = recording_graph(None);
        let fired = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&fired);
        graph.events.on_seed_changed.connect(move |()| *sink.borrow_mut() += 1);

        graph.set_seed(42);
        assert_eq!(*fired.borrow(), 1);
        assert_eq!(graph.seed(), 42);

        graph.set_seed(42);
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn test_geologic_step_listener_receives_committed_value() {
        let (mut graph, _) = recording_graph(None);
        let seen = Rc::new(RefCell::new(None));

        let sink = Rc::clone(&seen);
        graph
            .events
            .on_geologic_step_changed
            .connect(move |value| *sink.borrow_mut() = Some(value));

        graph.set_geologic_step(4.0);
        assert_eq!(*seen.borrow(), Some(4.0));
        assert_eq!(graph.geologic_step(), 4.0);
    }

    #[test]
    fn test_preview_freezes_writes_and_fires_nothing() {
        let (mut graph, _) = recording_graph(None);
        let fired = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&fired);
        graph.events.on_chunk_size_changed.connect(move |()| *sink.borrow_mut() += 1);

        graph.set_scaled_preview_enabled(true);
        graph.set_chunk_size(64);
        graph.set_step(2.0);

        assert_eq!(*fired.borrow(), 0);
        assert_eq!(graph.chunk_size(), 16);
        assert_eq!(graph.step(), 1.0);
    }

    #[test]
    fn test_preview_setters_fire_resolution_events() {
        let (mut graph, _) = recording_graph(None);
        let step_fired = Rc::new(RefCell::new(0));
        let size_fired = Rc::new(RefCell::new(0));

        let sink = Rc::clone(&step_fired);
        graph.events.on_step_changed.connect(move |()| *sink.borrow_mut() += 1);
        let sink = Rc::clone(&size_fired);
        graph.events.on_chunk_size_changed.connect(move |()| *sink.borrow_mut() += 1);

        graph.set_scaled_preview_ratio(4.0);
        graph.set_scaled_preview_chunk_size(64);

        assert_eq!(*step_fired.borrow(), 1);
        assert_eq!(*size_fired.borrow(), 1);
        // the authoritative fields are untouched
        assert_eq!(graph.step(), 1.0);
        assert_eq!(graph.chunk_size(), 16);
    }

    #[test]
    fn test_initialize_refires_events_for_changed_params() {
        let (mut graph, _) = recording_graph(None);
        graph.set_step(0.5);

        let fired = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&fired);
        graph.events.on_step_changed.connect(move |()| *sink.borrow_mut() += 1);

        graph.initialize();
        assert_eq!(*fired.borrow(), 1);
        assert_eq!(graph.step(), 1.0);
    }

    #[test]
    fn test_effective_resolution_follows_preview() {
        let (mut graph, _) = recording_graph(None);
        assert_eq!(
            graph.effective_resolution(),
            EffectiveResolution { chunk_size: 16, step: 1.0 }
        );

        graph.set_scaled_preview_enabled(true);
        assert_eq!(
            graph.effective_resolution(),
            EffectiveResolution { chunk_size: 32, step: 8.0 }
        );

        graph.set_scaled_preview_enabled(false);
        assert_eq!(
            graph.effective_resolution(),
            EffectiveResolution { chunk_size: 16, step: 1.0 }
        );
    }

    #[test]
    fn test_process_passes_effective_resolution() {
        let (mut graph, calls) = recording_graph(None);
        graph.set_scaled_preview_enabled(true);

        graph.process().unwrap();

        let calls = calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mode, ProcessMode::Normal);
        assert_eq!(calls[0].chunk_size, 32);
        assert_eq!(calls[0].step, 8.0);
        assert_eq!(calls[0].cell, None);
    }

    #[test]
    fn test_bake_invokes_evaluator_n_squared_times_row_major() {
        let (mut graph, calls) = recording_graph(None);

        graph.bake_geologic_data().unwrap();

        let calls = calls.borrow();
        assert_eq!(calls.len(), 4);
        let cells: Vec<_> = calls.iter().map(|c| c.cell.unwrap()).collect();
        assert_eq!(cells, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        for call in calls.iter() {
            assert_eq!(call.mode, ProcessMode::Geologic);
            assert_eq!(call.step, 8.0);
            assert_eq!(call.chunk_size, 16);
        }
    }

    #[test]
    fn test_bake_grid_follows_distance_check() {
        let (mut graph, calls) = recording_graph(None);
        graph.set_geologic_distance_check(3);

        graph.bake_geologic_data().unwrap();
        assert_eq!(calls.borrow().len(), 9);
    }

    #[test]
    fn test_bake_restores_step_bit_for_bit_and_mode() {
        let (mut graph, _) = recording_graph(None);
        graph.set_step(0.1);

        graph.bake_geologic_data().unwrap();

        assert_eq!(graph.step().to_bits(), 0.1f32.to_bits());
        assert_eq!(graph.mode(), ProcessMode::Normal);
    }

    #[test]
    fn test_bake_restores_state_when_evaluator_fails() {
        let (mut graph, calls) = recording_graph(Some(2));
        graph.set_step(0.25);

        let result = graph.bake_geologic_data();

        assert!(result.is_err());
        assert_eq!(calls.borrow().len(), 3);
        assert_eq!(graph.step().to_bits(), 0.25f32.to_bits());
        assert_eq!(graph.mode(), ProcessMode::Normal);
    }

    #[test]
    fn test_bake_uses_real_resolution_despite_preview() {
        let (mut graph, calls) = recording_graph(None);
        graph.set_scaled_preview_enabled(true);

        graph.bake_geologic_data().unwrap();

        for call in calls.borrow().iter() {
            assert_eq!(call.chunk_size, 16);
            assert_eq!(call.step, 8.0);
        }
        // the preview substitution is back the moment the sweep returns
        assert_eq!(
            graph.effective_resolution(),
            EffectiveResolution { chunk_size: 32, step: 8.0 }
        );
        assert_eq!(graph.step(), 1.0);
    }

    #[test]
    fn test_process_from_biome_sets_and_clears_flag() {
        let (mut graph, calls) = recording_graph(None);

        graph.process().unwrap();
        graph.process_from_biome().unwrap();

        let calls = calls.borrow();
        assert!(!calls[0].from_biome);
        assert!(calls[1].from_biome);
        assert!(!graph.processed_from_biome());
    }

    #[test]
    fn test_process_from_biome_clears_flag_on_failure() {
        let (mut graph, _) = recording_graph(Some(0));

        let result = graph.process_from_biome();

        assert!(result.is_err());
        assert!(!graph.processed_from_biome());
    }

    #[test]
    fn test_output_terrain_none_before_first_evaluation() {
        let (graph, _) = recording_graph(None);
        assert!(graph.output_terrain().is_none());
    }
}
