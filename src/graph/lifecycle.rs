//! Lifecycle of the concept graph surface.
//!
//! `GraphLifecycle` exclusively owns the current graph generation together
//! with everything attached to it: the interaction controller, the audio
//! units and the pending frame. A change of inputs tears all of it down
//! before the next generation is built, and frames are only run against a
//! ticket issued for the current generation, so a stale frame can never
//! touch a newer graph.

use super::builder::build_graph;
use super::interaction::{CursorStyle, InteractionController, InteractionEffect, InteractionState, PointerEvent};
use super::layout::{ForceSimulation, SimulationParams, TickOutcome};
use super::types::ConceptGraph;
use super::vector::Vector2;
use crate::audio::AudioUnits;
use crate::corpus::Publication;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;

/// Frames a new generation runs before it may be reported as settled
const WARMUP_FRAMES: u64 = 30;

/// Creates the audio units for one lifecycle instance
pub type AudioFactory = Box<dyn FnMut() -> AudioUnits>;

/// Logical size of the hosting container
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
    pub pixels_per_point: f32,
}

impl SurfaceSize {
    pub fn new(width: f32, height: f32, pixels_per_point: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            pixels_per_point: if pixels_per_point > 0.0 { pixels_per_point } else { 1.0 },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width < 1.0 || self.height < 1.0
    }

    /// Physical pixel dimensions of the backing surface
    pub fn backing_pixels(&self) -> (u32, u32) {
        (
            (self.width * self.pixels_per_point).round() as u32,
            (self.height * self.pixels_per_point).round() as u32,
        )
    }

    pub fn center(&self) -> Vector2 {
        Vector2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Permission to run one frame of one generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTicket {
    generation: u64,
    serial: u64,
}

impl FrameTicket {
    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// At most one pending frame, tagged with the generation it belongs to
#[derive(Debug, Default)]
pub struct FrameScheduler {
    generation: u64,
    serial: u64,
    pending: Option<FrameTicket>,
}

impl FrameScheduler {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending(&self) -> Option<FrameTicket> {
        self.pending
    }

    /// Schedule the next frame, replacing any pending one
    pub fn schedule(&mut self) -> FrameTicket {
        self.serial += 1;
        let ticket = FrameTicket {
            generation: self.generation,
            serial: self.serial,
        };
        self.pending = Some(ticket);
        ticket
    }

    /// Drop the pending frame. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.pending.take().is_some()
    }

    /// Cancel and invalidate every ticket issued so far
    pub fn next_generation(&mut self) -> u64 {
        self.cancel();
        self.generation += 1;
        self.generation
    }

    /// Consume `ticket` if it is the pending frame of the current generation
    pub fn claim(&mut self, ticket: FrameTicket) -> bool {
        if ticket.generation == self.generation && self.pending == Some(ticket) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Nothing built yet, or torn down
    Unmounted,
    /// Inputs produced no concepts; show the placeholder
    Placeholder,
    /// Graph built but the container has no size yet
    AwaitingSize,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Ticked(TickOutcome),
    /// Ticket from a torn-down generation or already used
    Stale,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub rebuilds: u64,
    pub frames: u64,
    pub skipped_frames: u64,
    pub stale_frames: u64,
}

/// Resources of one graph generation
struct Mounted {
    graph: ConceptGraph,
    controller: InteractionController,
    audio: AudioUnits,
    started: bool,
    frames: u64,
    last_frame_at: Option<f64>,
}

pub struct GraphLifecycle {
    simulation: ForceSimulation,
    audio_factory: AudioFactory,
    inputs_revision: Option<u64>,
    surface: Option<SurfaceSize>,
    scheduler: FrameScheduler,
    mounted: Option<Mounted>,
    phase: LifecyclePhase,
    stats: LifecycleStats,
    rng: StdRng,
}

impl GraphLifecycle {
    pub fn new(params: SimulationParams, audio_factory: AudioFactory) -> Self {
        Self {
            simulation: ForceSimulation::new(params),
            audio_factory,
            inputs_revision: None,
            surface: None,
            scheduler: FrameScheduler::default(),
            mounted: None,
            phase: LifecyclePhase::Unmounted,
            stats: LifecycleStats::default(),
            rng: StdRng::from_entropy(),
        }
    }

    /// Use a fixed seed for the initial scatter
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn graph(&self) -> Option<&ConceptGraph> {
        self.mounted.as_ref().map(|m| &m.graph)
    }

    pub fn params(&self) -> &SimulationParams {
        &self.simulation.params
    }

    pub fn stats(&self) -> LifecycleStats {
        self.stats
    }

    pub fn generation(&self) -> u64 {
        self.scheduler.generation()
    }

    pub fn pending_frame(&self) -> Option<FrameTicket> {
        self.scheduler.pending()
    }

    pub fn cursor(&self) -> CursorStyle {
        self.mounted
            .as_ref()
            .map_or(CursorStyle::Default, |m| m.controller.cursor())
    }

    /// No visible motion is expected; a freshly scattered graph is never settled
    pub fn is_settled(&self) -> bool {
        self.mounted
            .as_ref()
            .map_or(true, |m| m.frames >= WARMUP_FRAMES && ForceSimulation::is_settled(&m.graph))
    }

    /// Rebuild when the inputs' revision differs from the one last built.
    /// Returns whether a rebuild happened.
    pub fn sync_inputs(
        &mut self,
        revision: u64,
        publications: &[Publication],
        active_concepts: &BTreeSet<String>,
    ) -> bool {
        if self.inputs_revision == Some(revision) {
            return false;
        }
        self.teardown();
        self.inputs_revision = Some(revision);
        self.stats.rebuilds += 1;

        let graph = build_graph(publications, active_concepts, &self.simulation.params);
        if graph.is_empty() {
            self.phase = LifecyclePhase::Placeholder;
            tracing::info!("Concept graph empty (revision {}), showing placeholder", revision);
            return true;
        }

        tracing::info!(
            "Rebuilt concept graph generation {}: {} nodes, {} edges",
            self.scheduler.generation(),
            graph.nodes.len(),
            graph.edges.len()
        );
        self.mounted = Some(Mounted {
            graph,
            controller: InteractionController::new(&self.simulation.params),
            audio: (self.audio_factory)(),
            started: false,
            frames: 0,
            last_frame_at: None,
        });
        self.phase = LifecyclePhase::AwaitingSize;
        self.maybe_start();
        true
    }

    /// Forget the built revision so the next `sync_inputs` rebuilds
    pub fn invalidate(&mut self) {
        self.inputs_revision = None;
    }

    /// Update tunables. Physics and interaction thresholds apply to the
    /// running generation; sizing changes rebuild it.
    pub fn set_params(&mut self, params: SimulationParams) {
        let sizing_changed = params.base_radius != self.simulation.params.base_radius
            || params.active_bonus != self.simulation.params.active_bonus
            || params.inactive_bonus != self.simulation.params.inactive_bonus;
        self.simulation.params = params;
        if let Some(mounted) = self.mounted.as_mut() {
            mounted.controller.set_params(&params);
            mounted.frames = 0;
        }
        if sizing_changed {
            self.invalidate();
        }
    }

    /// Container size changed. Simulation state is kept; nodes outside the
    /// new bounds are pulled back in by the next tick.
    pub fn resize(&mut self, size: SurfaceSize) {
        if self.surface == Some(size) {
            return;
        }
        let (px_w, px_h) = size.backing_pixels();
        tracing::debug!(
            "Graph surface resized to {}x{} ({}x{} px @ {})",
            size.width,
            size.height,
            px_w,
            px_h,
            size.pixels_per_point
        );
        self.surface = Some(size);
        if let Some(mounted) = self.mounted.as_mut() {
            mounted.frames = 0;
        }
        self.maybe_start();
    }

    fn maybe_start(&mut self) {
        let Some(size) = self.surface.filter(|s| !s.is_empty()) else {
            return;
        };
        let Some(mounted) = self.mounted.as_mut().filter(|m| !m.started) else {
            return;
        };
        let spread = (size.width.min(size.height) * 0.1).max(10.0);
        mounted.graph.scatter(size.center(), spread, &mut self.rng);
        mounted.started = true;
        self.phase = LifecyclePhase::Running;
        self.scheduler.schedule();
    }

    /// Route a pointer event to the controller; `on_toggle` receives the
    /// concept name of every qualifying click.
    pub fn pointer(&mut self, event: PointerEvent, now: f64, on_toggle: &mut dyn FnMut(&str)) {
        if self.phase != LifecyclePhase::Running {
            return;
        }
        let Some(mounted) = self.mounted.as_mut() else {
            return;
        };
        if matches!(event, PointerEvent::Moved(_) | PointerEvent::Pressed(_)) {
            mounted.audio.grant_permission();
        }

        // Anything done to a held node disturbs the layout
        if matches!(mounted.controller.state(), InteractionState::Dragging { .. }) {
            mounted.frames = 0;
        }

        for effect in mounted.controller.handle(event, now, &mut mounted.graph) {
            match effect {
                InteractionEffect::Play(cue) => mounted.audio.play(cue),
                InteractionEffect::ReleaseCues => mounted.audio.release(),
                InteractionEffect::ToggleConcept(name) => {
                    tracing::debug!("Concept '{}' clicked", name);
                    on_toggle(&name);
                }
            }
        }
    }

    /// Run the frame `ticket` was issued for and schedule the next one.
    pub fn frame(&mut self, ticket: FrameTicket, now: f64) -> FrameOutcome {
        if !self.scheduler.claim(ticket) {
            self.stats.stale_frames += 1;
            return FrameOutcome::Stale;
        }
        let (Some(mounted), Some(size)) = (self.mounted.as_mut(), self.surface) else {
            return FrameOutcome::Stale;
        };

        let dt = mounted.last_frame_at.map_or(0.0, |last| (now - last) as f32);
        mounted.last_frame_at = Some(now);

        let outcome = self.simulation.tick(&mut mounted.graph, size.width, size.height, dt);
        mounted.frames += 1;
        self.stats.frames += 1;
        if outcome == TickOutcome::Skipped {
            self.stats.skipped_frames += 1;
        }
        self.scheduler.schedule();
        FrameOutcome::Ticked(outcome)
    }

    /// Release everything attached to the current generation
    pub fn teardown(&mut self) {
        let cancelled = self.scheduler.cancel();
        self.scheduler.next_generation();
        if let Some(mut mounted) = self.mounted.take() {
            mounted.controller.reset(&mut mounted.graph);
            mounted.audio.dispose();
            tracing::debug!(
                "Tore down concept graph ({} nodes, pending frame cancelled: {})",
                mounted.graph.nodes.len(),
                cancelled
            );
        }
        self.phase = LifecyclePhase::Unmounted;
    }

    /// Teardown plus forgetting the inputs, as when the view is removed
    pub fn unmount(&mut self) {
        self.teardown();
        self.inputs_revision = None;
    }
}

impl Drop for GraphLifecycle {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::{recording_factory, AudioLog};
    use std::cell::RefCell;
    use std::rc::Rc;

    const FRAME: f64 = 1.0 / 60.0;

    fn publication(concepts: &[&str]) -> Publication {
        Publication {
            key_concepts: concepts.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    fn scenario() -> Vec<Publication> {
        vec![
            publication(&["A", "B"]),
            publication(&["A", "B"]),
            publication(&["A", "C"]),
        ]
    }

    fn recording_lifecycle() -> (GraphLifecycle, Rc<RefCell<AudioLog>>) {
        let log = Rc::new(RefCell::new(AudioLog::default()));
        let factory_log = log.clone();
        let lifecycle = GraphLifecycle::new(
            SimulationParams::default(),
            Box::new(move || AudioUnits::new(recording_factory(factory_log.clone(), false))),
        )
        .with_seed(42);
        (lifecycle, log)
    }

    fn run_frames(lifecycle: &mut GraphLifecycle, start: f64, count: usize) -> f64 {
        let mut now = start;
        for _ in 0..count {
            now += FRAME;
            if let Some(ticket) = lifecycle.pending_frame() {
                lifecycle.frame(ticket, now);
            }
        }
        now
    }

    #[test]
    fn test_empty_inputs_show_placeholder_without_frames() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        assert!(lifecycle.sync_inputs(1, &[], &BTreeSet::new()));
        assert_eq!(lifecycle.phase(), LifecyclePhase::Placeholder);
        assert!(lifecycle.graph().is_none());
        assert!(lifecycle.pending_frame().is_none());

        // Pointer input on the placeholder is ignored
        let mut toggled = Vec::new();
        lifecycle.pointer(PointerEvent::Pressed(Vector2::new(10.0, 10.0)), 0.0, &mut |n: &str| {
            toggled.push(n.to_string())
        });
        assert!(toggled.is_empty());
    }

    #[test]
    fn test_same_revision_does_not_rebuild() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        assert!(lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new()));
        let generation = lifecycle.generation();
        assert!(!lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new()));
        assert_eq!(lifecycle.generation(), generation);
        assert_eq!(lifecycle.stats().rebuilds, 1);
    }

    #[test]
    fn test_zero_size_defers_start() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(0.0, 0.0, 2.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        assert_eq!(lifecycle.phase(), LifecyclePhase::AwaitingSize);
        assert!(lifecycle.pending_frame().is_none());

        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 2.0));
        assert_eq!(lifecycle.phase(), LifecyclePhase::Running);
        assert!(lifecycle.pending_frame().is_some());
        for node in &lifecycle.graph().unwrap().nodes {
            assert!(node.position.distance(Vector2::new(200.0, 150.0)) < 50.0);
        }
    }

    #[test]
    fn test_backing_pixels_follow_device_ratio() {
        let size = SurfaceSize::new(300.5, 200.0, 2.0);
        assert_eq!(size.backing_pixels(), (601, 400));
        assert_eq!(SurfaceSize::new(10.0, 10.0, 0.0).pixels_per_point, 1.0);
    }

    #[test]
    fn test_resize_keeps_simulation_state() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        run_frames(&mut lifecycle, 0.0, 30);

        let before: Vec<Vector2> = lifecycle.graph().unwrap().nodes.iter().map(|n| n.position).collect();
        let generation = lifecycle.generation();
        lifecycle.resize(SurfaceSize::new(800.0, 600.0, 2.0));
        let after: Vec<Vector2> = lifecycle.graph().unwrap().nodes.iter().map(|n| n.position).collect();

        assert_eq!(before, after);
        assert_eq!(lifecycle.generation(), generation);
        assert!(lifecycle.pending_frame().is_some());
    }

    #[test]
    fn test_rebuild_invalidates_old_ticket() {
        let (mut lifecycle, log) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        let old_ticket = lifecycle.pending_frame().unwrap();

        // Open the audio device so teardown has something to close
        lifecycle.pointer(PointerEvent::Moved(Vector2::new(0.0, 0.0)), 0.0, &mut |_: &str| {});
        let a = lifecycle.graph().unwrap().nodes[0].position;
        lifecycle.pointer(PointerEvent::Moved(a), 0.0, &mut |_: &str| {});
        assert_eq!(log.borrow().opened, 1);

        let active: BTreeSet<String> = ["A".to_string()].into();
        assert!(lifecycle.sync_inputs(2, &scenario(), &active));
        assert_eq!(log.borrow().closed, 1, "previous audio units disposed");

        assert_eq!(lifecycle.frame(old_ticket, 1.0), FrameOutcome::Stale);
        assert_eq!(lifecycle.stats().stale_frames, 1);

        let fresh = lifecycle.pending_frame().unwrap();
        assert_ne!(fresh.generation(), old_ticket.generation());
        assert!(matches!(lifecycle.frame(fresh, 1.0), FrameOutcome::Ticked(_)));
        assert!(lifecycle.graph().unwrap().node("A").unwrap().is_active);
    }

    #[test]
    fn test_only_one_frame_pending() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        let ticket = lifecycle.pending_frame().unwrap();
        assert!(matches!(lifecycle.frame(ticket, FRAME), FrameOutcome::Ticked(_)));
        // Reusing a consumed ticket does nothing
        assert_eq!(lifecycle.frame(ticket, 2.0 * FRAME), FrameOutcome::Stale);
        assert!(lifecycle.pending_frame().is_some());
    }

    #[test]
    fn test_click_invokes_toggle_once() {
        let (mut lifecycle, log) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        let target = lifecycle.graph().unwrap().nodes.len() - 1;
        let p = lifecycle.graph().unwrap().nodes[target].position;

        let mut toggled: Vec<String> = Vec::new();
        let mut on_toggle = |name: &str| toggled.push(name.to_string());
        lifecycle.pointer(PointerEvent::Moved(p), 1.0, &mut on_toggle);
        lifecycle.pointer(PointerEvent::Pressed(p), 1.0, &mut on_toggle);
        lifecycle.pointer(PointerEvent::Released(p), 1.1, &mut on_toggle);

        assert_eq!(toggled, vec!["C".to_string()]);
        assert_eq!(log.borrow().started, vec!["C5", "C3"]);
    }

    #[test]
    fn test_drag_out_of_bounds_is_clamped_after_release() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        // Topmost node, so the press cannot land on an overlapping neighbour
        let a = lifecycle.graph().unwrap().nodes.len() - 1;

        let mut toggles = 0;
        let mut on_toggle = |_: &str| toggles += 1;

        let start = lifecycle.graph().unwrap().nodes[a].position;
        lifecycle.pointer(PointerEvent::Pressed(start), 0.0, &mut on_toggle);
        lifecycle.pointer(PointerEvent::Moved(Vector2::new(10.0, 10.0)), 0.1, &mut on_toggle);

        // Ticks while dragging leave the node where the pointer put it
        let now = run_frames(&mut lifecycle, 0.1, 10);
        lifecycle.pointer(PointerEvent::Moved(Vector2::new(-50.0, -50.0)), now, &mut on_toggle);
        let now = run_frames(&mut lifecycle, now, 5);
        assert_eq!(lifecycle.graph().unwrap().nodes[a].position, Vector2::new(-50.0, -50.0));

        lifecycle.pointer(PointerEvent::Released(Vector2::new(-50.0, -50.0)), 0.5, &mut on_toggle);
        run_frames(&mut lifecycle, now, 1);

        let node = &lifecycle.graph().unwrap().nodes[a];
        assert!(!node.is_dragged);
        assert!(node.position.x >= node.radius);
        assert!(node.position.y >= node.radius);
        assert_eq!(toggles, 0);
    }

    #[test]
    fn test_teardown_releases_everything_once() {
        let (mut lifecycle, log) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        let p = lifecycle.graph().unwrap().nodes[0].position;
        lifecycle.pointer(PointerEvent::Moved(p), 0.0, &mut |_: &str| {});
        lifecycle.pointer(PointerEvent::Pressed(p), 0.0, &mut |_: &str| {});
        assert_eq!(log.borrow().opened, 1);

        lifecycle.unmount();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Unmounted);
        assert!(lifecycle.pending_frame().is_none());
        assert!(lifecycle.graph().is_none());
        assert_eq!(lifecycle.cursor(), CursorStyle::Default);

        lifecycle.teardown();
        drop(lifecycle);
        assert_eq!(log.borrow().closed, 1);
    }

    #[test]
    fn test_pointer_leaving_resets_interaction() {
        let (mut lifecycle, log) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        let p = lifecycle.graph().unwrap().nodes[0].position;
        lifecycle.pointer(PointerEvent::Moved(p), 0.0, &mut |_: &str| {});
        lifecycle.pointer(PointerEvent::Pressed(p), 0.0, &mut |_: &str| {});
        assert_eq!(lifecycle.cursor(), CursorStyle::Grabbing);

        lifecycle.pointer(PointerEvent::Left, 0.1, &mut |_: &str| {});
        assert_eq!(lifecycle.cursor(), CursorStyle::Default);
        assert!(lifecycle.graph().unwrap().nodes.iter().all(|n| !n.is_dragged && !n.is_hovered));
        assert_eq!(log.borrow().stops, 1);
    }

    #[test]
    fn test_new_generation_is_not_settled() {
        let (mut lifecycle, _) = recording_lifecycle();
        assert!(lifecycle.is_settled());
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        assert!(!lifecycle.is_settled());
    }

    #[test]
    fn test_long_pause_skips_physics() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        let now = run_frames(&mut lifecycle, 0.0, 3);

        let ticket = lifecycle.pending_frame().unwrap();
        let outcome = lifecycle.frame(ticket, now + 5.0);
        assert_eq!(outcome, FrameOutcome::Ticked(TickOutcome::Skipped));
        assert_eq!(lifecycle.stats().skipped_frames, 1);
    }

    #[test]
    fn test_sizing_change_forces_rebuild() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());

        let mut params = *lifecycle.params();
        params.damping = 0.9;
        lifecycle.set_params(params);
        assert!(!lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new()));

        params.base_radius = 12.0;
        lifecycle.set_params(params);
        assert!(lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new()));
        let c = lifecycle.graph().unwrap().node("C").unwrap();
        assert_eq!(c.radius, 12.0 + params.inactive_bonus);
    }

    fn settle(lifecycle: &mut GraphLifecycle, start: f64) -> f64 {
        let mut now = start;
        for _ in 0..3000 {
            now = run_frames(lifecycle, now, 1);
            if lifecycle.is_settled() {
                break;
            }
        }
        assert!(lifecycle.is_settled());
        now
    }

    #[test]
    fn test_dropping_a_node_wakes_a_settled_layout() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        let now = settle(&mut lifecycle, 0.0);

        let top = lifecycle.graph().unwrap().nodes.len() - 1;
        let start = lifecycle.graph().unwrap().nodes[top].position;
        let dropped = Vector2::new(20.0, 20.0);
        lifecycle.pointer(PointerEvent::Pressed(start), now, &mut |_: &str| {});
        lifecycle.pointer(PointerEvent::Moved(dropped), now + 0.1, &mut |_: &str| {});
        lifecycle.pointer(PointerEvent::Released(dropped), now + 0.5, &mut |_: &str| {});

        assert_eq!(lifecycle.cursor(), CursorStyle::Default);
        assert!(!lifecycle.is_settled());
        assert!(lifecycle.pending_frame().is_some());

        run_frames(&mut lifecycle, now + 0.5, 5);
        assert_ne!(lifecycle.graph().unwrap().nodes[top].position, dropped);
        assert!(!lifecycle.is_settled());
    }

    #[test]
    fn test_shrinking_surface_pulls_nodes_inside() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(800.0, 600.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());
        let now = run_frames(&mut lifecycle, 0.0, 300);

        let (width, height) = (200.0, 150.0);
        lifecycle.resize(SurfaceSize::new(width, height, 1.0));
        run_frames(&mut lifecycle, now, 1);

        for node in &lifecycle.graph().unwrap().nodes {
            assert!(node.position.x >= node.radius && node.position.x <= width - node.radius);
            assert!(node.position.y >= node.radius && node.position.y <= height - node.radius);
        }
    }

    #[test]
    fn test_click_threshold_change_applies_without_rebuild() {
        let (mut lifecycle, _) = recording_lifecycle();
        lifecycle.resize(SurfaceSize::new(400.0, 300.0, 1.0));
        lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new());

        let mut params = *lifecycle.params();
        params.click_max_duration = 1.0;
        lifecycle.set_params(params);
        assert!(!lifecycle.sync_inputs(1, &scenario(), &BTreeSet::new()));

        let top = lifecycle.graph().unwrap().nodes.len() - 1;
        let p = lifecycle.graph().unwrap().nodes[top].position;
        let mut toggles = 0;
        let mut on_toggle = |_: &str| toggles += 1;
        lifecycle.pointer(PointerEvent::Pressed(p), 0.0, &mut on_toggle);
        lifecycle.pointer(PointerEvent::Released(p), 0.5, &mut on_toggle);
        assert_eq!(toggles, 1);
    }
}
