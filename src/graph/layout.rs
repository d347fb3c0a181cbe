//! Force-directed layout for the concept graph.
//!
//! Each tick applies:
//! - Repulsion between all node pairs (inverse-square, Barnes-Hut above a size threshold)
//! - Spring attraction along co-occurrence edges, tighter for stronger links
//! - Mass-proportional centering toward the surface center
//!
//! then integrates with semi-implicit Euler and bounces nodes off the
//! surface edges.

use super::quadtree::Quadtree;
use super::types::ConceptGraph;
use super::vector::Vector2;
use serde::{Deserialize, Serialize};

/// Tunable physics, sizing and interaction constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParams {
    /// Inverse-square repulsion coefficient
    pub repulsion: f32,
    /// Hooke constant for co-occurrence springs
    pub spring_stiffness: f32,
    /// Rest length of a strength-1 spring
    pub ideal_length: f32,
    /// Rest length never shrinks below this
    pub min_ideal_length: f32,
    /// How quickly rest length shrinks with edge strength
    pub link_tightening: f32,
    /// Pull toward the center, per unit mass and distance
    pub centering: f32,
    /// Velocity kept per reference frame (< 1)
    pub damping: f32,
    /// Velocity kept when bouncing off a wall (< 1)
    pub restitution: f32,
    /// Distance floor for force laws
    pub min_distance: f32,
    pub max_velocity: f32,
    /// Frames longer than this (seconds) skip the physics update
    pub max_frame_dt: f32,
    /// Frame rate that `dt` is normalized against
    pub reference_fps: f32,
    /// Upper bound on one step, in reference frames
    pub max_step_frames: f32,
    /// Above this node count repulsion uses the quadtree
    pub barnes_hut_threshold: usize,
    pub barnes_hut_theta: f32,

    pub base_radius: f32,
    pub active_bonus: f32,
    pub inactive_bonus: f32,

    /// Extra pixels around a node that still count as a hit
    pub hit_slop: f32,
    /// Longest press (seconds) that still counts as a click
    pub click_max_duration: f64,
    /// Largest pointer travel (pixels) that still counts as a click
    pub click_max_distance: f32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            repulsion: 6000.0,
            spring_stiffness: 0.02,
            ideal_length: 120.0,
            min_ideal_length: 50.0,
            link_tightening: 0.2,
            centering: 0.0005,
            damping: 0.95,
            restitution: 0.5,
            min_distance: 1.0,
            max_velocity: 40.0,
            max_frame_dt: 0.25,
            reference_fps: 60.0,
            max_step_frames: 3.0,
            barnes_hut_threshold: 250,
            barnes_hut_theta: 0.9,

            base_radius: 8.0,
            active_bonus: 6.0,
            inactive_bonus: 3.0,

            hit_slop: 4.0,
            click_max_duration: 0.2,
            click_max_distance: 6.0,
        }
    }
}

/// What a call to [`ForceSimulation::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Stepped,
    /// Frame gap exceeded `max_frame_dt`; physics left untouched
    Skipped,
    Empty,
}

pub struct ForceSimulation {
    pub params: SimulationParams,
}

impl Default for ForceSimulation {
    fn default() -> Self {
        Self::new(SimulationParams::default())
    }
}

impl ForceSimulation {
    pub fn new(params: SimulationParams) -> Self {
        Self { params }
    }

    /// Convert a frame gap in seconds to a step in reference frames.
    /// `None` means the gap is too long and the frame should be skipped.
    pub fn step_frames(&self, dt_seconds: f32) -> Option<f32> {
        if !dt_seconds.is_finite() || dt_seconds > self.params.max_frame_dt {
            return None;
        }
        Some((dt_seconds.max(0.0) * self.params.reference_fps).min(self.params.max_step_frames))
    }

    /// Rest length for an edge of the given strength
    pub fn ideal_length(&self, strength: u32) -> f32 {
        let extra = strength.saturating_sub(1) as f32;
        (self.params.ideal_length / (1.0 + self.params.link_tightening * extra)).max(self.params.min_ideal_length)
    }

    /// Advance the layout by one frame on a `width` x `height` surface.
    pub fn tick(&self, graph: &mut ConceptGraph, width: f32, height: f32, dt_seconds: f32) -> TickOutcome {
        if graph.is_empty() {
            return TickOutcome::Empty;
        }
        let Some(dt) = self.step_frames(dt_seconds) else {
            tracing::debug!("Skipping physics for a {:.0} ms frame", dt_seconds * 1000.0);
            return TickOutcome::Skipped;
        };

        let center = Vector2::new(width / 2.0, height / 2.0);
        self.accumulate_forces(graph, center);

        for node in &mut graph.nodes {
            node.integrate(dt, self.params.damping, self.params.max_velocity);
            if !node.is_dragged {
                node.confine(width, height, self.params.restitution);
            }
            if !node.position.is_finite() || !node.velocity.is_finite() {
                tracing::warn!("Non-finite state on concept '{}', recentering", node.name);
                node.position = center;
                node.velocity = Vector2::ZERO;
            }
        }

        TickOutcome::Stepped
    }

    /// Add this tick's repulsion, spring and centering forces to every node.
    pub fn accumulate_forces(&self, graph: &mut ConceptGraph, center: Vector2) {
        if graph.nodes.len() > self.params.barnes_hut_threshold {
            self.apply_repulsion_approximate(graph);
        } else {
            self.apply_repulsion_exact(graph);
        }
        self.apply_springs(graph);

        for node in &mut graph.nodes {
            let pull = (center - node.position) * (self.params.centering * node.mass);
            node.apply_force(pull);
        }
    }

    fn apply_repulsion_exact(&self, graph: &mut ConceptGraph) {
        let nodes = &mut graph.nodes;
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                let delta = nodes[i].position - nodes[j].position;
                let direction = separation_direction(delta, i, j);
                let distance = delta.length().max(self.params.min_distance);
                let magnitude = self.params.repulsion * nodes[i].mass * nodes[j].mass / (distance * distance);
                let force = direction * magnitude;
                nodes[i].apply_force(force);
                nodes[j].apply_force(-force);
            }
        }
    }

    fn apply_repulsion_approximate(&self, graph: &mut ConceptGraph) {
        let bodies: Vec<(Vector2, f32)> = graph.nodes.iter().map(|n| (n.position, n.mass)).collect();
        let tree = Quadtree::build(&bodies, self.params.barnes_hut_theta);
        for node in &mut graph.nodes {
            let field = tree.repulsion_at(node.position, self.params.repulsion, self.params.min_distance);
            node.apply_force(field * node.mass);
        }
    }

    fn apply_springs(&self, graph: &mut ConceptGraph) {
        let node_count = graph.nodes.len();
        for edge in &graph.edges {
            let (s, t) = (edge.source, edge.target);
            if s >= node_count || t >= node_count || s == t {
                continue;
            }
            let delta = graph.nodes[t].position - graph.nodes[s].position;
            let direction = separation_direction(delta, t, s);
            let distance = delta.length().max(self.params.min_distance);
            let displacement = distance - self.ideal_length(edge.strength);
            let force = direction * (self.params.spring_stiffness * displacement);

            graph.nodes[s].apply_force(force);
            graph.nodes[t].apply_force(-force);
        }
    }

    /// Sum of per-node kinetic energy
    #[cfg(test)]
    pub fn kinetic_energy(graph: &ConceptGraph) -> f32 {
        graph
            .nodes
            .iter()
            .map(|n| 0.5 * n.mass * n.velocity.length_sq())
            .sum()
    }

    /// Average speed below half a pixel per frame
    pub fn is_settled(graph: &ConceptGraph) -> bool {
        if graph.is_empty() {
            return true;
        }
        let total: f32 = graph.nodes.iter().map(|n| n.velocity.length()).sum();
        total / (graph.nodes.len() as f32) < 0.5
    }
}

/// Unit vector along `delta`; coincident nodes get a fixed per-pair angle so
/// they still separate.
fn separation_direction(delta: Vector2, i: usize, j: usize) -> Vector2 {
    let length = delta.length();
    if length > 1e-4 {
        return delta / length;
    }
    let angle = ((i * 31 + j) as f32 * 0.618_034 + 0.37) * std::f32::consts::TAU;
    Vector2::new(angle.cos(), angle.sin())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::types::{ConceptEdge, ConceptNode};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FRAME: f32 = 1.0 / 60.0;

    fn graph_of(names: &[&str], edges: &[(usize, usize, u32)]) -> ConceptGraph {
        ConceptGraph {
            nodes: names
                .iter()
                .map(|name| ConceptNode::new(name.to_string(), 2, 12.0, false))
                .collect(),
            edges: edges
                .iter()
                .map(|&(source, target, strength)| ConceptEdge {
                    source,
                    target,
                    strength,
                })
                .collect(),
        }
    }

    fn random_graph(count: usize, seed: u64) -> ConceptGraph {
        let mut graph = ConceptGraph {
            nodes: (0..count)
                .map(|i| ConceptNode::new(format!("c{i}"), 1, 6.0 + (i % 5) as f32 * 3.0, i % 7 == 0))
                .collect(),
            edges: (1..count)
                .map(|i| ConceptEdge {
                    source: i - 1,
                    target: i,
                    strength: 2 + (i % 4) as u32,
                })
                .collect(),
        };
        let mut rng = StdRng::seed_from_u64(seed);
        graph.scatter(Vector2::new(300.0, 200.0), 40.0, &mut rng);
        graph
    }

    fn assert_in_bounds(graph: &ConceptGraph, width: f32, height: f32) {
        for node in &graph.nodes {
            assert!(node.radius > 0.0 && node.mass > 0.0);
            assert!(node.position.is_finite(), "{} is not finite", node.name);
            assert!(node.position.x >= node.radius - 1e-3 && node.position.x <= width - node.radius + 1e-3);
            assert!(node.position.y >= node.radius - 1e-3 && node.position.y <= height - node.radius + 1e-3);
        }
    }

    #[test]
    fn test_repulsion_is_equal_and_opposite() {
        let mut graph = graph_of(&["A", "B"], &[]);
        graph.nodes[0].position = Vector2::new(100.0, 100.0);
        graph.nodes[1].position = Vector2::new(160.0, 180.0);
        let sim = ForceSimulation::new(SimulationParams {
            centering: 0.0,
            ..Default::default()
        });
        sim.accumulate_forces(&mut graph, Vector2::ZERO);

        let (fa, fb) = (graph.nodes[0].force, graph.nodes[1].force);
        assert!((fa + fb).length() < 1e-5);
        // A is up-left of B, so it is pushed further up-left
        assert!(fa.x < 0.0 && fa.y < 0.0);
    }

    #[test]
    fn test_repulsion_decreases_with_distance() {
        let sim = ForceSimulation::new(SimulationParams {
            centering: 0.0,
            ..Default::default()
        });
        let force_at = |d: f32| {
            let mut graph = graph_of(&["A", "B"], &[]);
            graph.nodes[1].position = Vector2::new(d, 0.0);
            sim.accumulate_forces(&mut graph, Vector2::ZERO);
            graph.nodes[0].force.length()
        };
        assert!(force_at(20.0) > force_at(40.0));
        assert!(force_at(40.0) > force_at(200.0));
    }

    #[test]
    fn test_coincident_nodes_get_finite_push() {
        let mut graph = graph_of(&["A", "B"], &[(0, 1, 3)]);
        let sim = ForceSimulation::default();
        sim.accumulate_forces(&mut graph, Vector2::ZERO);
        assert!(graph.nodes[0].force.is_finite());
        assert!(graph.nodes[0].force.length() > 0.0);
    }

    #[test]
    fn test_stronger_links_are_shorter() {
        let sim = ForceSimulation::default();
        assert!(sim.ideal_length(2) < sim.ideal_length(1));
        assert!(sim.ideal_length(5) < sim.ideal_length(2));
        assert_eq!(sim.ideal_length(1000), sim.params.min_ideal_length);
    }

    #[test]
    fn test_stretched_spring_pulls_endpoints_together() {
        let mut graph = graph_of(&["A", "B"], &[(0, 1, 2)]);
        graph.nodes[1].position = Vector2::new(1000.0, 0.0);
        let sim = ForceSimulation::new(SimulationParams {
            repulsion: 0.0,
            centering: 0.0,
            ..Default::default()
        });
        sim.accumulate_forces(&mut graph, Vector2::ZERO);
        assert!(graph.nodes[0].force.x > 0.0);
        assert!(graph.nodes[1].force.x < 0.0);
    }

    #[test]
    fn test_long_frame_is_skipped() {
        let mut graph = graph_of(&["A", "B"], &[]);
        graph.nodes[0].position = Vector2::new(100.0, 100.0);
        graph.nodes[1].position = Vector2::new(110.0, 100.0);
        let before: Vec<_> = graph.nodes.iter().map(|n| n.position).collect();

        let sim = ForceSimulation::default();
        assert_eq!(sim.tick(&mut graph, 400.0, 400.0, 2.0), TickOutcome::Skipped);
        let after: Vec<_> = graph.nodes.iter().map(|n| n.position).collect();
        assert_eq!(before, after);

        assert_eq!(sim.tick(&mut graph, 400.0, 400.0, FRAME), TickOutcome::Stepped);
    }

    #[test]
    fn test_step_is_normalized_and_clamped() {
        let sim = ForceSimulation::default();
        assert!((sim.step_frames(FRAME).unwrap() - 1.0).abs() < 1e-4);
        assert_eq!(sim.step_frames(0.2), Some(3.0));
        assert_eq!(sim.step_frames(-1.0), Some(0.0));
        assert_eq!(sim.step_frames(f32::NAN), None);
    }

    #[test]
    fn test_empty_graph_is_a_no_op() {
        let mut graph = ConceptGraph::default();
        assert_eq!(ForceSimulation::default().tick(&mut graph, 100.0, 100.0, FRAME), TickOutcome::Empty);
    }

    #[test]
    fn test_positions_stay_in_bounds() {
        let (width, height) = (600.0, 400.0);
        let mut graph = random_graph(40, 11);
        let sim = ForceSimulation::default();
        for i in 0..600 {
            // Mix in irregular frame times
            let dt = if i % 17 == 0 { 0.1 } else { FRAME };
            sim.tick(&mut graph, width, height, dt);
            assert_in_bounds(&graph, width, height);
        }
    }

    #[test]
    fn test_barnes_hut_path_stays_bounded() {
        let (width, height) = (600.0, 400.0);
        let mut graph = random_graph(300, 3);
        let sim = ForceSimulation::default();
        assert!(graph.nodes.len() > sim.params.barnes_hut_threshold);
        for _ in 0..120 {
            sim.tick(&mut graph, width, height, FRAME);
        }
        assert_in_bounds(&graph, width, height);
    }

    #[test]
    fn test_dragged_node_is_not_moved_by_ticks() {
        let mut graph = random_graph(10, 5);
        graph.nodes[3].is_dragged = true;
        graph.nodes[3].position = Vector2::new(-50.0, -50.0);
        let sim = ForceSimulation::default();
        for _ in 0..100 {
            sim.tick(&mut graph, 600.0, 400.0, FRAME);
            assert_eq!(graph.nodes[3].position, Vector2::new(-50.0, -50.0));
            assert_eq!(graph.nodes[3].velocity, Vector2::ZERO);
        }
    }

    #[test]
    fn test_linked_pair_settles_closer_than_unlinked_node() {
        let mut graph = graph_of(&["A", "B", "C"], &[(0, 1, 5)]);
        graph.nodes[0].position = Vector2::new(380.0, 400.0);
        graph.nodes[1].position = Vector2::new(420.0, 400.0);
        graph.nodes[2].position = Vector2::new(400.0, 440.0);
        let sim = ForceSimulation::default();
        for _ in 0..2000 {
            sim.tick(&mut graph, 800.0, 800.0, FRAME);
        }

        let ab = graph.nodes[0].position.distance(graph.nodes[1].position);
        let ac = graph.nodes[0].position.distance(graph.nodes[2].position);
        assert!(ab < ac, "linked distance {ab} should be below unlinked {ac}");
        assert!(ForceSimulation::is_settled(&graph));
        assert!(ForceSimulation::kinetic_energy(&graph) < 1.0);
    }
}
