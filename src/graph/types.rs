//! Concept graph data types.
//!
//! Nodes live in one flat `Vec`; edges refer to them by index, so the
//! simulation, the renderer and the interaction controller all work on the
//! same arena without shared references.

use super::vector::Vector2;
use rand::Rng;
use serde::Serialize;

/// Radius at which a node has unit mass
const UNIT_MASS_RADIUS: f32 = 8.0;

/// A concept as a physical particle
#[derive(Debug, Clone, Serialize)]
pub struct ConceptNode {
    /// Concept label, unique within one graph
    pub name: String,
    /// Number of filtered publications mentioning the concept
    pub count: u32,
    pub position: Vector2,
    pub velocity: Vector2,
    /// Force accumulated during the current tick, cleared by `integrate`
    pub force: Vector2,
    pub mass: f32,
    pub radius: f32,
    pub is_hovered: bool,
    pub is_dragged: bool,
    pub is_active: bool,
}

impl ConceptNode {
    pub fn new(name: String, count: u32, radius: f32, is_active: bool) -> Self {
        let radius = radius.max(f32::EPSILON);
        Self {
            name,
            count,
            position: Vector2::ZERO,
            velocity: Vector2::ZERO,
            force: Vector2::ZERO,
            mass: mass_for_radius(radius),
            radius,
            is_hovered: false,
            is_dragged: false,
            is_active,
        }
    }

    pub fn apply_force(&mut self, force: Vector2) {
        self.force += force;
    }

    /// Semi-implicit Euler step. `dt` is in reference frames, so damping is
    /// applied once per frame regardless of the actual frame rate.
    ///
    /// Dragged nodes keep their position and velocity; the pointer owns them.
    pub fn integrate(&mut self, dt: f32, damping: f32, max_velocity: f32) {
        if self.is_dragged {
            self.force = Vector2::ZERO;
            return;
        }

        let acceleration = self.force / self.mass;
        self.velocity = (self.velocity + acceleration * dt) * damping.powf(dt);

        if self.velocity.length() > max_velocity {
            self.velocity = self.velocity.normalized() * max_velocity;
        }

        self.position += self.velocity * dt;
        self.force = Vector2::ZERO;
    }

    /// Keep the whole disc inside `[0, width] x [0, height]`, bouncing off
    /// walls with the given restitution.
    pub fn confine(&mut self, width: f32, height: f32, restitution: f32) {
        let (x, vx) = confine_axis(self.position.x, self.velocity.x, self.radius, width, restitution);
        let (y, vy) = confine_axis(self.position.y, self.velocity.y, self.radius, height, restitution);
        self.position = Vector2::new(x, y);
        self.velocity = Vector2::new(vx, vy);
    }

    pub fn contains(&self, point: Vector2, slop: f32) -> bool {
        self.position.distance(point) < self.radius + slop
    }
}

fn confine_axis(pos: f32, vel: f32, radius: f32, extent: f32, restitution: f32) -> (f32, f32) {
    // Surface narrower than the node: park it in the middle
    if extent <= radius * 2.0 {
        return (extent / 2.0, 0.0);
    }
    if pos < radius {
        (radius, vel.abs() * restitution)
    } else if pos > extent - radius {
        (extent - radius, -vel.abs() * restitution)
    } else {
        (pos, vel)
    }
}

/// Area-proportional mass
pub fn mass_for_radius(radius: f32) -> f32 {
    (radius / UNIT_MASS_RADIUS).powi(2)
}

/// Co-occurrence link between two nodes of the same graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConceptEdge {
    pub source: usize,
    pub target: usize,
    /// Publications containing both concepts
    pub strength: u32,
}

/// One generation of the concept graph
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConceptGraph {
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
}

impl ConceptGraph {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[cfg(test)]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    #[cfg(test)]
    pub fn node(&self, name: &str) -> Option<&ConceptNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Place every node randomly within `spread` of `center` and zero its motion
    pub fn scatter<R: Rng + ?Sized>(&mut self, center: Vector2, spread: f32, rng: &mut R) {
        let spread = spread.max(1.0);
        for node in &mut self.nodes {
            let offset = Vector2::new(rng.gen_range(-spread..spread), rng.gen_range(-spread..spread));
            node.position = center + offset;
            node.velocity = Vector2::ZERO;
            node.force = Vector2::ZERO;
        }
    }

    /// Largest edge strength, at least 1
    pub fn max_strength(&self) -> u32 {
        self.edges.iter().map(|e| e.strength).max().unwrap_or(1).max(1)
    }
}
