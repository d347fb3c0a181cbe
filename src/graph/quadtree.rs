//! Barnes-Hut quadtree for repulsion on large concept graphs.
//!
//! Distant groups of nodes are treated as a single body at their center of
//! mass, turning the O(n²) pairwise repulsion into O(n log n).

use super::vector::Vector2;

/// Bodies closer than this are treated as the query body itself
const SELF_DISTANCE: f32 = 1e-4;

/// Depth limit for coincident points
const MAX_DEPTH: u32 = 48;

#[derive(Debug, Default)]
pub enum QuadNode {
    #[default]
    Empty,
    Leaf {
        pos: Vector2,
        mass: f32,
    },
    Internal {
        center_of_mass: Vector2,
        total_mass: f32,
        count: u32,
        /// NW, NE, SW, SE
        children: Box<[QuadNode; 4]>,
    },
}

/// Square cell of the tree
#[derive(Debug, Clone, Copy)]
pub struct Cell {
    pub min: Vector2,
    pub size: f32,
}

impl Cell {
    fn center(&self) -> Vector2 {
        self.min + Vector2::new(self.size / 2.0, self.size / 2.0)
    }

    fn quadrant(&self, pos: Vector2) -> usize {
        let c = self.center();
        match (pos.y >= c.y, pos.x >= c.x) {
            (false, false) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (true, true) => 3,
        }
    }

    fn child(&self, quadrant: usize) -> Cell {
        let half = self.size / 2.0;
        let offset = match quadrant {
            0 => Vector2::ZERO,
            1 => Vector2::new(half, 0.0),
            2 => Vector2::new(0.0, half),
            _ => Vector2::new(half, half),
        };
        Cell {
            min: self.min + offset,
            size: half,
        }
    }
}

pub struct Quadtree {
    pub root: QuadNode,
    pub cell: Cell,
    /// Opening angle: cell_size / distance below which a cell is approximated
    pub theta: f32,
}

impl Quadtree {
    pub fn build(bodies: &[(Vector2, f32)], theta: f32) -> Self {
        let mut tree = Self {
            root: QuadNode::Empty,
            cell: Cell {
                min: Vector2::ZERO,
                size: 0.0,
            },
            theta,
        };
        if bodies.is_empty() {
            return tree;
        }

        let mut min = Vector2::new(f32::MAX, f32::MAX);
        let mut max = Vector2::new(f32::MIN, f32::MIN);
        for (pos, _) in bodies {
            min = Vector2::new(min.x.min(pos.x), min.y.min(pos.y));
            max = Vector2::new(max.x.max(pos.x), max.y.max(pos.y));
        }
        let padding = 10.0;
        let size = (max.x - min.x).max(max.y - min.y) + padding * 2.0;
        tree.cell = Cell {
            min: min - Vector2::new(padding, padding),
            size,
        };

        for &(pos, mass) in bodies {
            tree.root = Self::insert(std::mem::take(&mut tree.root), pos, mass, tree.cell, 0);
        }
        tree
    }

    fn insert(node: QuadNode, pos: Vector2, mass: f32, cell: Cell, depth: u32) -> QuadNode {
        match node {
            QuadNode::Empty => QuadNode::Leaf { pos, mass },
            QuadNode::Leaf {
                pos: existing,
                mass: existing_mass,
            } => {
                if depth >= MAX_DEPTH {
                    // Coincident points: merge into one body
                    return QuadNode::Leaf {
                        pos: existing,
                        mass: existing_mass + mass,
                    };
                }
                let mut children: Box<[QuadNode; 4]> = Box::default();
                let q = cell.quadrant(existing);
                children[q] = QuadNode::Leaf {
                    pos: existing,
                    mass: existing_mass,
                };
                let split = QuadNode::Internal {
                    center_of_mass: existing,
                    total_mass: existing_mass,
                    count: 1,
                    children,
                };
                Self::insert(split, pos, mass, cell, depth)
            }
            QuadNode::Internal {
                center_of_mass,
                total_mass,
                count,
                mut children,
            } => {
                let q = cell.quadrant(pos);
                children[q] = Self::insert(std::mem::take(&mut children[q]), pos, mass, cell.child(q), depth + 1);
                let new_total = total_mass + mass;
                QuadNode::Internal {
                    center_of_mass: (center_of_mass * total_mass + pos * mass) / new_total,
                    total_mass: new_total,
                    count: count + 1,
                    children,
                }
            }
        }
    }

    /// Repulsion per unit mass at `pos`: sum of `repulsion * m / d²` pushing away
    /// from every other body. Multiply by the query body's mass for the force.
    pub fn repulsion_at(&self, pos: Vector2, repulsion: f32, min_distance: f32) -> Vector2 {
        self.repulsion_from(&self.root, self.cell, pos, repulsion, min_distance)
    }

    fn repulsion_from(&self, node: &QuadNode, cell: Cell, pos: Vector2, repulsion: f32, min_distance: f32) -> Vector2 {
        match node {
            QuadNode::Empty => Vector2::ZERO,
            QuadNode::Leaf { pos: body, mass } => {
                let delta = pos - *body;
                if delta.length() < SELF_DISTANCE {
                    return Vector2::ZERO;
                }
                push_away(delta, *mass, repulsion, min_distance)
            }
            QuadNode::Internal {
                center_of_mass,
                total_mass,
                children,
                ..
            } => {
                let delta = pos - *center_of_mass;
                let distance = delta.length().max(min_distance);
                if cell.size / distance < self.theta && delta.length() >= SELF_DISTANCE {
                    push_away(delta, *total_mass, repulsion, min_distance)
                } else {
                    children
                        .iter()
                        .enumerate()
                        .map(|(q, child)| self.repulsion_from(child, cell.child(q), pos, repulsion, min_distance))
                        .fold(Vector2::ZERO, |acc, f| acc + f)
                }
            }
        }
    }
}

fn push_away(delta: Vector2, mass: f32, repulsion: f32, min_distance: f32) -> Vector2 {
    let distance = delta.length().max(min_distance);
    let direction = if delta.length() > SELF_DISTANCE {
        delta / delta.length()
    } else {
        Vector2::new(1.0, 0.0)
    };
    direction * (repulsion * mass / (distance * distance))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quadtree_build() {
        let bodies = vec![
            (Vector2::new(0.0, 0.0), 1.0),
            (Vector2::new(100.0, 0.0), 1.0),
            (Vector2::new(0.0, 100.0), 1.0),
            (Vector2::new(100.0, 100.0), 1.0),
        ];
        let tree = Quadtree::build(&bodies, 0.8);
        match &tree.root {
            QuadNode::Internal { count, total_mass, .. } => {
                assert_eq!(*count, 4);
                assert_eq!(*total_mass, 4.0);
            }
            other => panic!("Expected internal node, got {:?}", other),
        }
    }

    #[test]
    fn test_repulsion_points_away() {
        let bodies = vec![(Vector2::new(0.0, 0.0), 1.0), (Vector2::new(100.0, 0.0), 1.0)];
        let tree = Quadtree::build(&bodies, 0.8);
        let force = tree.repulsion_at(Vector2::new(0.0, 0.0), 1000.0, 1.0);
        assert!(force.x < 0.0, "Force should push left: {:?}", force);
        assert!((force.x + 0.1).abs() < 1e-4);
    }

    #[test]
    fn test_coincident_points_do_not_recurse_forever() {
        let bodies: Vec<_> = (0..10).map(|_| (Vector2::new(5.0, 5.0), 1.0)).collect();
        let tree = Quadtree::build(&bodies, 0.8);
        let force = tree.repulsion_at(Vector2::new(5.0, 5.0), 1000.0, 1.0);
        assert!(force.is_finite());
    }
}
