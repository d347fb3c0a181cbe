//! Concept graph: data structures, layout, interaction and lifecycle.

pub mod builder;
pub mod interaction;
pub mod layout;
pub mod lifecycle;
pub mod quadtree;
pub mod types;
pub mod vector;
pub mod view;

pub use layout::SimulationParams;
pub use view::GraphView;
