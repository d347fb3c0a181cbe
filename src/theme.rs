//! Unified theme and color constants for the explorer.
//!
//! Graph and panel colors are sourced from here so the surface and the
//! sidebar stay visually consistent.

use egui::Color32;

/// Background colors for different layers
pub mod bg {
    use super::*;

    /// Graph surface - darkest layer
    pub const GRAPH: Color32 = Color32::from_rgb(14, 17, 23);

    /// Panel backgrounds - slightly lighter than graph
    pub const PANEL: Color32 = Color32::from_rgb(20, 22, 28);
}

/// Concept node fills
pub mod node {
    use super::*;

    /// Regular concept (#00305E)
    pub const BASE: Color32 = Color32::from_rgb(0x00, 0x30, 0x5E);

    /// Concept selected as a filter (#BE0AFF)
    pub const ACTIVE: Color32 = Color32::from_rgb(0xBE, 0x0A, 0xFF);

    /// Concept under the pointer (#FFA500)
    pub const HOVER: Color32 = Color32::from_rgb(0xFF, 0xA5, 0x00);

    pub const OUTLINE: Color32 = Color32::from_rgb(200, 205, 215);

    /// Pick the fill for a node; hover wins over active
    pub fn fill(is_hovered: bool, is_active: bool) -> Color32 {
        if is_hovered {
            HOVER
        } else if is_active {
            ACTIVE
        } else {
            BASE
        }
    }
}

/// Co-occurrence edges
pub mod edge {
    use super::*;

    pub const COLOR: Color32 = Color32::from_rgb(120, 130, 150);

    /// Opacity of the weakest and strongest edge
    pub const MIN_OPACITY: f32 = 0.25;
    pub const MAX_OPACITY: f32 = 0.9;

    /// Stroke width of the weakest and strongest edge
    pub const MIN_WIDTH: f32 = 1.0;
    pub const MAX_WIDTH: f32 = 5.0;
}

/// Text colors at different emphasis levels
pub mod text {
    use super::*;

    /// Node labels and primary text
    pub const PRIMARY: Color32 = Color32::from_rgb(240, 240, 245);

    /// Secondary text - medium contrast
    pub const SECONDARY: Color32 = Color32::from_rgb(180, 180, 190);

    /// Muted text - placeholders and hints
    pub const MUTED: Color32 = Color32::from_rgb(120, 125, 135);
}

/// State colors for sidebar feedback
pub mod state {
    use super::*;

    pub const SUCCESS: Color32 = Color32::from_rgb(34, 197, 94);

    pub const WARNING: Color32 = Color32::from_rgb(245, 158, 11);
}

/// Helper to create a stroke with consistent styling
pub fn stroke(color: Color32, width: f32) -> egui::Stroke {
    egui::Stroke::new(width, color)
}

/// Node rendering stroke widths
pub mod stroke_width {
    pub const NORMAL: f32 = 1.0;

    pub const HOVER: f32 = 2.0;

    pub const DRAGGED: f32 = 3.0;
}
