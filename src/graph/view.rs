//! egui surface for the concept graph.
//!
//! Translates egui pointer input into `PointerEvent`s, drives the lifecycle
//! once per frame and paints the current generation.

use super::interaction::{CursorStyle, PointerEvent};
use super::lifecycle::{AudioFactory, GraphLifecycle, LifecyclePhase, SurfaceSize};
use super::layout::SimulationParams;
use super::types::{ConceptEdge, ConceptGraph, ConceptNode};
use super::vector::Vector2;
use crate::corpus::Publication;
use crate::theme;
use eframe::egui::{self, Color32, Pos2, Vec2};
use std::collections::BTreeSet;

pub const PLACEHOLDER_TEXT: &str = "Select publications to build graph.";

/// Pointer state read from egui for one frame, in surface coordinates
#[derive(Debug, Clone, Copy, Default)]
pub struct PointerSample {
    pub position: Option<Vector2>,
    pub inside: bool,
    pub pressed: bool,
    pub released: bool,
}

/// Turns per-frame pointer samples into ordered events
#[derive(Debug, Default)]
pub struct PointerTracker {
    last: Option<Vector2>,
    inside: bool,
}

impl PointerTracker {
    /// Events for this frame: move, then press, then release. Leaving the
    /// surface produces `Left` and nothing else.
    pub fn events(&mut self, sample: PointerSample) -> Vec<PointerEvent> {
        let mut events = Vec::new();
        let was_inside = self.inside;
        self.inside = sample.inside;

        let Some(pos) = sample.position.filter(|_| sample.inside) else {
            if was_inside {
                events.push(PointerEvent::Left);
            }
            self.last = None;
            return events;
        };

        if self.last != Some(pos) {
            events.push(PointerEvent::Moved(pos));
            self.last = Some(pos);
        }
        if sample.pressed {
            events.push(PointerEvent::Pressed(pos));
        }
        if sample.released {
            events.push(PointerEvent::Released(pos));
        }
        events
    }
}

/// Display toggles from the sidebar
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub show_labels: bool,
    pub show_edge_strength: bool,
}

/// Stroke width and opacity for an edge, growing with strength
pub fn edge_style(strength: u32, max_strength: u32) -> (f32, f32) {
    let t = if max_strength > 1 {
        (strength.saturating_sub(1) as f32 / (max_strength - 1) as f32).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let width = theme::edge::MIN_WIDTH + (theme::edge::MAX_WIDTH - theme::edge::MIN_WIDTH) * t;
    let opacity = theme::edge::MIN_OPACITY + (theme::edge::MAX_OPACITY - theme::edge::MIN_OPACITY) * t;
    (width, opacity)
}

impl ConceptNode {
    /// Paint the node relative to the surface `origin`
    pub fn draw(&self, painter: &egui::Painter, origin: Pos2, show_label: bool) {
        let center = origin + Vec2::from(self.position);
        painter.circle_filled(center, self.radius, theme::node::fill(self.is_hovered, self.is_active));

        let width = if self.is_dragged {
            theme::stroke_width::DRAGGED
        } else if self.is_hovered {
            theme::stroke_width::HOVER
        } else {
            theme::stroke_width::NORMAL
        };
        painter.circle_stroke(center, self.radius, theme::stroke(theme::node::OUTLINE, width));

        if show_label || self.is_hovered {
            painter.text(
                center - Vec2::new(0.0, self.radius + 4.0),
                egui::Align2::CENTER_BOTTOM,
                format!("{} ({})", self.name, self.count),
                egui::FontId::proportional(12.0),
                theme::text::PRIMARY,
            );
        }
    }
}

impl ConceptEdge {
    pub fn draw(&self, graph: &ConceptGraph, painter: &egui::Painter, origin: Pos2, show_strength: bool) {
        let (Some(source), Some(target)) = (graph.nodes.get(self.source), graph.nodes.get(self.target)) else {
            return;
        };
        let a = origin + Vec2::from(source.position);
        let b = origin + Vec2::from(target.position);
        let (width, opacity) = edge_style(self.strength, graph.max_strength());
        painter.line_segment([a, b], theme::stroke(theme::edge::COLOR.gamma_multiply(opacity), width));

        if show_strength {
            painter.text(
                a + (b - a) * 0.5,
                egui::Align2::CENTER_CENTER,
                self.strength.to_string(),
                egui::FontId::proportional(10.0),
                theme::text::SECONDARY,
            );
        }
    }
}

/// The knowledge graph widget
pub struct GraphView {
    lifecycle: GraphLifecycle,
    pointer: PointerTracker,
}

impl GraphView {
    pub fn new(params: SimulationParams, audio_factory: AudioFactory) -> Self {
        Self {
            lifecycle: GraphLifecycle::new(params, audio_factory),
            pointer: PointerTracker::default(),
        }
    }

    pub fn lifecycle(&self) -> &GraphLifecycle {
        &self.lifecycle
    }

    pub fn lifecycle_mut(&mut self) -> &mut GraphLifecycle {
        &mut self.lifecycle
    }

    /// Run one frame and paint into the remaining space of `ui`.
    /// Returns the concepts clicked during this frame, in click order.
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        revision: u64,
        publications: &[Publication],
        active_concepts: &BTreeSet<String>,
        options: ViewOptions,
    ) -> Vec<String> {
        // The frame scheduled last time; a rebuild below makes it stale
        let ticket = self.lifecycle.pending_frame();
        self.lifecycle.sync_inputs(revision, publications, active_concepts);

        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        let rect = response.rect;
        painter.rect_filled(rect, 0.0, theme::bg::GRAPH);
        self.lifecycle.resize(SurfaceSize::new(
            rect.width(),
            rect.height(),
            ui.ctx().pixels_per_point(),
        ));

        let (latest, pressed, released, now) = ui.input(|i| {
            (
                i.pointer.latest_pos(),
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.time,
            )
        });
        let sample = PointerSample {
            position: latest.map(|p| Vector2::from(p - rect.min)),
            inside: latest.map_or(false, |p| rect.contains(p)),
            pressed,
            released,
        };

        let mut toggled = Vec::new();
        for event in self.pointer.events(sample) {
            self.lifecycle
                .pointer(event, now, &mut |name: &str| toggled.push(name.to_string()));
        }

        if let Some(ticket) = ticket {
            self.lifecycle.frame(ticket, now);
        }

        self.paint(&painter, rect, options);

        let cursor = self.lifecycle.cursor();
        if response.hovered() || cursor == CursorStyle::Grabbing {
            ui.ctx().set_cursor_icon(cursor.icon());
        }
        // The loop runs for as long as a frame is scheduled
        if self.lifecycle.pending_frame().is_some() {
            ui.ctx().request_repaint();
        }

        toggled
    }

    fn paint(&self, painter: &egui::Painter, rect: egui::Rect, options: ViewOptions) {
        let graph = match (self.lifecycle.phase(), self.lifecycle.graph()) {
            (LifecyclePhase::Running, Some(graph)) => graph,
            (LifecyclePhase::AwaitingSize, _) => return,
            _ => {
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    PLACEHOLDER_TEXT,
                    egui::FontId::proportional(18.0),
                    theme::text::MUTED,
                );
                return;
            }
        };

        let painter = painter.with_clip_rect(rect);
        for edge in &graph.edges {
            edge.draw(graph, &painter, rect.min, options.show_edge_strength);
        }
        for node in &graph.nodes {
            node.draw(&painter, rect.min, options.show_labels);
        }

        if graph.edges.is_empty() && graph.nodes.len() > 1 {
            painter.text(
                rect.left_bottom() + Vec2::new(8.0, -8.0),
                egui::Align2::LEFT_BOTTOM,
                "No concept pairs co-occur often enough to link",
                egui::FontId::proportional(11.0),
                Color32::from_gray(110),
            );
        }
    }
}
