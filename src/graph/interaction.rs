//! Pointer interaction with the concept graph: hover, drag and click-to-toggle.
//!
//! The controller is a small state machine fed with surface-local pointer
//! events. It mutates node flags and dragged positions directly and reports
//! everything else (sounds, concept toggles) as effects for the owner to act on.

use super::layout::SimulationParams;
use super::types::{ConceptGraph, ConceptNode};
use super::vector::Vector2;
use crate::audio::Cue;

/// Pointer input, in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Moved(Vector2),
    Pressed(Vector2),
    Released(Vector2),
    /// Pointer left the surface
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionState {
    Idle,
    Hovering(usize),
    Dragging {
        node: usize,
        started_at: f64,
        origin: Vector2,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEffect {
    Play(Cue),
    /// Silence any cue still sounding
    ReleaseCues,
    ToggleConcept(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Default,
    Pointer,
    Grabbing,
}

impl CursorStyle {
    pub fn icon(self) -> egui::CursorIcon {
        match self {
            CursorStyle::Default => egui::CursorIcon::Default,
            CursorStyle::Pointer => egui::CursorIcon::PointingHand,
            CursorStyle::Grabbing => egui::CursorIcon::Grabbing,
        }
    }
}

pub struct InteractionController {
    state: InteractionState,
    hit_slop: f32,
    click_max_duration: f64,
    click_max_distance: f32,
}

impl InteractionController {
    pub fn new(params: &SimulationParams) -> Self {
        Self {
            state: InteractionState::Idle,
            hit_slop: params.hit_slop,
            click_max_duration: params.click_max_duration,
            click_max_distance: params.click_max_distance,
        }
    }

    /// Adopt new hit and click thresholds without dropping the current gesture
    pub fn set_params(&mut self, params: &SimulationParams) {
        self.hit_slop = params.hit_slop;
        self.click_max_duration = params.click_max_duration;
        self.click_max_distance = params.click_max_distance;
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    pub fn cursor(&self) -> CursorStyle {
        match self.state {
            InteractionState::Idle => CursorStyle::Default,
            InteractionState::Hovering(_) => CursorStyle::Pointer,
            InteractionState::Dragging { .. } => CursorStyle::Grabbing,
        }
    }

    /// Topmost node under `point`. Later nodes are drawn on top, so search
    /// from the end.
    pub fn hit_test(nodes: &[ConceptNode], point: Vector2, slop: f32) -> Option<usize> {
        nodes.iter().rposition(|node| node.contains(point, slop))
    }

    /// Feed one pointer event; `now` is in seconds.
    pub fn handle(&mut self, event: PointerEvent, now: f64, graph: &mut ConceptGraph) -> Vec<InteractionEffect> {
        let mut effects = Vec::new();

        match (event, self.state) {
            (PointerEvent::Moved(point), InteractionState::Dragging { node, .. }) => {
                if let Some(n) = graph.nodes.get_mut(node) {
                    n.position = point;
                    n.velocity = Vector2::ZERO;
                }
            }
            (PointerEvent::Moved(point), state) => {
                let hit = Self::hit_test(&graph.nodes, point, self.hit_slop);
                let current = match state {
                    InteractionState::Hovering(n) => Some(n),
                    _ => None,
                };
                if hit != current {
                    set_flag(graph, current, |n| n.is_hovered = false);
                    match hit {
                        Some(n) => {
                            set_flag(graph, Some(n), |node| node.is_hovered = true);
                            self.state = InteractionState::Hovering(n);
                            effects.push(InteractionEffect::Play(Cue::Hover));
                        }
                        None => self.state = InteractionState::Idle,
                    }
                }
            }
            (PointerEvent::Pressed(point), InteractionState::Dragging { .. }) => {
                tracing::debug!("Ignoring press at {:?} during drag", point);
            }
            (PointerEvent::Pressed(point), state) => {
                if let Some(hit) = Self::hit_test(&graph.nodes, point, self.hit_slop) {
                    if let InteractionState::Hovering(previous) = state {
                        if previous != hit {
                            set_flag(graph, Some(previous), |n| n.is_hovered = false);
                        }
                    }
                    set_flag(graph, Some(hit), |n| {
                        n.is_hovered = true;
                        n.is_dragged = true;
                        n.velocity = Vector2::ZERO;
                    });
                    self.state = InteractionState::Dragging {
                        node: hit,
                        started_at: now,
                        origin: point,
                    };
                }
            }
            (
                PointerEvent::Released(point),
                InteractionState::Dragging {
                    node,
                    started_at,
                    origin,
                },
            ) => {
                set_flag(graph, Some(node), |n| {
                    n.is_dragged = false;
                    n.is_hovered = false;
                });
                self.state = InteractionState::Idle;

                let quick = now - started_at < self.click_max_duration;
                let still = origin.distance(point) <= self.click_max_distance;
                if quick && still {
                    if let Some(n) = graph.nodes.get(node) {
                        effects.push(InteractionEffect::Play(Cue::Click));
                        effects.push(InteractionEffect::ToggleConcept(n.name.clone()));
                    }
                }
            }
            (PointerEvent::Released(_), _) => {}
            (PointerEvent::Left, InteractionState::Idle) => {}
            (PointerEvent::Left, _) => {
                self.reset(graph);
                effects.push(InteractionEffect::ReleaseCues);
            }
        }

        effects
    }

    /// Back to idle, clearing any hover/drag flags this controller set
    pub fn reset(&mut self, graph: &mut ConceptGraph) {
        let held = match self.state {
            InteractionState::Idle => None,
            InteractionState::Hovering(n) => Some(n),
            InteractionState::Dragging { node, .. } => Some(node),
        };
        set_flag(graph, held, |n| {
            n.is_hovered = false;
            n.is_dragged = false;
        });
        self.state = InteractionState::Idle;
    }
}

fn set_flag(graph: &mut ConceptGraph, index: Option<usize>, f: impl FnOnce(&mut ConceptNode)) {
    if let Some(node) = index.and_then(|i| graph.nodes.get_mut(i)) {
        f(node);
    }
}
