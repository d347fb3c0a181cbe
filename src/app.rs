//! Main application state and UI.

use crate::audio::{self, AudioUnits};
use crate::corpus::{self, Publication};
use crate::filters::{FilterState, ToggleOutcome};
use crate::graph::view::ViewOptions;
use crate::graph::{GraphView, SimulationParams};
use crate::settings::Settings;
use crate::theme;
use eframe::egui::{self, Color32};
use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Main explorer application
pub struct ResearchExplorerApp {
    // Data
    filters: FilterState,
    concept_counts: Vec<(String, usize)>,
    corpus_label: String,

    // Graph
    view: GraphView,
    audio_enabled: Rc<Cell<bool>>,

    // UI state
    search_input: String,
    feedback: Option<(String, Color32)>,

    // Performance tracking
    last_frame: Instant,
    frame_times: Vec<f32>,
    fps: f32,

    // Settings persistence
    settings: Settings,
    settings_dirty: bool,
    last_settings_save: Instant,
}

impl ResearchExplorerApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, publications: Vec<Publication>, corpus_label: String) -> Self {
        let settings = Settings::load();

        let audio_enabled = Rc::new(Cell::new(settings.audio_enabled));
        let factory_flag = audio_enabled.clone();
        let view = GraphView::new(
            settings.simulation,
            Box::new(move || {
                if factory_flag.get() {
                    AudioUnits::new(Box::new(audio::system_output))
                } else {
                    AudioUnits::silent()
                }
            }),
        );

        let concept_counts = concept_counts(&publications);
        tracing::info!(
            "Loaded {} publications with {} distinct concepts from {}",
            publications.len(),
            concept_counts.len(),
            corpus_label
        );

        Self {
            filters: FilterState::new(publications),
            concept_counts,
            corpus_label,
            view,
            audio_enabled,
            search_input: String::new(),
            feedback: None,
            last_frame: Instant::now(),
            frame_times: Vec::with_capacity(60),
            fps: 0.0,
            settings,
            settings_dirty: false,
            last_settings_save: Instant::now(),
        }
    }

    /// Mark settings as needing to be saved
    fn mark_settings_dirty(&mut self) {
        self.settings_dirty = true;
    }

    /// Copy current UI state to settings struct
    fn sync_settings_from_ui(&mut self) {
        self.settings.simulation = *self.view.lifecycle().params();
        self.settings.audio_enabled = self.audio_enabled.get();
    }

    /// Save settings if dirty and enough time has passed (debounce)
    fn maybe_save_settings(&mut self) {
        if self.settings_dirty && self.last_settings_save.elapsed().as_secs() >= 2 {
            self.sync_settings_from_ui();
            self.settings.save();
            self.settings_dirty = false;
            self.last_settings_save = Instant::now();
        }
    }

    fn update_fps(&mut self) {
        let now = Instant::now();
        let frame_time = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        self.frame_times.push(frame_time);
        if self.frame_times.len() > 60 {
            self.frame_times.remove(0);
        }

        if !self.frame_times.is_empty() {
            let avg_frame_time: f32 = self.frame_times.iter().sum::<f32>() / self.frame_times.len() as f32;
            if avg_frame_time > 0.0 {
                self.fps = 1.0 / avg_frame_time;
            }
        }
    }

    fn toggle_concept(&mut self, concept: &str) {
        let outcome = self.filters.toggle_concept(concept);
        let color = match outcome {
            ToggleOutcome::LimitReached => theme::state::WARNING,
            ToggleOutcome::Added | ToggleOutcome::Removed => theme::state::SUCCESS,
        };
        tracing::info!("Toggled concept '{}': {:?}", concept, outcome);
        self.feedback = Some((outcome.message(concept), color));
    }

    fn render_sidebar(&mut self, ui: &mut egui::Ui) {
        ui.heading("Research Explorer");
        ui.label(egui::RichText::new(&self.corpus_label).color(theme::text::MUTED).small());
        ui.add_space(10.0);

        ui.label(format!(
            "{} of {} publications",
            self.filters.filtered_publications().len(),
            self.filters.corpus().len()
        ));
        ui.add_space(6.0);

        // Search
        ui.horizontal(|ui| {
            ui.label("Search:");
            if ui.text_edit_singleline(&mut self.search_input).changed() {
                self.filters.set_search_term(&self.search_input);
            }
        });

        // Publication years
        if let (Some((min, max)), Some((mut from, mut to))) = (self.filters.year_bounds(), self.filters.year_range()) {
            ui.horizontal(|ui| {
                ui.label("Years:");
                let mut changed = ui.add(egui::DragValue::new(&mut from).range(min..=max)).changed();
                ui.label("to");
                changed |= ui.add(egui::DragValue::new(&mut to).range(min..=max)).changed();
                if changed {
                    self.filters.set_year_range(from, to);
                }
            });
        }
        ui.add_space(10.0);

        // Active concept chips
        ui.label("Active concepts (click to remove):");
        let active: Vec<String> = self.filters.active_concepts().iter().cloned().collect();
        if active.is_empty() {
            ui.colored_label(theme::text::MUTED, "None - click a node to filter");
        }
        let mut removed = None;
        ui.horizontal_wrapped(|ui| {
            for concept in &active {
                let chip = egui::Button::new(
                    egui::RichText::new(format!("{} ✕", concept)).color(theme::text::PRIMARY),
                )
                .fill(theme::node::ACTIVE.gamma_multiply(0.6));
                if ui.add(chip).clicked() {
                    removed = Some(concept.clone());
                }
            }
        });
        if let Some(concept) = removed {
            self.toggle_concept(&concept);
        }

        if let Some((message, color)) = &self.feedback {
            ui.colored_label(*color, message);
        }

        if ui.button("Clear filters").clicked() {
            self.filters.clear();
            self.search_input = self.filters.search_term().to_string();
            self.feedback = None;
        }

        ui.add_space(10.0);

        egui::CollapsingHeader::new("All concepts")
            .default_open(false)
            .show(ui, |ui| {
                let mut clicked = None;
                egui::ScrollArea::vertical()
                    .max_height(200.0)
                    .show(ui, |ui| {
                        for (concept, count) in &self.concept_counts {
                            let selected = self.filters.active_concepts().contains(concept);
                            if ui
                                .selectable_label(selected, format!("{} ({})", concept, count))
                                .clicked()
                            {
                                clicked = Some(concept.clone());
                            }
                        }
                    });
                if let Some(concept) = clicked {
                    self.toggle_concept(&concept);
                }
            });

        egui::CollapsingHeader::new("Display")
            .default_open(true)
            .show(ui, |ui| {
                if ui.checkbox(&mut self.settings.show_labels, "Show labels").changed() {
                    self.mark_settings_dirty();
                }
                if ui
                    .checkbox(&mut self.settings.show_edge_strength, "Show link strength")
                    .changed()
                {
                    self.mark_settings_dirty();
                }
                let mut audio_enabled = self.audio_enabled.get();
                if ui.checkbox(&mut audio_enabled, "Sound cues").changed() {
                    self.audio_enabled.set(audio_enabled);
                    // New audio units are created with the next graph generation
                    self.view.lifecycle_mut().invalidate();
                    self.mark_settings_dirty();
                }
            });

        egui::CollapsingHeader::new("Physics")
            .default_open(true)
            .show(ui, |ui| {
                let mut params = *self.view.lifecycle().params();
                let mut changed = false;
                changed |= ui
                    .add(egui::Slider::new(&mut params.repulsion, 500.0..=30000.0).text("Repulsion"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut params.spring_stiffness, 0.001..=0.2).text("Spring stiffness"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut params.ideal_length, 40.0..=300.0).text("Link length"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut params.centering, 0.0..=0.01).text("Centering"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut params.damping, 0.5..=0.99).text("Damping"))
                    .changed();
                changed |= ui
                    .add(egui::Slider::new(&mut params.base_radius, 4.0..=20.0).text("Node size"))
                    .changed();
                if changed {
                    self.view.lifecycle_mut().set_params(params);
                    self.mark_settings_dirty();
                }

                ui.horizontal(|ui| {
                    if ui.button("Reset layout").clicked() {
                        self.view.lifecycle_mut().invalidate();
                    }
                    if ui.button("Defaults").clicked() {
                        self.view.lifecycle_mut().set_params(SimulationParams::default());
                        self.view.lifecycle_mut().invalidate();
                        self.mark_settings_dirty();
                    }
                });
            });

        ui.add_space(10.0);

        // Frame statistics
        let lifecycle = self.view.lifecycle();
        let stats = lifecycle.stats();
        let (nodes, edges) = lifecycle
            .graph()
            .map_or((0, 0), |g| (g.nodes.len(), g.edges.len()));
        ui.colored_label(theme::text::SECONDARY, format!("{:.0} fps", self.fps));
        ui.colored_label(theme::text::SECONDARY, format!("{} concepts, {} links", nodes, edges));
        if nodes > 0 {
            let status = if lifecycle.is_settled() { "Layout settled" } else { "Layout moving" };
            ui.colored_label(theme::text::MUTED, status);
        }
        ui.colored_label(
            theme::text::MUTED,
            format!(
                "{} frames, {} skipped, {} rebuilds",
                stats.frames, stats.skipped_frames, stats.rebuilds
            ),
        );
    }
}

impl eframe::App for ResearchExplorerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.update_fps();
        self.maybe_save_settings();

        ctx.set_visuals(egui::Visuals::dark());

        egui::SidePanel::left("sidebar")
            .min_width(240.0)
            .frame(egui::Frame::side_top_panel(&ctx.style()).fill(theme::bg::PANEL))
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_sidebar(ui);
                });
            });

        let options = ViewOptions {
            show_labels: self.settings.show_labels,
            show_edge_strength: self.settings.show_edge_strength,
        };
        let toggled = egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(theme::bg::GRAPH))
            .show(ctx, |ui| {
                self.view.show(
                    ui,
                    self.filters.revision(),
                    self.filters.filtered_publications(),
                    self.filters.active_concepts(),
                    options,
                )
            })
            .inner;

        for concept in toggled {
            self.toggle_concept(&concept);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.view.lifecycle_mut().unmount();

        // Force save settings on exit
        if self.settings_dirty {
            self.sync_settings_from_ui();
            self.settings.save();
        }
    }
}

/// Concepts with the number of publications mentioning each, most common first
fn concept_counts(publications: &[Publication]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = corpus::all_concepts(publications)
        .into_iter()
        .map(|concept| {
            let count = publications.iter().filter(|p| p.has_concept(&concept)).count();
            (concept, count)
        })
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concept_counts_sorted_by_frequency() {
        let publications = corpus::sample_corpus().unwrap();
        let counts = concept_counts(&publications);
        assert!(!counts.is_empty());
        assert!(counts.windows(2).all(|w| w[0].1 >= w[1].1));
        let microgravity = counts.iter().find(|(c, _)| c == "Microgravity").unwrap();
        assert_eq!(
            microgravity.1,
            publications.iter().filter(|p| p.has_concept("Microgravity")).count()
        );
    }
}
