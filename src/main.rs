//! Research Explorer
//!
//! A desktop app for exploring a publication corpus through an interactive,
//! force-directed graph of its key concepts.

mod app;
mod audio;
mod corpus;
mod filters;
mod graph;
mod settings;
mod theme;

use eframe::egui;
use std::path::PathBuf;

fn main() -> eframe::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let (publications, label) = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => match corpus::load_corpus(&path) {
            Ok(publications) => (publications, path.display().to_string()),
            Err(e) => {
                tracing::error!("{}; falling back to the sample corpus", e);
                (sample_or_empty(), "sample corpus".to_string())
            }
        },
        None => (sample_or_empty(), "sample corpus".to_string()),
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_title("Research Explorer"),
        persist_window: true, // Persist window state and egui memory between sessions
        ..Default::default()
    };

    eframe::run_native(
        "Research Explorer",
        options,
        Box::new(|cc| Ok(Box::new(app::ResearchExplorerApp::new(cc, publications, label)))),
    )
}

fn sample_or_empty() -> Vec<corpus::Publication> {
    corpus::sample_corpus().unwrap_or_else(|e| {
        tracing::error!("Embedded corpus is invalid: {}", e);
        Vec::new()
    })
}
