//! Publication corpus loading.
//!
//! The corpus is a JSON array of publications. A small sample corpus is
//! embedded in the binary so the explorer runs without any arguments.

use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

const SAMPLE_CORPUS: &str = include_str!("../data/publications.json");

/// A single publication from the corpus.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub journal: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub key_concepts: Vec<String>,
    #[serde(default)]
    pub doi: String,
}

impl Publication {
    pub fn has_concept(&self, concept: &str) -> bool {
        self.key_concepts.iter().any(|c| c == concept)
    }
}

/// Parse a corpus from a JSON string
pub fn parse_corpus(json: &str) -> Result<Vec<Publication>, String> {
    serde_json::from_str(json).map_err(|e| format!("Failed to parse publications: {}", e))
}

/// Load a corpus from a JSON file on disk
pub fn load_corpus(path: &Path) -> Result<Vec<Publication>, String> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let publications = parse_corpus(&contents)?;
    tracing::info!("Loaded {} publications from {}", publications.len(), path.display());
    Ok(publications)
}

/// The embedded sample corpus
pub fn sample_corpus() -> Result<Vec<Publication>, String> {
    parse_corpus(SAMPLE_CORPUS)
}

/// Sorted, deduplicated list of every concept in the corpus
pub fn all_concepts(publications: &[Publication]) -> Vec<String> {
    publications
        .iter()
        .flat_map(|p| p.key_concepts.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
