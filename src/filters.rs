//! Publication filtering by search term, publication year and active concepts.

use crate::corpus::Publication;
use std::collections::BTreeSet;

/// Most concepts that can be active at once
pub const MAX_ACTIVE_CONCEPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Already at `MAX_ACTIVE_CONCEPTS`; nothing changed
    LimitReached,
}

impl ToggleOutcome {
    /// Sidebar feedback for a toggle of `concept`
    pub fn message(self, concept: &str) -> String {
        match self {
            ToggleOutcome::Added => format!("Filtering by \"{}\"", concept),
            ToggleOutcome::Removed => format!("Removed \"{}\"", concept),
            ToggleOutcome::LimitReached => {
                format!("Maximum of {} concepts can be selected", MAX_ACTIVE_CONCEPTS)
            }
        }
    }
}

/// Corpus plus the user's filters and the publications they select
#[derive(Debug)]
pub struct FilterState {
    corpus: Vec<Publication>,
    active_concepts: BTreeSet<String>,
    search_term: String,
    /// Earliest and latest year in the corpus
    year_bounds: Option<(i32, i32)>,
    year_range: Option<(i32, i32)>,
    filtered_indices: Vec<usize>,
    filtered_publications: Vec<Publication>,
    revision: u64,
}

impl FilterState {
    pub fn new(corpus: Vec<Publication>) -> Self {
        let year_bounds = corpus
            .iter()
            .filter_map(|p| p.publication_year)
            .fold(None, |bounds: Option<(i32, i32)>, year| match bounds {
                Some((lo, hi)) => Some((lo.min(year), hi.max(year))),
                None => Some((year, year)),
            });
        let mut state = Self {
            corpus,
            active_concepts: BTreeSet::new(),
            search_term: String::new(),
            year_bounds,
            year_range: year_bounds,
            filtered_indices: Vec::new(),
            filtered_publications: Vec::new(),
            revision: 0,
        };
        state.refilter(true);
        state
    }

    pub fn corpus(&self) -> &[Publication] {
        &self.corpus
    }

    pub fn active_concepts(&self) -> &BTreeSet<String> {
        &self.active_concepts
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Years spanned by the corpus, `None` if no publication has a year
    pub fn year_bounds(&self) -> Option<(i32, i32)> {
        self.year_bounds
    }

    pub fn year_range(&self) -> Option<(i32, i32)> {
        self.year_range
    }

    pub fn filtered_publications(&self) -> &[Publication] {
        &self.filtered_publications
    }

    /// Changes whenever the filtered publications or the active concepts do
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_search_term(&mut self, term: &str) {
        if self.search_term == term {
            return;
        }
        self.search_term = term.to_string();
        self.refilter(false);
    }

    /// Keep publications from `from..=to`, clamped to the corpus years.
    /// The ends may be given in either order.
    pub fn set_year_range(&mut self, from: i32, to: i32) {
        let Some((min, max)) = self.year_bounds else {
            return;
        };
        let range = Some((from.min(to).clamp(min, max), from.max(to).clamp(min, max)));
        if range == self.year_range {
            return;
        }
        self.year_range = range;
        self.refilter(false);
    }

    pub fn toggle_concept(&mut self, concept: &str) -> ToggleOutcome {
        let outcome = if self.active_concepts.remove(concept) {
            ToggleOutcome::Removed
        } else if self.active_concepts.len() >= MAX_ACTIVE_CONCEPTS {
            tracing::debug!("Concept limit reached, ignoring '{}'", concept);
            return ToggleOutcome::LimitReached;
        } else {
            self.active_concepts.insert(concept.to_string());
            ToggleOutcome::Added
        };
        self.refilter(true);
        outcome
    }

    /// Drop every concept and the search term, and reopen the year range
    pub fn clear(&mut self) {
        let had_concepts = !self.active_concepts.is_empty();
        self.active_concepts.clear();
        self.search_term.clear();
        self.year_range = self.year_bounds;
        self.refilter(had_concepts);
    }

    /// Does `publication` pass the current search term, year range and concepts?
    pub fn matches(&self, publication: &Publication) -> bool {
        let term = self.search_term.trim().to_lowercase();
        let text_match = term.is_empty()
            || publication.title.to_lowercase().contains(&term)
            || publication.summary.to_lowercase().contains(&term);
        text_match
            && self.year_matches(publication.publication_year)
            && self.active_concepts.iter().all(|c| publication.has_concept(c))
    }

    /// Undated publications only survive an unnarrowed range
    fn year_matches(&self, year: Option<i32>) -> bool {
        match (self.year_range, year) {
            (Some((from, to)), Some(year)) => (from..=to).contains(&year),
            (range, None) => range == self.year_bounds,
            (None, Some(_)) => true,
        }
    }

    fn refilter(&mut self, concepts_changed: bool) {
        let indices: Vec<usize> = self
            .corpus
            .iter()
            .enumerate()
            .filter(|(_, p)| self.matches(p))
            .map(|(i, _)| i)
            .collect();

        if !concepts_changed && indices == self.filtered_indices {
            return;
        }
        self.filtered_publications = indices.iter().map(|&i| self.corpus[i].clone()).collect();
        self.filtered_indices = indices;
        self.revision += 1;
        tracing::debug!(
            "Filter revision {}: {} of {} publications, {} active concepts",
            self.revision,
            self.filtered_publications.len(),
            self.corpus.len(),
            self.active_concepts.len()
        );
    }
}
