//! Derives the concept graph from the filtered publication list.

use super::layout::SimulationParams;
use super::types::{ConceptEdge, ConceptGraph, ConceptNode};
use crate::corpus::Publication;
use std::collections::{BTreeSet, HashMap};

/// Minimum number of shared publications for two concepts to be linked
pub const MIN_OCCURRENCE_FOR_LINK: u32 = 2;

/// Node radius from the concept's occurrence count
pub fn concept_radius(count: u32, is_active: bool, params: &SimulationParams) -> f32 {
    let bonus = if is_active {
        params.active_bonus
    } else {
        params.inactive_bonus
    };
    params.base_radius + ((count + 1) as f32).log2() * bonus
}

/// Build nodes and co-occurrence edges for `publications`.
///
/// Nodes keep the order in which concepts first appear. A concept repeated
/// within one publication counts once for that publication. Positions are
/// left at the origin; the lifecycle scatters them once the surface size is
/// known.
pub fn build_graph(
    publications: &[Publication],
    active_concepts: &BTreeSet<String>,
    params: &SimulationParams,
) -> ConceptGraph {
    let mut names: Vec<&str> = Vec::new();
    let mut index_by_name: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<u32> = Vec::new();
    let mut pair_counts: HashMap<(usize, usize), u32> = HashMap::new();

    for publication in publications {
        let mut present: Vec<usize> = publication
            .key_concepts
            .iter()
            .map(|concept| {
                *index_by_name.entry(concept.as_str()).or_insert_with(|| {
                    names.push(concept.as_str());
                    counts.push(0);
                    names.len() - 1
                })
            })
            .collect();
        present.sort_unstable();
        present.dedup();

        for &index in &present {
            counts[index] += 1;
        }

        for (i, &a) in present.iter().enumerate() {
            for &b in &present[i + 1..] {
                *pair_counts.entry((a, b)).or_insert(0) += 1;
            }
        }
    }

    let nodes: Vec<ConceptNode> = names
        .iter()
        .zip(&counts)
        .map(|(&name, &count)| {
            let is_active = active_concepts.contains(name);
            ConceptNode::new(
                name.to_string(),
                count,
                concept_radius(count, is_active, params),
                is_active,
            )
        })
        .collect();

    let mut edges: Vec<ConceptEdge> = pair_counts
        .into_iter()
        .filter(|&(_, strength)| strength >= MIN_OCCURRENCE_FOR_LINK)
        .map(|((source, target), strength)| ConceptEdge {
            source,
            target,
            strength,
        })
        .collect();
    edges.sort_by_key(|e| (e.source, e.target));

    tracing::debug!(
        "Built concept graph: {} nodes, {} edges from {} publications",
        nodes.len(),
        edges.len(),
        publications.len()
    );

    ConceptGraph { nodes, edges }
}
