//! One-hop neighbor expansion around the selected entities

use std::collections::HashSet;

use crate::data::{Category, GraphSnapshot, NeighborRow};

/// Neighbor cap used when a caller passes `0`.
pub const FALLBACK_NEIGHBOR_CAP: usize = 4;

/// Collects edges touching any selected title, in store order, stopping at the cap.
pub fn expand_neighbors(snapshot: &GraphSnapshot, selected_titles: &[String], cap: usize) -> Vec<NeighborRow> {
    let cap = if cap == 0 { FALLBACK_NEIGHBOR_CAP } else { cap }.max(1);
    let selected: HashSet<String> = selected_titles.iter().map(|t| t.to_lowercase()).collect();
    if selected.is_empty() {
        return Vec::new();
    }
    let index = snapshot.category_index();
    let resolve = |explicit: Option<Category>, title: &str| {
        explicit
            .or_else(|| index.get(&title.to_lowercase()).copied())
            .unwrap_or(Category::Entity)
    };

    let mut rows = Vec::new();
    for edge in &snapshot.edges {
        let touches = selected.contains(&edge.source_title.to_lowercase())
            || selected.contains(&edge.target_title.to_lowercase());
        if !touches {
            continue;
        }
        rows.push(NeighborRow {
            source_category: resolve(edge.source_category, &edge.source_title),
            source_title: edge.source_title.clone(),
            target_category: resolve(edge.target_category, &edge.target_title),
            target_title: edge.target_title.clone(),
            description: edge.describe(),
            confidence: edge.confidence,
        });
        if rows.len() >= cap {
            break;
        }
    }
    rows
}
