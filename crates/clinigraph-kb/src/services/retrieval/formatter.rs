//! Renders scored entities and neighbor rows into the grounding context

use crate::data::{NeighborRow, ScoredEntity};

/// Entity bodies longer than this are cut and marked with an ellipsis.
pub const BODY_LIMIT: usize = 400;

/// Keeps the first `max_chars` characters and appends `marker` when `text` is longer.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize, marker: &str) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &text[..cut], marker),
        None => text.to_string(),
    }
}

/// Builds the context block handed to the completion service.
///
/// ```text
/// Relevant Nodes:
/// 1. [Diagnosis] Hypertension
/// High BP
///
/// Neighbor Relationships:
/// - [Diagnosis] Hypertension --ASSOCIATED_WITH--> [Medication] Lisinopril :: first-line treatment
/// ```
pub fn format_context(scored: &[ScoredEntity], neighbors: &[NeighborRow]) -> String {
    let mut lines = vec!["Relevant Nodes:".to_string()];
    for (i, item) in scored.iter().enumerate() {
        let body = truncate_with_ellipsis(item.entity.body.trim(), BODY_LIMIT, "…");
        lines.push(format!(
            "{}. [{}] {}\n{}",
            i + 1,
            item.entity.category,
            item.entity.title,
            body
        ));
    }

    if !neighbors.is_empty() {
        lines.push("\nNeighbor Relationships:".to_string());
        for row in neighbors.iter().filter(|r| !r.target_title.is_empty()) {
            lines.push(format!(
                "- [{}] {} --ASSOCIATED_WITH--> [{}] {} :: {}",
                row.source_category, row.source_title, row.target_category, row.target_title, row.description
            ));
        }
    }
    lines.join("\n")
}

/// Like [`format_context`], but never longer than `max_chars` characters.
pub fn format_bounded_context(scored: &[ScoredEntity], neighbors: &[NeighborRow], max_chars: usize) -> String {
    let context = format_context(scored, neighbors);
    if context.chars().count() <= max_chars {
        return context;
    }
    const MARKER: &str = "...";
    if max_chars <= MARKER.len() {
        return MARKER[..max_chars].to_string();
    }
    truncate_with_ellipsis(&context, max_chars - MARKER.len(), MARKER)
}
