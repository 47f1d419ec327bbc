//! Lexical relevance scoring of entities against a free-text question

use tracing::debug;

use crate::data::{Entity, ScoredEntity};

/// Result count used when a caller passes `top_k = 0`.
pub const FALLBACK_TOP_K: usize = 6;

#[derive(Debug, Clone, Default)]
pub struct ScoreOptions {
    pub top_k: usize,
    /// Category names (case-insensitive) an entity must belong to.
    pub include_categories: Option<Vec<String>>,
}

impl ScoreOptions {
    pub fn top(top_k: usize) -> Self {
        Self {
            top_k,
            include_categories: None,
        }
    }

    fn limit(&self) -> usize {
        let k = if self.top_k == 0 { FALLBACK_TOP_K } else { self.top_k };
        k.max(1)
    }
}

/// Lowercases, collapses whitespace runs to a single space and trims.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Scores each entity by how often the question's terms occur in its title
/// and body, keeping the best `top_k` with a positive score.
///
/// Ties keep their store order.
pub fn score_entities(entities: &[Entity], question: &str, options: &ScoreOptions) -> Vec<ScoredEntity> {
    let normalized = normalize_text(question);
    let terms: Vec<&str> = normalized.split(' ').filter(|t| !t.is_empty()).collect();
    let allow: Option<Vec<String>> = options
        .include_categories
        .as_ref()
        .filter(|c| !c.is_empty())
        .map(|c| c.iter().map(|s| s.trim().to_lowercase()).collect());

    let mut scored: Vec<ScoredEntity> = entities
        .iter()
        .filter(|e| match &allow {
            Some(names) => names.iter().any(|n| *n == e.category.name().to_lowercase()),
            None => true,
        })
        .filter_map(|entity| {
            let haystack = normalize_text(&format!("{} {}", entity.title, entity.body));
            let score = terms.iter().map(|t| haystack.matches(t).count()).sum::<usize>();
            (score > 0).then(|| ScoredEntity {
                entity: entity.clone(),
                score,
            })
        })
        .collect();

    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored.truncate(options.limit());
    debug!(terms = terms.len(), matched = scored.len(), "Scored entities");
    scored
}
