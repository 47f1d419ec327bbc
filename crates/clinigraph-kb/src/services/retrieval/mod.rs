//! Graph retrieval: scoring, neighbor expansion and context rendering

pub mod expander;
pub mod formatter;
pub mod scorer;

pub use expander::{expand_neighbors, FALLBACK_NEIGHBOR_CAP};
pub use formatter::{format_bounded_context, format_context, truncate_with_ellipsis, BODY_LIMIT};
pub use scorer::{normalize_text, score_entities, ScoreOptions, FALLBACK_TOP_K};
