//! Core data structures for the clinical knowledge graph

pub mod entities;
pub mod document;
pub mod trace_context;
pub mod errors;

// Re-export all common types
pub use entities::{clamp_confidence, Category, Edge, Entity, GraphSnapshot, NeighborRow, ScoredEntity};
pub use document::{GraphDocument, LinkRecord, NodeRecord};
pub use trace_context::TraceContext;
pub use errors::{CompletionError, CoreError, StoreError};
