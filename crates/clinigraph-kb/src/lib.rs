//! Clinical knowledge graph: graph-grounded question answering and
//! relationship extraction between diagnoses, labs and medications.

// Core modules
pub mod config;
pub mod data;
pub mod traits;
pub mod storage;
pub mod services;

// Implementation adapters (documents always; Neo4j and HTTP behind features)
pub mod adapters;

// Testing utilities - make this available during testing
pub mod test_utils;

// Re-export key types for convenient usage
pub use config::{KbConfig, Neo4jCredentials};
pub use data::errors::{CompletionError, CoreError, StoreError};
pub use data::trace_context::TraceContext;
pub use data::{
    clamp_confidence, Category, Edge, Entity, GraphDocument, GraphSnapshot, LinkRecord,
    NeighborRow, NodeRecord, ScoredEntity,
};

// Re-export core traits
pub use traits::{Completion, CompletionGateway, CompletionOptions, GraphSource};

// Re-export core services
pub use services::{
    ExtractionRequest, GraphRagService, GraphView, KbClient, KbRequest, KbResponse,
    KbResultSender, RelationshipExtractor, RetrievalRequest, RetrievalResponse,
};
pub use storage::{EntityStore, MemoryGraphSource};

/// Initialize tracing for the KB system.
///
/// Honors `RUST_LOG` (default `clinigraph_kb=info`); `LOG_FORMAT=json`
/// switches to JSON lines.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("clinigraph_kb=info,kb_api_server=info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);
    // A second initialization (tests, embedding) keeps the existing subscriber
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
