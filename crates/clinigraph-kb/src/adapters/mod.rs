//! Adapters for external services: graph documents, Neo4j and HTTP completion

pub mod json_document;
#[cfg(feature = "neo4rs")]
pub mod neo4j_source;
#[cfg(feature = "reqwest")]
pub mod http_completion;

// Re-export adapters for easier import
pub use json_document::{
    load_document, read_graph_document, read_node_list, write_graph_document, JsonDocumentSource,
    SplitListsSource,
};
#[cfg(feature = "neo4rs")]
pub use neo4j_source::{Neo4jConfig, Neo4jGraphSource};
#[cfg(feature = "reqwest")]
pub use http_completion::HttpCompletionGateway;
