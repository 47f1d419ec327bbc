//! Core services for the clinical knowledge graph

pub mod client;
pub mod extraction;
pub mod graph_view;
pub mod messages;
pub mod rag;
pub mod retrieval;

// Re-exports
pub use client::KbClient;
pub use extraction::RelationshipExtractor;
pub use graph_view::{GraphView, ViewEdge, ViewNode, ViewNodeType};
pub use messages::{
    ExtractionRequest, KbRequest, KbResponse, KbResultSender, RetrievalRequest, RetrievalResponse,
};
pub use rag::GraphRagService;
