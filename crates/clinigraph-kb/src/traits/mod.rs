//! Core traits (interfaces) for the clinical knowledge graph

mod graph_source;
mod completion_gateway;

pub use graph_source::GraphSource;
pub use completion_gateway::{Completion, CompletionGateway, CompletionOptions};
#[cfg(any(test, feature = "mocks"))]
pub use completion_gateway::MockCompletionGateway;
