//! GraphSource trait definition for loading entities and edges

use async_trait::async_trait;

use crate::data::{errors::StoreError, GraphSnapshot, TraceContext};

/// A backing source of graph data (live graph database or serialized document).
///
/// Contract: returns `Ok(None)` when the source has nothing to offer (file
/// absent, credentials missing) and `Err` when it failed trying. Both mean
/// "move on to the next source" to the `EntityStore`.
#[async_trait]
pub trait GraphSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Loads a full snapshot of entities and edges.
    async fn load(&self, trace_ctx: &TraceContext) -> Result<Option<GraphSnapshot>, StoreError>;
}
