use async_trait::async_trait;

use crate::data::{GraphSnapshot, StoreError, TraceContext};
use crate::traits::GraphSource;

/// In-memory graph source holding a fixed snapshot.
#[derive(Debug, Clone)]
pub struct MemoryGraphSource {
    name: String,
    snapshot: GraphSnapshot,
}

impl MemoryGraphSource {
    pub fn new(name: impl Into<String>, snapshot: GraphSnapshot) -> Self {
        Self {
            name: name.into(),
            snapshot,
        }
    }
}

#[async_trait]
impl GraphSource for MemoryGraphSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, _trace_ctx: &TraceContext) -> Result<Option<GraphSnapshot>, StoreError> {
        Ok(Some(self.snapshot.clone()))
    }
}
