//! Entity store adapter: an ordered fallback chain over graph sources

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::adapters::{JsonDocumentSource, SplitListsSource};
use crate::config::KbConfig;
use crate::data::{GraphSnapshot, TraceContext};
use crate::traits::GraphSource;

pub mod memory;

pub use memory::MemoryGraphSource;

/// Loads the canonical entity collection for one request.
///
/// Sources are tried in priority order and the first non-empty snapshot wins.
/// Failures are logged and skipped; when every source comes up empty the
/// result is an empty snapshot, never an error.
#[derive(Clone, Default)]
pub struct EntityStore {
    sources: Vec<Arc<dyn GraphSource>>,
}

impl EntityStore {
    pub fn new(sources: Vec<Arc<dyn GraphSource>>) -> Self {
        Self { sources }
    }

    /// The standard chain: live graph (when credentials are configured),
    /// combined document, then the split node lists.
    pub fn from_config(config: &KbConfig) -> Self {
        let mut sources: Vec<Arc<dyn GraphSource>> = live_source(config).into_iter().collect();
        sources.push(Arc::new(JsonDocumentSource::new(config.documents.graph_path.clone())));
        sources.push(Arc::new(SplitListsSource::new(config.documents.lists_dir.clone())));
        Self::new(sources)
    }

    /// Appends a lower-priority source.
    pub fn with_source(mut self, source: Arc<dyn GraphSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    #[instrument(skip(self, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    pub async fn load(&self, trace_ctx: &TraceContext) -> GraphSnapshot {
        for source in &self.sources {
            let child_ctx = trace_ctx.new_child();
            match source.load(&child_ctx).await {
                Ok(Some(snapshot)) if !snapshot.is_empty() => {
                    info!(
                        source = source.name(),
                        entities = snapshot.entities.len(),
                        edges = snapshot.edges.len(),
                        "Loaded graph snapshot"
                    );
                    return snapshot;
                }
                Ok(_) => debug!(source = source.name(), "Graph source empty, trying next"),
                Err(e) => warn!(source = source.name(), error = %e, "Graph source failed, trying next"),
            }
        }
        warn!("No graph source produced data, continuing with an empty snapshot");
        GraphSnapshot::default()
    }
}

#[cfg(feature = "neo4rs")]
fn live_source(config: &KbConfig) -> Option<Arc<dyn GraphSource>> {
    use crate::adapters::{Neo4jConfig, Neo4jGraphSource};
    let creds = config.neo4j.as_ref()?;
    Some(Arc::new(Neo4jGraphSource::new(Neo4jConfig::from_credentials(creds))))
}

#[cfg(not(feature = "neo4rs"))]
fn live_source(config: &KbConfig) -> Option<Arc<dyn GraphSource>> {
    if config.neo4j.is_some() {
        warn!("Neo4j credentials configured but the neo4rs feature is disabled");
    }
    None
}
