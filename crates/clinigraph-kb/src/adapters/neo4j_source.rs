use async_trait::async_trait;
use neo4rs::{ConfigBuilder, Graph, Query, Row};
use serde_json::{Map, Value};
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::Neo4jCredentials,
    data::{Category, Edge, Entity, GraphSnapshot, LinkRecord, StoreError, TraceContext},
    traits::GraphSource,
};

// Debug logging for Neo4j calls tagged with the trace id
macro_rules! trace_neo4j {
    ($trace_ctx:expr, $op:expr, $($arg:tt)*) => {
        let trace_id = $trace_ctx.trace_id.to_string();
        debug!("[Neo4j:{}][trace:{}] {}", $op, trace_id, format!($($arg)*));
    };
}

const NODES_QUERY: &str = "MATCH (n) WHERE n.title IS NOT NULL \
     RETURN n.title AS title, coalesce(n.body, n.description, '') AS body, \
     coalesce(n.tags, '') AS tags, labels(n) AS labels";

const EDGES_QUERY: &str = "MATCH (a)-[r]->(b) WHERE a.title IS NOT NULL AND b.title IS NOT NULL \
     RETURN a.title AS source, b.title AS target, labels(a) AS source_labels, \
     labels(b) AS target_labels, properties(r) AS props";

/// Configuration for Neo4j connection
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
    pub database: Option<String>,
    pub pool_size: usize,
    pub connection_timeout: Duration,
    pub query_timeout: Duration,
}

impl Neo4jConfig {
    pub fn from_credentials(creds: &Neo4jCredentials) -> Self {
        Self {
            uri: creds.uri.clone(),
            username: creds.user.clone(),
            password: creds.password.clone(),
            database: creds.database.clone(),
            pool_size: 4,
            connection_timeout: Duration::from_secs(5),
            query_timeout: Duration::from_secs(30),
        }
    }
}

/// Live graph source. Connects on first load and reuses the connection.
pub struct Neo4jGraphSource {
    config: Neo4jConfig,
    graph: Mutex<Option<Arc<Graph>>>,
}

impl Neo4jGraphSource {
    pub fn new(config: Neo4jConfig) -> Self {
        Self {
            config,
            graph: Mutex::new(None),
        }
    }

    /// Returns the configuration used for this source
    pub fn get_config(&self) -> &Neo4jConfig {
        &self.config
    }

    async fn connect(&self) -> Result<Arc<Graph>, StoreError> {
        let mut guard = self.graph.lock().await;
        if let Some(graph) = guard.as_ref() {
            return Ok(Arc::clone(graph));
        }

        let mut builder = ConfigBuilder::default()
            .uri(&self.config.uri)
            .user(&self.config.username)
            .password(&self.config.password)
            .max_connections(self.config.pool_size);
        if let Some(db) = &self.config.database {
            builder = builder.db(db.as_str());
        }
        let neo4j_config = builder
            .build()
            .map_err(|e| StoreError::ConnectionError(format!("Failed to build Neo4j config: {}", e)))?;

        let attempt = async {
            let graph = Graph::connect(neo4j_config).await?;
            // The pool connects lazily; a probe query surfaces bad credentials now
            graph.run(Query::new("RETURN 1".to_string())).await?;
            Ok::<_, neo4rs::Error>(graph)
        };
        let graph = tokio::time::timeout(self.config.connection_timeout, attempt)
            .await
            .map_err(|_| {
                StoreError::ConnectionError(format!(
                    "Timed out connecting to Neo4j at {} after {:?}",
                    self.config.uri, self.config.connection_timeout
                ))
            })?
            .map_err(|e| {
                error!("Failed to connect to Neo4j: {}", e);
                StoreError::ConnectionError(e.to_string())
            })?;

        info!("Connected to Neo4j at {}", self.config.uri);
        let graph = Arc::new(graph);
        *guard = Some(Arc::clone(&graph));
        Ok(graph)
    }

    async fn fetch_rows(&self, graph: &Graph, cypher: &str) -> Result<Vec<Row>, StoreError> {
        let run = async {
            let mut result = graph
                .execute(Query::new(cypher.to_string()))
                .await
                .map_err(|e| StoreError::QueryError(e.to_string()))?;
            let mut rows = Vec::new();
            while let Some(row) = result
                .next()
                .await
                .map_err(|e| StoreError::QueryError(e.to_string()))?
            {
                rows.push(row);
            }
            Ok(rows)
        };
        tokio::time::timeout(self.config.query_timeout, run)
            .await
            .map_err(|_| StoreError::QueryError("Neo4j query timed out".to_string()))?
    }
}

/// The first label naming a known category, else the `tags` property.
fn category_from_labels(labels: &[String], tags: &str) -> Category {
    labels
        .iter()
        .map(|l| Category::from_tag(l))
        .find(|c| *c != Category::Entity)
        .unwrap_or_else(|| Category::from_tag(tags))
}

fn row_to_entity(row: &Row) -> Result<Entity, StoreError> {
    let title = row
        .get::<String>("title")
        .map_err(|e| StoreError::MappingError(format!("node title: {}", e)))?;
    let body = row.get::<String>("body").unwrap_or_default();
    let tags = row.get::<String>("tags").unwrap_or_default();
    let labels = row.get::<Vec<String>>("labels").unwrap_or_default();
    Ok(Entity::new(
        title.trim(),
        body.trim(),
        category_from_labels(&labels, &tags),
    ))
}

fn row_to_edge(row: &Row) -> Result<Edge, StoreError> {
    let source = row
        .get::<String>("source")
        .map_err(|e| StoreError::MappingError(format!("relationship source: {}", e)))?;
    let target = row
        .get::<String>("target")
        .map_err(|e| StoreError::MappingError(format!("relationship target: {}", e)))?;

    let mut props = match row.get::<Value>("props") {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    props.insert("source".to_string(), Value::String(source));
    props.insert("target".to_string(), Value::String(target));

    let mut edge = LinkRecord::from_object(&props).to_edge();
    if edge.source_category.is_none() {
        let labels = row.get::<Vec<String>>("source_labels").unwrap_or_default();
        edge.source_category = Some(category_from_labels(&labels, ""));
    }
    if edge.target_category.is_none() {
        let labels = row.get::<Vec<String>>("target_labels").unwrap_or_default();
        edge.target_category = Some(category_from_labels(&labels, ""));
    }
    Ok(edge)
}

#[async_trait]
impl GraphSource for Neo4jGraphSource {
    fn name(&self) -> &str {
        "neo4j"
    }

    #[instrument(skip(self, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    async fn load(&self, trace_ctx: &TraceContext) -> Result<Option<GraphSnapshot>, StoreError> {
        let graph = self.connect().await?;

        trace_neo4j!(trace_ctx, "load_nodes", "{}", NODES_QUERY);
        let mut entities = Vec::new();
        for row in self.fetch_rows(&graph, NODES_QUERY).await? {
            match row_to_entity(&row) {
                Ok(entity) if !entity.title.is_empty() => entities.push(entity),
                Ok(_) => {}
                Err(e) => warn!("Skipping node row: {}", e),
            }
        }

        trace_neo4j!(trace_ctx, "load_edges", "{}", EDGES_QUERY);
        let mut edges = Vec::new();
        for row in self.fetch_rows(&graph, EDGES_QUERY).await? {
            match row_to_edge(&row) {
                Ok(edge) => edges.push(edge),
                Err(e) => warn!("Skipping relationship row: {}", e),
            }
        }

        debug!(entities = entities.len(), edges = edges.len(), "Loaded graph from Neo4j");
        if entities.is_empty() {
            return Ok(None);
        }
        Ok(Some(GraphSnapshot::new(entities, edges)))
    }
}
