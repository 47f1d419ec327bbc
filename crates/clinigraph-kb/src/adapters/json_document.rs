//! Graph sources backed by JSON documents on disk

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

use crate::data::{
    document::node_records, Category, GraphDocument, GraphSnapshot, NodeRecord, StoreError,
    TraceContext,
};
use crate::traits::GraphSource;

/// File names of the split node lists, in merge order.
pub const LIST_FILES: [(&str, Category); 3] = [
    ("diagnoses.json", Category::Diagnosis),
    ("labs.json", Category::TestResult),
    ("medications.json", Category::Medication),
];

async fn read_json(path: &Path) -> Result<Value, StoreError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| StoreError::ReadError {
            path: path.display().to_string(),
            source,
        })?;
    serde_json::from_str(&raw)
        .map_err(|e| StoreError::MappingError(format!("{}: {}", path.display(), e)))
}

/// Reads a combined graph document.
pub async fn read_graph_document(path: &Path) -> Result<GraphDocument, StoreError> {
    GraphDocument::from_value(&read_json(path).await?)
}

/// Reads a node list file. The file must hold a JSON array.
pub async fn read_node_list(path: &Path) -> Result<Vec<NodeRecord>, StoreError> {
    let value = read_json(path).await?;
    if !value.is_array() {
        return Err(StoreError::MappingError(format!(
            "{}: expected a JSON array",
            path.display()
        )));
    }
    Ok(node_records(Some(&value)))
}

/// Writes a graph document as pretty-printed JSON, creating parent directories.
pub async fn write_graph_document(path: &Path, document: &GraphDocument) -> Result<(), StoreError> {
    let io_err = |source| StoreError::ReadError {
        path: path.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let body = serde_json::to_string_pretty(document)
        .map_err(|e| StoreError::MappingError(e.to_string()))?;
    tokio::fs::write(path, body).await.map_err(io_err)
}

/// The combined `graph.json` document.
#[derive(Debug, Clone)]
pub struct JsonDocumentSource {
    path: PathBuf,
}

impl JsonDocumentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl GraphSource for JsonDocumentSource {
    fn name(&self) -> &str {
        "graph-document"
    }

    #[instrument(skip(self, trace_ctx), fields(trace_id = %trace_ctx.trace_id, path = %self.path.display()))]
    async fn load(&self, trace_ctx: &TraceContext) -> Result<Option<GraphSnapshot>, StoreError> {
        let document = read_graph_document(&self.path).await?;
        debug!(nodes = document.nodes.len(), links = document.links.len(), "Read graph document");
        Ok(Some(document.to_snapshot()))
    }
}

/// `diagnoses.json`, `labs.json` and `medications.json` merged into one node
/// list with no edges.
#[derive(Debug, Clone)]
pub struct SplitListsSource {
    dir: PathBuf,
}

impl SplitListsSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Reads each list; an unreadable file contributes nothing.
    pub async fn read_lists(&self) -> Vec<NodeRecord> {
        let paths: Vec<PathBuf> = LIST_FILES.iter().map(|(file, _)| self.dir.join(file)).collect();
        let results = join_all(paths.iter().map(|path| read_node_list(path))).await;

        let mut nodes = Vec::new();
        for ((file, category), result) in LIST_FILES.iter().zip(results) {
            match result {
                Ok(records) => nodes.extend(records.into_iter().map(|mut r| {
                    if r.tags.is_empty() {
                        r.tags = category.as_tag().to_string();
                    }
                    r
                })),
                Err(e) => debug!(file, error = %e, "Skipping node list"),
            }
        }
        nodes
    }
}

#[async_trait]
impl GraphSource for SplitListsSource {
    fn name(&self) -> &str {
        "split-lists"
    }

    #[instrument(skip(self, trace_ctx), fields(trace_id = %trace_ctx.trace_id, dir = %self.dir.display()))]
    async fn load(&self, trace_ctx: &TraceContext) -> Result<Option<GraphSnapshot>, StoreError> {
        let nodes = self.read_lists().await;
        if nodes.is_empty() {
            return Ok(None);
        }
        let document = GraphDocument {
            nodes,
            links: Vec::new(),
        };
        Ok(Some(document.to_snapshot()))
    }
}

/// Reads the persisted graph for the view projection: the combined document
/// when it has content, otherwise the split lists without links.
pub async fn load_document(graph_path: &Path, lists_dir: &Path) -> GraphDocument {
    match read_graph_document(graph_path).await {
        Ok(document) if !document.is_empty() => return document,
        Ok(_) => debug!(path = %graph_path.display(), "Graph document is empty"),
        Err(e) => warn!(path = %graph_path.display(), error = %e, "Graph document unavailable"),
    }
    GraphDocument {
        nodes: SplitListsSource::new(lists_dir).read_lists().await,
        links: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, value: Value) {
        std::fs::write(dir.join(name), serde_json::to_string(&value).unwrap()).unwrap();
    }

    #[tokio::test]
    async fn test_document_source_reads_nodes_and_links() {
        let dir = tempdir().unwrap();
        write(
            dir.path(),
            "graph.json",
            json!({
                "Nodes": [{"title": "Hypertension", "body": "High BP", "tags": "diagnosis"}],
                "Links": [{"source": "Hypertension", "target": "Lisinopril", "value": 0.9}]
            }),
        );

        let source = JsonDocumentSource::new(dir.path().join("graph.json"));
        let snapshot = source.load(&TraceContext::new_root()).await.unwrap().unwrap();
        assert_eq!(snapshot.entities.len(), 1);
        assert_eq!(snapshot.edges[0].confidence, Some(0.9));
    }

    #[tokio::test]
    async fn test_document_source_missing_file_is_error() {
        let dir = tempdir().unwrap();
        let source = JsonDocumentSource::new(dir.path().join("absent.json"));
        let result = source.load(&TraceContext::new_root()).await;
        assert!(matches!(result, Err(StoreError::ReadError { .. })));
    }

    #[tokio::test]
    async fn test_split_lists_merge_in_order_and_skip_bad_files() {
        let dir = tempdir().unwrap();
        write(dir.path(), "diagnoses.json", json!([{"title": "Gout", "tags": "diagnosis"}]));
        std::fs::write(dir.path().join("labs.json"), "{ not json").unwrap();
        write(dir.path(), "medications.json", json!([{"title": "Allopurinol"}]));

        let source = SplitListsSource::new(dir.path());
        let snapshot = source.load(&TraceContext::new_root()).await.unwrap().unwrap();
        let titles: Vec<_> = snapshot.entities.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Gout", "Allopurinol"]);
        assert_eq!(snapshot.entities[1].category, Category::Medication);
        assert!(snapshot.edges.is_empty());
    }

    #[tokio::test]
    async fn test_split_lists_all_missing_is_absent() {
        let dir = tempdir().unwrap();
        let source = SplitListsSource::new(dir.path());
        assert!(source.load(&TraceContext::new_root()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_then_load_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.json");
        let document = GraphDocument {
            nodes: vec![NodeRecord::new("Asthma", "", "diagnosis")],
            links: vec![],
        };
        write_graph_document(&path, &document).await.unwrap();

        let loaded = load_document(&path, dir.path()).await;
        assert_eq!(loaded, document);
    }

    #[tokio::test]
    async fn test_load_document_falls_back_to_lists() {
        let dir = tempdir().unwrap();
        write(dir.path(), "labs.json", json!([{"title": "HbA1c"}]));

        let loaded = load_document(&dir.path().join("graph.json"), dir.path()).await;
        assert_eq!(loaded.nodes, vec![NodeRecord::new("HbA1c", "", "lab")]);
        assert!(loaded.links.is_empty());
    }
}
