use clinigraph_kb::config::{DocumentSettings, RetrievalSettings};
use clinigraph_kb::{CompletionGateway, EntityStore, GraphRagService};
use clinigraph_kb::adapters::{JsonDocumentSource, SplitListsSource};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// Writes `value` as JSON to `dir/name`.
pub fn write_json(dir: &Path, name: &str, value: &Value) {
    std::fs::write(dir.join(name), serde_json::to_string_pretty(value).unwrap()).unwrap();
}

/// The persisted hypertension graph.
pub fn hypertension_document() -> Value {
    json!({
        "Nodes": [
            {"title": "Hypertension", "body": "High BP", "tags": "diagnosis"},
            {"title": "Lisinopril", "body": "ACE inhibitor", "tags": "medication"},
            {"title": "Serum Potassium", "body": "Electrolyte panel", "tags": "lab"}
        ],
        "Links": [
            {"source": "Hypertension", "source_type": "diagnosis",
             "target": "Lisinopril", "target_type": "medication",
             "description": "first-line treatment", "value": 0.9},
            {"source": "Lisinopril", "source_type": "medication",
             "target": "Serum Potassium", "target_type": "lab",
             "description": "monitor for hyperkalemia", "value": 0.7}
        ]
    })
}

/// Document settings rooted in `dir`.
pub fn documents_in(dir: &Path) -> DocumentSettings {
    DocumentSettings {
        graph_path: dir.join("graph.json"),
        lists_dir: dir.to_path_buf(),
    }
}

/// Service reading its graph from the document files under `dir`.
pub fn document_backed_service(dir: &Path, gateway: Arc<dyn CompletionGateway>) -> GraphRagService {
    let documents = documents_in(dir);
    let store = EntityStore::default()
        .with_source(Arc::new(JsonDocumentSource::new(documents.graph_path.clone())))
        .with_source(Arc::new(SplitListsSource::new(documents.lists_dir.clone())));
    GraphRagService::new(store, gateway, RetrievalSettings::default()).with_documents(documents)
}
