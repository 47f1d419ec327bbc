//! Relationship extraction, persistence and the graph view built from it

use super::test_utils::{document_backed_service, documents_in};
use clinigraph_kb::adapters::read_graph_document;
use clinigraph_kb::config::LinkSettings;
use clinigraph_kb::services::graph_view::{slugify, ViewNodeType};
use clinigraph_kb::test_utils::FakeCompletionGateway;
use clinigraph_kb::{
    clamp_confidence, CompletionError, ExtractionRequest, NodeRecord, RelationshipExtractor,
    TraceContext,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

fn request() -> ExtractionRequest {
    ExtractionRequest::from_value(&json!({
        "diag": [{"title": "Type 2 Diabetes", "body": "A1c above goal", "tags": "diagnosis"}],
        "labTests": [{"label": "HbA1c", "description": "8.1%", "type": "lab"}],
        "meds": [{"title": "Metformin", "type": "drug"}],
        "save_graph": true
    }))
    .unwrap()
}

const LINKER_REPLY: &str = r#"Here are the links:
```json
{"Links": [
  {"source": "Type 2 Diabetes", "target": "HbA1c", "description": "monitored by", "value": 1.4},
  {"source": "HbA1c", "target": "Metformin", "description": "guides dosing", "value": "0.6"},
  {"source": "Metformin", "description": "dangling"}
]}
```"#;

#[test_log::test(tokio::test)]
async fn test_build_graph_saves_and_projects() {
    let dir = tempdir().unwrap();
    let gateway = Arc::new(FakeCompletionGateway::replying(LINKER_REPLY));
    let service = document_backed_service(dir.path(), gateway.clone())
        .with_link_settings(LinkSettings::default());

    let document = service
        .build_graph(request(), &TraceContext::new_root())
        .await
        .unwrap();

    let titles: Vec<&str> = document.nodes.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["Type 2 Diabetes", "HbA1c", "Metformin"]);
    assert_eq!(document.links.len(), 2);
    assert_eq!(document.links[0].source_type, "diagnosis");
    assert_eq!(document.links[0].target_type, "lab");
    assert_eq!(document.links[0].value, Some(1.0));
    assert_eq!(document.links[1].target_type, "medication");
    assert_eq!(document.links[1].value, Some(0.6));

    let call = &gateway.calls()[0];
    assert_eq!(call.options.max_tokens, Some(16384));
    assert!(call.prompt.contains("Type 2 Diabetes"));
    assert!(call.prompt.contains("HbA1c"));

    let saved = read_graph_document(&documents_in(dir.path()).graph_path).await.unwrap();
    assert_eq!(saved, document);

    let view = service.graph_view(&TraceContext::new_root()).await;
    let ids: Vec<&str> = view.nodes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["diagnosis:type-2-diabetes", "testresult:hba1c", "medication:metformin"]);
    assert_eq!(view.nodes[1].node_type, ViewNodeType::TestResult);
    assert_eq!(view.edges[0].edge_type, "has_lab");
    assert_eq!(view.edges[1].edge_type, "prescribed");
    assert_eq!(view.edges[1].confidence, 0.6);
}

#[tokio::test]
async fn test_non_json_reply_yields_nodes_without_links() {
    let gateway = Arc::new(FakeCompletionGateway::replying("I could not find any relationships."));
    let extractor = RelationshipExtractor::new(gateway, LinkSettings::default());

    let document = extractor
        .build_graph(&request(), &TraceContext::new_root())
        .await
        .unwrap();
    assert_eq!(document.nodes.len(), 3);
    assert!(document.links.is_empty());
}

#[tokio::test]
async fn test_completion_error_yields_no_links() {
    let gateway = Arc::new(FakeCompletionGateway::new());
    gateway.push_error(CompletionError::exhausted(Some(500), None, "down"));
    let extractor = RelationshipExtractor::new(gateway, LinkSettings::default());

    let links = extractor
        .extract(&request(), &TraceContext::new_root())
        .await
        .unwrap();
    assert!(links.is_empty());
}

#[tokio::test]
async fn test_unreadable_template_is_an_error() {
    let dir = tempdir().unwrap();
    let settings = LinkSettings {
        prompt_path: Some(dir.path().join("missing.txt")),
        ..LinkSettings::default()
    };
    let extractor = RelationshipExtractor::new(Arc::new(FakeCompletionGateway::replying("{}")), settings);

    let err = extractor
        .extract(&request(), &TraceContext::new_root())
        .await
        .unwrap_err();
    assert_eq!(err.status_class(), 500);
}

#[tokio::test]
async fn test_empty_request_is_rejected() {
    let dir = tempdir().unwrap();
    let service = document_backed_service(dir.path(), Arc::new(FakeCompletionGateway::replying("{}")));

    let err = service
        .build_graph(
            ExtractionRequest::new(vec![], vec![], vec![]),
            &TraceContext::new_root(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_class(), 400);
    assert!(ExtractionRequest::from_value(&json!({"diagnoses": []})).is_err());
}

#[test]
fn test_slug_is_idempotent() {
    for text in ["Type 2 Diabetes", "  HbA1c (glycated) ", "ACE--Inhibitor!!", "already-a-slug"] {
        let once = slugify(text);
        assert_eq!(slugify(&once), once);
        assert!(!once.starts_with('-') && !once.ends_with('-'));
    }
}

#[test]
fn test_confidence_always_within_unit_interval() {
    for raw in [json!(-3), json!(0.25), json!("7"), json!(" 0.5 "), json!(1e300)] {
        let value = clamp_confidence(&raw).unwrap();
        assert!((0.0..=1.0).contains(&value));
    }
    assert_eq!(clamp_confidence(&json!("high")), None);
    assert_eq!(clamp_confidence(&json!(null)), None);
}

#[test]
fn test_node_record_keeps_given_tags() {
    let record = NodeRecord::new("Metformin", "", "drug");
    assert_eq!(ViewNodeType::from_tag(&record.tags), ViewNodeType::Medication);
}
