//! Entity store fallback ordering and the mockall completion seam

use clinigraph_kb::adapters::{JsonDocumentSource, SplitListsSource};
use clinigraph_kb::test_utils::{diabetes_snapshot, hypertension_snapshot, FailingGraphSource};
use clinigraph_kb::{Category, EntityStore, MemoryGraphSource, TraceContext};
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;

use super::test_utils::{hypertension_document, write_json};

#[tokio::test]
async fn test_failing_live_source_falls_through_to_document() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "graph.json", &hypertension_document());
    let store = EntityStore::default()
        .with_source(Arc::new(FailingGraphSource::new("neo4j")))
        .with_source(Arc::new(JsonDocumentSource::new(dir.path().join("graph.json"))))
        .with_source(Arc::new(MemoryGraphSource::new("memory", diabetes_snapshot())));

    let snapshot = store.load(&TraceContext::new_root()).await;
    assert_eq!(snapshot.entities.len(), 3);
    assert_eq!(snapshot.edges.len(), 2);
}

#[tokio::test]
async fn test_empty_document_falls_through_to_lists() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "graph.json", &json!({"Nodes": [], "Links": []}));
    write_json(dir.path(), "labs.json", &json!([{"title": "HbA1c"}, "not a node", {"title": "LDL", "tags": ""}]));
    let store = EntityStore::new(vec![
        Arc::new(JsonDocumentSource::new(dir.path().join("graph.json"))),
        Arc::new(SplitListsSource::new(dir.path())),
    ]);

    let snapshot = store.load(&TraceContext::new_root()).await;
    let titles: Vec<&str> = snapshot.entities.iter().map(|e| e.title.as_str()).collect();
    assert_eq!(titles, vec!["HbA1c", "LDL"]);
    assert!(snapshot.edges.is_empty());
    assert!(snapshot.entities.iter().all(|e| e.category == Category::TestResult));
}

#[tokio::test]
async fn test_malformed_document_is_skipped() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("graph.json"), "{not json").unwrap();
    let store = EntityStore::default()
        .with_source(Arc::new(JsonDocumentSource::new(dir.path().join("graph.json"))))
        .with_source(Arc::new(MemoryGraphSource::new("memory", hypertension_snapshot())));

    let snapshot = store.load(&TraceContext::new_root()).await;
    assert_eq!(snapshot.entities[0].title, "Hypertension");
}

#[cfg(feature = "mocks")]
mod mocked_gateway {
    use super::*;
    use clinigraph_kb::test_utils::{mock_gateway_replying, mock_gateway_unconfigured};
    use clinigraph_kb::traits::MockCompletionGateway;
    use clinigraph_kb::config::RetrievalSettings;
    use clinigraph_kb::{Completion, CoreError, GraphRagService, RetrievalRequest};

    fn store() -> EntityStore {
        EntityStore::default().with_source(Arc::new(MemoryGraphSource::new("memory", hypertension_snapshot())))
    }

    #[tokio::test]
    async fn test_answer_with_mock_gateway() {
        let service = GraphRagService::new(
            store(),
            Arc::new(mock_gateway_replying("Lisinopril.", "mock-model")),
            RetrievalSettings::default(),
        );
        let response = service
            .answer(RetrievalRequest::new("hypertension"), &TraceContext::new_root())
            .await
            .unwrap();
        assert_eq!(response.model, "mock-model");
        assert_eq!(response.answer, "Lisinopril.");
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_fails_generate() {
        let service = GraphRagService::new(
            store(),
            Arc::new(mock_gateway_unconfigured()),
            RetrievalSettings::default(),
        );
        let err = service
            .generate("hello", &TraceContext::new_root())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Completion(_)));
    }

    #[tokio::test]
    async fn test_answer_prompt_carries_context() {
        let mut mock = MockCompletionGateway::new();
        mock.expect_complete()
            .withf(|prompt, options, _| {
                prompt.contains("[Diagnosis] Hypertension")
                    && options.system_prompt.as_deref() == Some("You are a clinical assistant.")
            })
            .times(1)
            .returning(|_, _, _| {
                Ok(Completion {
                    content: "ok".to_string(),
                    model: "m".to_string(),
                })
            });

        let service = GraphRagService::new(store(), Arc::new(mock), RetrievalSettings::default());
        service
            .answer(RetrievalRequest::new("hypertension"), &TraceContext::new_root())
            .await
            .unwrap();
    }
}
