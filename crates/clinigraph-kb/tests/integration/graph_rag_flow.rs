//! Question answering over graph documents, directly and through the channel client

use super::test_utils::{document_backed_service, hypertension_document, write_json};
use clinigraph_kb::test_utils::FakeCompletionGateway;
use clinigraph_kb::{
    Category, CompletionError, CoreError, KbClient, RetrievalRequest, TraceContext,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tempfile::tempdir;
use tokio::sync::mpsc;

#[test_log::test(tokio::test)]
async fn test_answer_grounded_in_graph_document() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "graph.json", &hypertension_document());
    let gateway = Arc::new(FakeCompletionGateway::replying("Lisinopril is first-line.").with_model("gpt-oss-120b"));
    let service = document_backed_service(dir.path(), gateway.clone());

    let response = service
        .answer(RetrievalRequest::new("treatment for hypertension"), &TraceContext::new_root())
        .await
        .unwrap();

    assert_eq!(response.answer, "Lisinopril is first-line.");
    assert_eq!(response.model, "gpt-oss-120b");
    assert_eq!(response.top_nodes.len(), 1);
    assert_eq!(response.top_nodes[0].entity.title, "Hypertension");
    assert_eq!(response.top_nodes[0].entity.category, Category::Diagnosis);
    assert_eq!(response.neighbors.len(), 1);
    assert_eq!(response.neighbors[0].target_title, "Lisinopril");
    assert_eq!(response.neighbors[0].confidence, Some(0.9));
    assert_eq!(
        response.context,
        "Relevant Nodes:\n1. [Diagnosis] Hypertension\nHigh BP\n\nNeighbor Relationships:\n\
         - [Diagnosis] Hypertension --ASSOCIATED_WITH--> [Medication] Lisinopril :: first-line treatment"
    );

    let prompt = gateway.last_prompt().unwrap();
    assert!(prompt.contains("Question:\ntreatment for hypertension"));
    assert!(prompt.contains(&response.context));
}

#[tokio::test]
async fn test_split_lists_used_when_document_missing() {
    let dir = tempdir().unwrap();
    write_json(
        dir.path(),
        "medications.json",
        &json!([{"title": "Metformin", "body": "Biguanide for diabetes"}]),
    );
    write_json(
        dir.path(),
        "diagnoses.json",
        &json!([{"title": "Type 2 Diabetes", "body": "Insulin resistance"}]),
    );
    let gateway = Arc::new(FakeCompletionGateway::replying("Metformin."));
    let service = document_backed_service(dir.path(), gateway);

    let response = service
        .answer(RetrievalRequest::new("diabetes medication"), &TraceContext::new_root())
        .await
        .unwrap();

    let titles: Vec<&str> = response.top_nodes.iter().map(|s| s.entity.title.as_str()).collect();
    assert_eq!(titles, vec!["Type 2 Diabetes", "Metformin"]);
    assert_eq!(response.top_nodes[1].entity.category, Category::Medication);
    assert!(response.neighbors.is_empty());
    assert!(!response.context.contains("Neighbor Relationships"));
}

#[tokio::test]
async fn test_no_sources_still_answers_with_empty_context() {
    let dir = tempdir().unwrap();
    let gateway = Arc::new(FakeCompletionGateway::replying("I don't know."));
    let service = document_backed_service(dir.path(), gateway.clone());

    let response = service
        .answer(RetrievalRequest::new("anything at all"), &TraceContext::new_root())
        .await
        .unwrap();

    assert!(response.top_nodes.is_empty());
    assert_eq!(response.context, "Relevant Nodes:");
    assert_eq!(gateway.calls().len(), 1);
}

#[tokio::test]
async fn test_include_types_from_request_body() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "graph.json", &hypertension_document());
    let service = document_backed_service(dir.path(), Arc::new(FakeCompletionGateway::replying("ok")));

    let request = RetrievalRequest::from_value(&json!({
        "query": "hypertension lisinopril potassium",
        "top_k": "5",
        "include_types": ["medication"]
    }))
    .unwrap();
    let response = service.answer(request, &TraceContext::new_root()).await.unwrap();

    assert_eq!(response.top_nodes.len(), 1);
    assert_eq!(response.top_nodes[0].entity.title, "Lisinopril");
    // Both edges touch Lisinopril
    assert_eq!(response.neighbors.len(), 2);
}

#[tokio::test]
async fn test_completion_failure_surfaces_as_error() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "graph.json", &hypertension_document());
    let gateway = Arc::new(FakeCompletionGateway::new());
    gateway.push_error(CompletionError::MissingCredentials);
    let service = document_backed_service(dir.path(), gateway);

    let err = service
        .answer(RetrievalRequest::new("hypertension"), &TraceContext::new_root())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Completion(CompletionError::MissingCredentials)));
    assert_eq!(err.status_class(), 500);
}

#[test_log::test(tokio::test)]
async fn test_channel_client_round_trip() {
    let dir = tempdir().unwrap();
    write_json(dir.path(), "graph.json", &hypertension_document());
    let gateway = Arc::new(FakeCompletionGateway::replying("Use lisinopril."));
    let service = Arc::new(document_backed_service(dir.path(), gateway));

    let (tx, rx) = mpsc::channel(8);
    let handle = tokio::spawn(service.run(rx));
    let client = KbClient::new(tx);

    let response = client
        .answer(RetrievalRequest::new("hypertension").with_limits(1, 1))
        .await
        .unwrap();
    assert_eq!(response.answer, "Use lisinopril.");
    assert_eq!(response.top_nodes.len(), 1);

    let err = client.answer(RetrievalRequest::new("   ")).await.unwrap_err();
    assert_eq!(err.status_class(), 400);

    let generated = client.generate("Say hi").await.unwrap();
    assert_eq!(generated.content, "Use lisinopril.");

    let view = client.graph_view().await.unwrap();
    assert_eq!(view.nodes.len(), 3);
    assert_eq!(view.edges.len(), 2);

    drop(client);
    handle.await.unwrap().unwrap();
}
