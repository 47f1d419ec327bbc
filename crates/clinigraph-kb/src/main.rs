use std::sync::Arc;
use tokio::sync::mpsc;

use clinigraph_kb::{
    init_tracing,
    services::{messages::{KbRequest, KbResultSender}, GraphRagService, KbClient, RetrievalRequest},
    storage::{EntityStore, MemoryGraphSource},
    test_utils::{hypertension_snapshot, FakeCompletionGateway},
    config::RetrievalSettings,
    traits::CompletionGateway,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    // Channel for service communication
    let (request_tx, request_rx) = mpsc::channel::<(KbRequest, KbResultSender)>(100);

    // In-memory graph and a canned completion service
    let store = EntityStore::default()
        .with_source(Arc::new(MemoryGraphSource::new("demo", hypertension_snapshot())));
    let gateway: Arc<dyn CompletionGateway> = Arc::new(FakeCompletionGateway::replying(
        "Hypertension is commonly treated with Lisinopril.",
    ));
    let service = Arc::new(GraphRagService::new(store, gateway, RetrievalSettings::default()));

    let service_handle = tokio::spawn(async move {
        if let Err(e) = service.run(request_rx).await {
            tracing::error!("GraphRag service error: {:?}", e);
        }
    });

    tracing::info!("Clinical KB services started with demo implementations");

    let client = KbClient::new(request_tx);
    match client.answer(RetrievalRequest::new("How is hypertension treated?")).await {
        Ok(response) => {
            tracing::info!(model = %response.model, "Answer: {}", response.answer);
            println!("{}", response.context);
        }
        Err(e) => tracing::error!("Demo question failed: {:?}", e),
    }

    match client.graph_view().await {
        Ok(view) => tracing::info!(nodes = view.nodes.len(), edges = view.edges.len(), "Graph view loaded"),
        Err(e) => tracing::error!("Graph view failed: {:?}", e),
    }

    // Closing the channel stops the service loop
    drop(client);
    let _ = service_handle.await;

    Ok(())
}
