use crate::data::{errors::CoreError, trace_context::TraceContext, GraphDocument};
use crate::services::graph_view::GraphView;
use crate::services::messages::{
    ExtractionRequest, KbRequest, KbResponse, KbResultSender, RetrievalRequest, RetrievalResponse,
};
use crate::traits::Completion;
use tokio::sync::{mpsc, oneshot};

/// Client interface for the channel-mode GraphRagService.
#[derive(Clone)]
pub struct KbClient {
    request_tx: mpsc::Sender<(KbRequest, KbResultSender)>,
    trace_ctx: Option<TraceContext>,
}

impl KbClient {
    /// Creates a new KbClient with the provided channel sender.
    pub fn new(request_tx: mpsc::Sender<(KbRequest, KbResultSender)>) -> Self {
        KbClient {
            request_tx,
            trace_ctx: None,
        }
    }

    /// Copy of this client whose requests all run under `trace_ctx`.
    /// Without one, every request starts a fresh root context.
    pub fn with_trace_context(&self, trace_ctx: TraceContext) -> Self {
        KbClient {
            request_tx: self.request_tx.clone(),
            trace_ctx: Some(trace_ctx),
        }
    }

    fn trace(&self) -> TraceContext {
        self.trace_ctx.clone().unwrap_or_else(TraceContext::new_root)
    }

    /// Sends a request and awaits the response.
    pub async fn send(&self, request: KbRequest) -> Result<KbResponse, CoreError> {
        let (response_tx, response_rx) = oneshot::channel();

        self.request_tx
            .send((request, KbResultSender { sender: response_tx }))
            .await
            .map_err(|_| CoreError::Internal("Request channel closed".to_string()))?;

        let response = response_rx
            .await
            .map_err(|_| CoreError::Internal("Response channel closed by service".to_string()))?;

        match response {
            KbResponse::Error(err) => Err(err),
            other => Ok(other),
        }
    }

    pub async fn answer(&self, request: RetrievalRequest) -> Result<RetrievalResponse, CoreError> {
        let trace_ctx = self.trace();
        match self.send(KbRequest::Answer { trace_ctx, request }).await? {
            KbResponse::Answer(response) => Ok(response),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn build_graph(&self, request: ExtractionRequest) -> Result<GraphDocument, CoreError> {
        let trace_ctx = self.trace();
        match self.send(KbRequest::BuildGraph { trace_ctx, request }).await? {
            KbResponse::Graph(document) => Ok(document),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn graph_view(&self) -> Result<GraphView, CoreError> {
        let trace_ctx = self.trace();
        match self.send(KbRequest::GraphView { trace_ctx }).await? {
            KbResponse::View(view) => Ok(view),
            other => Err(unexpected(&other)),
        }
    }

    pub async fn generate(&self, prompt: impl Into<String>) -> Result<Completion, CoreError> {
        let trace_ctx = self.trace();
        let prompt = prompt.into();
        match self.send(KbRequest::Generate { trace_ctx, prompt }).await? {
            KbResponse::Generated(completion) => Ok(completion),
            other => Err(unexpected(&other)),
        }
    }
}

fn unexpected(response: &KbResponse) -> CoreError {
    CoreError::Internal(format!("Unexpected response kind: {:?}", std::mem::discriminant(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CompletionError;

    #[tokio::test]
    async fn test_client_request_channel_closed() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let client = KbClient::new(tx);

        match client.generate("hello").await {
            Err(CoreError::Internal(msg)) => assert!(msg.contains("Request channel closed")),
            other => panic!("Expected InternalError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_response_channel_closed() {
        let (tx, mut rx) = mpsc::channel(1);
        let client = KbClient::new(tx);

        tokio::spawn(async move {
            // Drop the sender without responding
            let _ = rx.recv().await;
        });

        match client.graph_view().await {
            Err(CoreError::Internal(msg)) => assert!(msg.contains("Response channel closed")),
            other => panic!("Expected InternalError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_surfaces_service_errors() {
        let (tx, mut rx) = mpsc::channel(1);
        let client = KbClient::new(tx);

        tokio::spawn(async move {
            if let Some((request, sender)) = rx.recv().await {
                assert!(matches!(request, KbRequest::Generate { .. }));
                let _ = sender
                    .sender
                    .send(KbResponse::Error(CompletionError::EmptyResponse.into()));
            }
        });

        let result = client.generate("hello").await;
        assert!(matches!(result, Err(CoreError::Completion(CompletionError::EmptyResponse))));
    }

    #[tokio::test]
    async fn test_client_forwards_its_trace_context() {
        let (tx, mut rx) = mpsc::channel(1);
        let client = KbClient::new(tx).with_trace_context(TraceContext::from_request_id(Some("req-7")));

        tokio::spawn(async move {
            if let Some((request, sender)) = rx.recv().await {
                let trace_id = match request {
                    KbRequest::GraphView { trace_ctx } => trace_ctx.trace_id,
                    other => panic!("Unexpected request {:?}", other),
                };
                let _ = sender.sender.send(KbResponse::Error(CoreError::Internal(trace_id)));
            }
        });

        match client.graph_view().await {
            Err(CoreError::Internal(trace_id)) => assert_eq!(trace_id, "req-7"),
            other => panic!("Expected echoed trace id, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_client_rejects_mismatched_response() {
        let (tx, mut rx) = mpsc::channel(1);
        let client = KbClient::new(tx);

        tokio::spawn(async move {
            if let Some((_, sender)) = rx.recv().await {
                let _ = sender.sender.send(KbResponse::Graph(GraphDocument::default()));
            }
        });

        assert!(matches!(client.graph_view().await, Err(CoreError::Internal(_))));
    }
}
