//! KB API Server
//!
//! Exposes graph question answering, relationship extraction, the graph view
//! and a plain completion passthrough over HTTP.

use anyhow::Context;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use clinigraph_kb::{
    adapters::HttpCompletionGateway,
    init_tracing,
    services::{ExtractionRequest, GraphRagService, KbClient, RetrievalRequest},
    storage::EntityStore,
    traits::CompletionGateway,
    data::trace_context::REQUEST_ID_HEADER,
    CoreError, KbConfig, TraceContext,
};

// Shared application state
#[derive(Clone)]
struct AppState {
    client: KbClient,
}

/// Error body `{ "error": message }` with the error's status class.
struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(error: CoreError) -> Self {
        ApiError(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_class()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

// Main entry point
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = KbConfig::load();
    init_tracing();

    let store = EntityStore::from_config(&config);
    info!(sources = ?store.source_names(), "Graph sources configured");
    if config.completion.api_key.is_none() {
        info!("No completion API key configured; completion requests will fail");
    }
    let gateway: Arc<dyn CompletionGateway> = Arc::new(
        HttpCompletionGateway::new(config.completion.clone()).context("Failed to build completion client")?,
    );
    let service = Arc::new(GraphRagService::from_config(store, gateway, &config));

    let (request_tx, request_rx) = mpsc::channel(100);
    tokio::spawn(async move {
        if let Err(e) = service.run(request_rx).await {
            error!("GraphRagService error: {}", e);
        }
    });

    let app = router(AppState {
        client: KbClient::new(request_tx),
    });

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, config.port))?;
    info!("Starting server on {}", addr);
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinical Knowledge Graph API Server" }))
        .route("/health", get(health_check))
        .route("/api/graph-rag", post(graph_rag))
        .route("/api/graph/build", post(build_graph))
        .route("/api/graph", get(graph_view))
        .route("/api/generate", post(generate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Client for one HTTP request, traced under the caller's request id when given.
fn request_client(state: &AppState, headers: &HeaderMap) -> KbClient {
    let request_id = headers.get(REQUEST_ID_HEADER).and_then(|v| v.to_str().ok());
    state
        .client
        .with_trace_context(TraceContext::from_request_id(request_id))
}

// Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn graph_rag(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request = RetrievalRequest::from_value(&body)?;
    let response = request_client(&state, &headers).answer(request).await?;
    Ok(Json(serde_json::to_value(response).map_err(CoreError::from)?))
}

async fn build_graph(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let request = ExtractionRequest::from_value(&body)?;
    let document = request_client(&state, &headers).build_graph(request).await?;
    Ok(Json(serde_json::to_value(document).map_err(CoreError::from)?))
}

async fn graph_view(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match request_client(&state, &headers).graph_view().await {
        Ok(view) => Json(view).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "nodes": [], "edges": [], "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let prompt = body
        .get("prompt")
        .and_then(Value::as_str)
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| CoreError::validation("Missing 'prompt' in JSON body."))?;
    let completion = request_client(&state, &headers).generate(prompt).await?;
    Ok(Json(json!({ "content": completion.content, "model": completion.model })))
}
