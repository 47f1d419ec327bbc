use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use crate::{
    adapters::json_document::{load_document, write_graph_document},
    config::{DocumentSettings, KbConfig, LinkSettings, RetrievalSettings},
    data::{CoreError, GraphDocument, TraceContext},
    services::{
        extraction::RelationshipExtractor,
        graph_view::GraphView,
        messages::{
            ExtractionRequest, KbRequest, KbResponse, KbResultSender, RetrievalRequest,
            RetrievalResponse,
        },
        retrieval::{expand_neighbors, format_bounded_context, format_context, score_entities, ScoreOptions},
    },
    storage::EntityStore,
    traits::{Completion, CompletionGateway, CompletionOptions},
};

/// Instruction placed ahead of the question and its graph context.
pub const ANSWER_INSTRUCTION: &str = "You are a clinical assistant. Use the provided graph context \
consisting of relevant nodes and their relationships to answer the question accurately. \
Cite node titles when applicable.";

/// Prompt for answering `question` from `context`.
pub fn build_answer_prompt(question: &str, context: &str) -> String {
    format!(
        "{}\n\nQuestion:\n{}\n\nGraph Context:\n{}\n\nAnswer concisely.",
        ANSWER_INSTRUCTION, question, context
    )
}

/// Graph-grounded question answering, relationship extraction and the graph view.
pub struct GraphRagService {
    store: EntityStore,
    gateway: Arc<dyn CompletionGateway>,
    extractor: RelationshipExtractor,
    settings: RetrievalSettings,
    documents: DocumentSettings,
    answer_options: CompletionOptions,
    generate_options: CompletionOptions,
}

impl GraphRagService {
    pub fn new(store: EntityStore, gateway: Arc<dyn CompletionGateway>, settings: RetrievalSettings) -> Self {
        let extractor = RelationshipExtractor::new(Arc::clone(&gateway), LinkSettings::default());
        Self {
            store,
            gateway,
            extractor,
            settings,
            documents: DocumentSettings::default(),
            answer_options: CompletionOptions {
                system_prompt: Some("You are a clinical assistant.".to_string()),
                ..CompletionOptions::default()
            },
            generate_options: CompletionOptions::default(),
        }
    }

    /// Wires the service from loaded configuration.
    pub fn from_config(store: EntityStore, gateway: Arc<dyn CompletionGateway>, config: &KbConfig) -> Self {
        Self::new(store, gateway, config.retrieval.clone())
            .with_link_settings(config.link.clone())
            .with_documents(config.documents.clone())
            .with_answer_options(config.completion.answer_options())
    }

    pub fn with_link_settings(mut self, settings: LinkSettings) -> Self {
        self.extractor = RelationshipExtractor::new(Arc::clone(&self.gateway), settings);
        self
    }

    pub fn with_documents(mut self, documents: DocumentSettings) -> Self {
        self.documents = documents;
        self
    }

    pub fn with_answer_options(mut self, options: CompletionOptions) -> Self {
        self.answer_options = options;
        self
    }

    pub fn documents(&self) -> &DocumentSettings {
        &self.documents
    }

    /// Answers a question from the graph context around its best-matching entities.
    #[instrument(skip(self, request, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    pub async fn answer(
        &self,
        request: RetrievalRequest,
        trace_ctx: &TraceContext,
    ) -> Result<RetrievalResponse, CoreError> {
        let question = request.question.trim().to_string();
        if question.is_empty() {
            return Err(CoreError::validation("Missing 'question' in request body."));
        }
        let top_k = request.top_k.unwrap_or(self.settings.default_top_k);
        let neighbor_k = request.neighbor_k.unwrap_or(self.settings.default_neighbor_k);

        let snapshot = self.store.load(&trace_ctx.new_child()).await;
        let top_nodes = score_entities(
            &snapshot.entities,
            &question,
            &ScoreOptions {
                top_k,
                include_categories: request.include_types,
            },
        );
        let titles: Vec<String> = top_nodes.iter().map(|s| s.entity.title.clone()).collect();
        let neighbors = expand_neighbors(&snapshot, &titles, neighbor_k);
        let context = match self.settings.context_max_chars {
            Some(max_chars) => format_bounded_context(&top_nodes, &neighbors, max_chars),
            None => format_context(&top_nodes, &neighbors),
        };
        debug!(
            top_nodes = top_nodes.len(),
            neighbors = neighbors.len(),
            context_len = context.len(),
            "Assembled graph context"
        );

        let prompt = build_answer_prompt(&question, &context);
        let completion = self
            .gateway
            .complete(&prompt, &self.answer_options, &trace_ctx.new_child())
            .await?;
        info!(model = %completion.model, "Answered graph question");

        Ok(RetrievalResponse {
            question,
            answer: completion.content,
            model: completion.model,
            context,
            top_nodes,
            neighbors,
        })
    }

    /// Links the request's nodes and optionally persists the document.
    /// A failed write is logged and the document is still returned.
    #[instrument(skip(self, request, trace_ctx), fields(trace_id = %trace_ctx.trace_id, save = request.save))]
    pub async fn build_graph(
        &self,
        request: ExtractionRequest,
        trace_ctx: &TraceContext,
    ) -> Result<GraphDocument, CoreError> {
        let request = request.normalized();
        if request.is_empty() {
            return Err(CoreError::validation(
                "No nodes provided. Include 'diagnoses', 'labs', or 'medications'.",
            ));
        }
        let document = self.extractor.build_graph(&request, trace_ctx).await?;
        if request.save {
            let path = &self.documents.graph_path;
            match write_graph_document(path, &document).await {
                Ok(()) => info!(path = %path.display(), "Saved graph document"),
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to save graph document"),
            }
        }
        Ok(document)
    }

    /// The persisted graph projected for display.
    #[instrument(skip(self, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    pub async fn graph_view(&self, trace_ctx: &TraceContext) -> GraphView {
        let document = load_document(&self.documents.graph_path, &self.documents.lists_dir).await;
        GraphView::project(&document)
    }

    /// Plain completion passthrough.
    #[instrument(skip(self, prompt, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    pub async fn generate(&self, prompt: &str, trace_ctx: &TraceContext) -> Result<Completion, CoreError> {
        if prompt.trim().is_empty() {
            return Err(CoreError::validation("Missing 'prompt' in JSON body."));
        }
        Ok(self
            .gateway
            .complete(prompt, &self.generate_options, &trace_ctx.new_child())
            .await?)
    }

    async fn handle(&self, request: KbRequest) -> KbResponse {
        let result = match request {
            KbRequest::Answer { trace_ctx, request } => {
                info!(trace_id = %trace_ctx.trace_id, "Processing answer request");
                self.answer(request, &trace_ctx).await.map(KbResponse::Answer)
            }
            KbRequest::BuildGraph { trace_ctx, request } => {
                info!(trace_id = %trace_ctx.trace_id, "Processing build graph request");
                self.build_graph(request, &trace_ctx).await.map(KbResponse::Graph)
            }
            KbRequest::GraphView { trace_ctx } => {
                info!(trace_id = %trace_ctx.trace_id, "Processing graph view request");
                Ok(KbResponse::View(self.graph_view(&trace_ctx).await))
            }
            KbRequest::Generate { trace_ctx, prompt } => {
                info!(trace_id = %trace_ctx.trace_id, "Processing generate request");
                self.generate(&prompt, &trace_ctx).await.map(KbResponse::Generated)
            }
        };
        result.unwrap_or_else(KbResponse::Error)
    }

    /// Serves requests from the channel until every sender is dropped.
    /// Each request is processed in its own task.
    pub async fn run(
        self: Arc<Self>,
        mut request_rx: mpsc::Receiver<(KbRequest, KbResultSender)>,
    ) -> Result<(), CoreError> {
        info!("GraphRagService started");
        while let Some((request, sender)) = request_rx.recv().await {
            let service = Arc::clone(&self);
            tokio::spawn(async move {
                let response = service.handle(request).await;
                // It's OK if the client dropped the request
                let _ = sender.sender.send(response);
            });
        }
        info!("GraphRagService channel closed, shutting down");
        Ok(())
    }
}
