use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::LinkSettings,
    data::{CoreError, GraphDocument, LinkRecord, NodeRecord, StoreError, TraceContext},
    services::extraction::{
        parse::{link_objects, parse_lenient},
        prompt::{build_extraction_prompt, DEFAULT_LINKER_TEMPLATE},
    },
    services::messages::ExtractionRequest,
    traits::CompletionGateway,
};

/// Title sets of the three input lists, used to infer link endpoint types.
struct TitleSets {
    diagnoses: HashSet<String>,
    labs: HashSet<String>,
    medications: HashSet<String>,
}

impl TitleSets {
    fn new(request: &ExtractionRequest) -> Self {
        let set = |nodes: &[NodeRecord]| nodes.iter().map(|n| n.title.to_lowercase()).collect();
        Self {
            diagnoses: set(&request.diagnoses),
            labs: set(&request.labs),
            medications: set(&request.medications),
        }
    }

    /// Declared type (lowercased) when present, else the list the title came from.
    fn resolve(&self, declared: &str, title: &str) -> String {
        let declared = declared.trim().to_lowercase();
        if !declared.is_empty() {
            return declared;
        }
        let key = title.to_lowercase();
        if self.diagnoses.contains(&key) {
            "diagnosis"
        } else if self.labs.contains(&key) {
            "lab"
        } else if self.medications.contains(&key) {
            "medication"
        } else {
            ""
        }
        .to_string()
    }
}

/// Asks the completion service to propose links between a patient's
/// diagnoses, labs and medications.
pub struct RelationshipExtractor {
    gateway: Arc<dyn CompletionGateway>,
    settings: LinkSettings,
}

impl RelationshipExtractor {
    pub fn new(gateway: Arc<dyn CompletionGateway>, settings: LinkSettings) -> Self {
        Self { gateway, settings }
    }

    /// The configured template file, or the built-in template.
    pub async fn template(&self) -> Result<String, CoreError> {
        match &self.settings.prompt_path {
            Some(path) => tokio::fs::read_to_string(path).await.map_err(|source| {
                CoreError::Store(StoreError::ReadError {
                    path: path.display().to_string(),
                    source,
                })
            }),
            None => Ok(DEFAULT_LINKER_TEMPLATE.to_string()),
        }
    }

    /// Proposes links for the request. A failed or unparseable completion
    /// yields no links rather than an error.
    #[instrument(skip(self, request, trace_ctx), fields(trace_id = %trace_ctx.trace_id))]
    pub async fn extract(
        &self,
        request: &ExtractionRequest,
        trace_ctx: &TraceContext,
    ) -> Result<Vec<LinkRecord>, CoreError> {
        self.extract_normalized(&request.normalized(), trace_ctx).await
    }

    /// `request` must already be normalized.
    async fn extract_normalized(
        &self,
        request: &ExtractionRequest,
        trace_ctx: &TraceContext,
    ) -> Result<Vec<LinkRecord>, CoreError> {
        let template = self.template().await?;
        let prompt = build_extraction_prompt(
            &template,
            &request.diagnoses,
            &request.labs,
            &request.medications,
        );
        debug!(prompt_len = prompt.len(), "Built extraction prompt");

        let options = self.settings.completion_options();
        let completion = match self.gateway.complete(&prompt, &options, &trace_ctx.new_child()).await {
            Ok(completion) => completion,
            Err(e) => {
                warn!(error = %e, "Relationship completion failed, continuing without links");
                return Ok(Vec::new());
            }
        };

        let Some((strategy, value)) = parse_lenient(&completion.content) else {
            warn!(response_len = completion.content.len(), "Relationship response was not JSON");
            return Ok(Vec::new());
        };
        debug!(?strategy, "Parsed relationship response");

        let titles = TitleSets::new(request);
        let links: Vec<LinkRecord> = link_objects(&value)
            .iter()
            .map(LinkRecord::from_object)
            .filter(|l| !l.source.is_empty() && !l.target.is_empty())
            .map(|mut link| {
                link.source_type = titles.resolve(&link.source_type, &link.source);
                link.target_type = titles.resolve(&link.target_type, &link.target);
                link.extra.clear();
                link
            })
            .collect();
        info!(links = links.len(), model = %completion.model, "Extracted relationships");
        Ok(links)
    }

    /// Extracts links and assembles the combined document:
    /// diagnoses, then labs, then medications, followed by the links.
    pub async fn build_graph(
        &self,
        request: &ExtractionRequest,
        trace_ctx: &TraceContext,
    ) -> Result<GraphDocument, CoreError> {
        let request = request.normalized();
        let links = self.extract_normalized(&request, trace_ctx).await?;
        let nodes = request
            .diagnoses
            .iter()
            .chain(&request.labs)
            .chain(&request.medications)
            .cloned()
            .collect();
        Ok(GraphDocument { nodes, links })
    }
}
