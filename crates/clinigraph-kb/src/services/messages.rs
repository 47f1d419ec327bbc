//! Request and response types for the knowledge graph services

use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::data::{CoreError, GraphDocument, NeighborRow, NodeRecord, ScoredEntity, TraceContext};
use crate::services::extraction::{input::first_present, normalize_node_list, normalize_records};
use crate::services::graph_view::GraphView;
use crate::traits::Completion;

/// A question to answer from graph context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalRequest {
    pub question: String,
    /// Unset means the configured default.
    pub top_k: Option<usize>,
    pub neighbor_k: Option<usize>,
    pub include_types: Option<Vec<String>>,
}

impl RetrievalRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Default::default()
        }
    }

    pub fn with_limits(mut self, top_k: usize, neighbor_k: usize) -> Self {
        self.top_k = Some(top_k);
        self.neighbor_k = Some(neighbor_k);
        self
    }

    /// Reads a JSON request body. The question comes from `question` or
    /// `query`; a blank question is a validation error.
    pub fn from_value(body: &Value) -> Result<Self, CoreError> {
        let question = ["question", "query"]
            .iter()
            .filter_map(|k| body.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .find(|q| !q.is_empty())
            .ok_or_else(|| CoreError::validation("Missing 'question' in request body."))?;

        let include_types = body.get("include_types").and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        });

        Ok(Self {
            question: question.to_string(),
            top_k: body.get("top_k").filter(|v| !v.is_null()).map(loose_count),
            neighbor_k: body.get("neighbor_k").filter(|v| !v.is_null()).map(loose_count),
            include_types,
        })
    }
}

/// Numeric coercion for count fields. Unparseable values read as `0`, which
/// callers treat as "use the fallback"; negative values read as `1`.
fn loose_count(value: &Value) -> usize {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match n {
        Some(n) if n.is_finite() && n < 0.0 => 1,
        Some(n) if n.is_finite() => n as usize,
        _ => 0,
    }
}

/// The answer and the grounding it was produced from.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalResponse {
    pub question: String,
    pub answer: String,
    pub model: String,
    pub context: String,
    pub top_nodes: Vec<ScoredEntity>,
    pub neighbors: Vec<NeighborRow>,
}

/// Patient node lists to link.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionRequest {
    pub diagnoses: Vec<NodeRecord>,
    pub labs: Vec<NodeRecord>,
    pub medications: Vec<NodeRecord>,
    /// Persist the resulting document to the configured graph path.
    pub save: bool,
}

impl ExtractionRequest {
    /// Builds a request from node lists, normalizing each list.
    pub fn new(diagnoses: Vec<NodeRecord>, labs: Vec<NodeRecord>, medications: Vec<NodeRecord>) -> Self {
        Self {
            diagnoses: normalize_records(diagnoses),
            labs: normalize_records(labs),
            medications: normalize_records(medications),
            save: false,
        }
    }

    /// Copy with every list trimmed and deduplicated by title.
    pub fn normalized(&self) -> Self {
        Self {
            diagnoses: normalize_records(self.diagnoses.iter().cloned()),
            labs: normalize_records(self.labs.iter().cloned()),
            medications: normalize_records(self.medications.iter().cloned()),
            save: self.save,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.diagnoses.is_empty() && self.labs.is_empty() && self.medications.is_empty()
    }

    /// Reads a JSON request body, accepting the list aliases
    /// `diag`/`conditions`, `lab_tests`/`labTests` and `meds`/`drugs`.
    pub fn from_value(body: &Value) -> Result<Self, CoreError> {
        let request = Self {
            diagnoses: normalize_node_list(first_present(body, &["diagnoses", "diag", "conditions"])),
            labs: normalize_node_list(first_present(body, &["labs", "lab_tests", "labTests"])),
            medications: normalize_node_list(first_present(body, &["medications", "meds", "drugs"])),
            save: ["save", "save_graph"]
                .iter()
                .any(|k| body.get(*k).and_then(Value::as_bool) == Some(true)),
        };
        if request.is_empty() {
            return Err(CoreError::validation(
                "No nodes provided. Include 'diagnoses', 'labs', or 'medications'.",
            ));
        }
        Ok(request)
    }
}

/// Requests accepted by the service's channel loop
#[derive(Debug)]
pub enum KbRequest {
    Answer {
        trace_ctx: TraceContext,
        request: RetrievalRequest,
    },
    BuildGraph {
        trace_ctx: TraceContext,
        request: ExtractionRequest,
    },
    GraphView {
        trace_ctx: TraceContext,
    },
    Generate {
        trace_ctx: TraceContext,
        prompt: String,
    },
}

/// Response type for channel requests
#[derive(Debug)]
pub enum KbResponse {
    Answer(RetrievalResponse),
    Graph(GraphDocument),
    View(GraphView),
    Generated(Completion),
    Error(CoreError),
}

/// Wrapper for the oneshot sender to return results
#[derive(Debug)]
pub struct KbResultSender {
    pub sender: oneshot::Sender<KbResponse>,
}
