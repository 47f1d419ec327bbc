//! Trace context for request tracking across the retrieval and extraction paths

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Header carrying a caller-supplied request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Ids longer than this are ignored in favor of a generated one.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Trace context threaded through graph source and completion calls.
///
/// `trace_id` identifies one API request end to end; every collaborator call
/// (store load, completion) gets its own `span_id` parented on the caller's.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub parent_id: Option<String>,
}

impl TraceContext {
    pub fn new_root() -> Self {
        Self::rooted_at(Uuid::new_v4().to_string())
    }

    /// Root context that reuses an inbound request id as the trace id, so
    /// service logs line up with the caller's. Blank, oversized or
    /// non-printable ids fall back to a generated one.
    pub fn from_request_id(request_id: Option<&str>) -> Self {
        match request_id.map(str::trim).filter(|id| is_usable_request_id(id)) {
            Some(id) => Self::rooted_at(id.to_string()),
            None => Self::new_root(),
        }
    }

    fn rooted_at(trace_id: String) -> Self {
        Self {
            trace_id,
            span_id: Uuid::new_v4().to_string(),
            parent_id: None,
        }
    }

    /// Context for a collaborator call made on behalf of this request.
    pub fn new_child(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            span_id: Uuid::new_v4().to_string(),
            parent_id: Some(self.span_id.clone()),
        }
    }
}

fn is_usable_request_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_REQUEST_ID_LEN && id.chars().all(|c| c.is_ascii_graphic())
}

impl Default for TraceContext {
    fn default() -> Self {
        Self::new_root()
    }
}
