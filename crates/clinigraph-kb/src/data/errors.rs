//! Error types for the clinical knowledge graph

use thiserror::Error;
use serde_json;

/// Base Error type for core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    #[error("Graph store error: {0}")]
    Store(#[from] StoreError),

    #[error("Serialization/Deserialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal system error: {0}")]
    Internal(String),
}

impl CoreError {
    /// HTTP-equivalent status class for API callers: bad input is a 400, the rest 500.
    pub fn status_class(&self) -> u16 {
        match self {
            CoreError::ValidationError(_) => 400,
            _ => 500,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::ValidationError(message.into())
    }
}

/// Errors raised by a graph source (live graph or serialized document).
///
/// These never cross the `EntityStore` boundary; the store logs them and moves on
/// to the next source.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Graph source not configured: {0}")]
    NotConfigured(String),
    #[error("Graph database connection error: {0}")]
    ConnectionError(String),
    #[error("Graph query execution error: {0}")]
    QueryError(String),
    #[error("Document read error for {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Data mapping error: {0}")]
    MappingError(String),
}

/// Errors raised by the completion gateway.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("Missing completion API key (set CEREBRAS_API_KEY or OPENAI_API_KEY)")]
    MissingCredentials,

    #[error("Completion failed: chat status {chat}/responses status {responses}: {detail}")]
    Exhausted {
        chat: String,
        responses: String,
        detail: String,
    },

    #[error("Completion service returned no text")]
    EmptyResponse,

    #[error("Completion transport error: {0}")]
    Transport(String),
}

impl CompletionError {
    /// Builds the unified two-tier failure; a missing status means the tier never got a response.
    pub fn exhausted(chat: Option<u16>, responses: Option<u16>, detail: impl Into<String>) -> Self {
        let show = |s: Option<u16>| s.map(|c| c.to_string()).unwrap_or_else(|| "none".to_string());
        CompletionError::Exhausted {
            chat: show(chat),
            responses: show(responses),
            detail: detail.into(),
        }
    }
}
