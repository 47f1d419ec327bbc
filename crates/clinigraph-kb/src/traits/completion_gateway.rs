//! CompletionGateway trait definition for the remote text-completion service

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::data::{errors::CompletionError, TraceContext};

/// Per-call completion options. Unset fields take the gateway's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    /// Upper bound for each network call made for this completion.
    pub timeout: Option<Duration>,
}

/// Text returned by the completion service and the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub content: String,
    pub model: String,
}

/// Represents the interface for generating text from a prompt.
#[cfg_attr(any(test, feature = "mocks"), mockall::automock)]
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Generates a completion for the given prompt.
    ///
    /// Contract: fails with `MissingCredentials` before any network call when no
    /// API key is configured. Never retries beyond its own fallback shape.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        trace_ctx: &TraceContext,
    ) -> Result<Completion, CompletionError>;
}
