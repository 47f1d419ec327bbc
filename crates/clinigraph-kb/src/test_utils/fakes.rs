use async_trait::async_trait;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Mutex;
use tracing::debug;

use crate::data::{
    errors::{CompletionError, StoreError},
    trace_context::TraceContext,
    GraphSnapshot,
};
use crate::traits::{Completion, CompletionGateway, CompletionOptions, GraphSource};

/// Graph source that always fails, for exercising fallback chains.
#[derive(Debug, Clone)]
pub struct FailingGraphSource {
    name: String,
}

impl FailingGraphSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl GraphSource for FailingGraphSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self, _trace_ctx: &TraceContext) -> Result<Option<GraphSnapshot>, StoreError> {
        Err(StoreError::ConnectionError(format!("{} is unavailable", self.name)))
    }
}

/// A prompt and the options it was sent with.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub options: CompletionOptions,
}

/// Fake implementation of CompletionGateway for testing.
///
/// Replies are consumed in order; once the script runs out the fallback reply
/// (if any) is returned, otherwise `EmptyResponse`.
pub struct FakeCompletionGateway {
    model: String,
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    fallback: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeCompletionGateway {
    pub fn new() -> Self {
        Self {
            model: "fake-model".to_string(),
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Gateway that answers every prompt with the same text.
    pub fn replying(content: impl Into<String>) -> Self {
        Self {
            fallback: Some(content.into()),
            ..Self::new()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Queues a reply for the next call.
    pub fn push_reply(&self, content: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(content.into()));
    }

    /// Queues a failure for the next call.
    pub fn push_error(&self, error: CompletionError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|c| c.prompt.clone())
    }
}

impl Default for FakeCompletionGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FakeCompletionGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FakeCompletionGateway")
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl CompletionGateway for FakeCompletionGateway {
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        trace_ctx: &TraceContext,
    ) -> Result<Completion, CompletionError> {
        debug!(trace_id = %trace_ctx.trace_id, "Fake completion requested");
        self.calls.lock().unwrap().push(RecordedCall {
            prompt: prompt.to_string(),
            options: options.clone(),
        });

        let next = self.script.lock().unwrap().pop_front();
        let content = match next {
            Some(reply) => reply?,
            None => self.fallback.clone().ok_or(CompletionError::EmptyResponse)?,
        };
        Ok(Completion {
            content,
            model: options.model.clone().unwrap_or_else(|| self.model.clone()),
        })
    }
}
