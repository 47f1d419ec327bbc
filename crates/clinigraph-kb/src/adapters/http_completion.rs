use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::{
    config::CompletionSettings,
    data::{errors::CompletionError, TraceContext},
    traits::{Completion, CompletionGateway, CompletionOptions},
};

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Body for `POST {base}/chat/completions`
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

/// Body for `POST {base}/responses`
#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: &'a str,
    temperature: f32,
    max_output_tokens: u32,
}

/// Result of one tier: the HTTP status (when a response arrived) and the text.
struct TierOutcome {
    status: Option<u16>,
    body: Result<Value, String>,
}

/// Completion gateway for OpenAI-compatible HTTP services.
///
/// Tries the chat-completions endpoint first and falls back to the responses
/// endpoint when that call fails or produces no text.
#[derive(Debug, Clone)]
pub struct HttpCompletionGateway {
    settings: CompletionSettings,
    client: Client,
}

impl HttpCompletionGateway {
    pub fn new(settings: CompletionSettings) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| CompletionError::Transport(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    async fn post<B: Serialize>(
        &self,
        path: &str,
        api_key: &str,
        body: &B,
        options: &CompletionOptions,
    ) -> TierOutcome {
        let url = format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path);
        let mut request = self.client.post(&url).bearer_auth(api_key).json(body);
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                return TierOutcome {
                    status: None,
                    body: Err(map_http_error(e)),
                }
            }
        };
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return TierOutcome {
                status: Some(status.as_u16()),
                body: Err(text),
            };
        }
        TierOutcome {
            status: Some(status.as_u16()),
            body: response.json::<Value>().await.map_err(map_http_error),
        }
    }
}

fn map_http_error(error: reqwest::Error) -> String {
    if error.is_timeout() {
        format!("Request timeout: {}", error)
    } else if error.is_connect() {
        format!("Connection error: {}", error)
    } else {
        format!("HTTP error: {}", error)
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn chat_text(body: &Value) -> Option<String> {
    non_empty(body.pointer("/choices/0/message/content"))
}

fn responses_text(body: &Value) -> Option<String> {
    non_empty(body.get("output_text")).or_else(|| non_empty(body.pointer("/output/0/content/0/text")))
}

fn reported_model(body: &Value, requested: &str) -> String {
    non_empty(body.get("model")).unwrap_or_else(|| requested.to_string())
}

#[async_trait]
impl CompletionGateway for HttpCompletionGateway {
    #[instrument(skip(self, prompt, options, trace_ctx), fields(trace_id = %trace_ctx.trace_id, prompt_len = prompt.len()))]
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
        trace_ctx: &TraceContext,
    ) -> Result<Completion, CompletionError> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(CompletionError::MissingCredentials)?;

        let model = options.model.as_deref().unwrap_or(&self.settings.model);
        let temperature = options.temperature.unwrap_or(self.settings.temperature);
        let max_tokens = options.max_tokens.unwrap_or(self.settings.max_tokens);
        let system = options.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);

        let chat = ChatRequest {
            model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature,
            max_tokens,
        };
        let first = self.post("chat/completions", api_key, &chat, options).await;
        if let Ok(body) = &first.body {
            if let Some(content) = chat_text(body) {
                debug!(model, "Chat completion succeeded");
                return Ok(Completion {
                    content,
                    model: reported_model(body, model),
                });
            }
        }
        warn!(status = ?first.status, "Chat completion unavailable, trying responses endpoint");

        let fallback = ResponsesRequest {
            model,
            input: prompt,
            temperature,
            max_output_tokens: max_tokens,
        };
        let second = self.post("responses", api_key, &fallback, options).await;
        let body = second
            .body
            .map_err(|detail| CompletionError::exhausted(first.status, second.status, detail))?;
        let content = responses_text(&body).ok_or(CompletionError::EmptyResponse)?;
        Ok(Completion {
            content,
            model: reported_model(&body, model),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_text_extraction() {
        assert_eq!(
            chat_text(&json!({"choices": [{"message": {"content": "hi"}}]})).as_deref(),
            Some("hi")
        );
        assert_eq!(chat_text(&json!({"choices": [{"message": {"content": ""}}]})), None);
        assert_eq!(responses_text(&json!({"output_text": "a"})).as_deref(), Some("a"));
        assert_eq!(
            responses_text(&json!({"output": [{"content": [{"text": "b"}]}]})).as_deref(),
            Some("b")
        );
        assert_eq!(responses_text(&json!({"output": []})), None);
    }

    #[test]
    fn test_reported_model_prefers_response() {
        assert_eq!(reported_model(&json!({"model": "served"}), "asked"), "served");
        assert_eq!(reported_model(&json!({}), "asked"), "asked");
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let gateway = HttpCompletionGateway::new(CompletionSettings {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: None,
            ..CompletionSettings::default()
        })
        .unwrap();
        let result = gateway
            .complete("hello", &CompletionOptions::default(), &TraceContext::new_root())
            .await;
        assert!(matches!(result, Err(CompletionError::MissingCredentials)));
    }
}
