//! Configuration for the knowledge graph services
//!
//! Values come from the process environment (after loading `.env`), with
//! defaults for everything except credentials.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::warn;

use crate::traits::CompletionOptions;

/// Settings for the remote completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Transport timeout applied to every request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_answer_temperature")]
    pub temperature: f32,

    #[serde(default = "default_answer_max_tokens")]
    pub max_tokens: u32,
}

/// Settings for the relationship extraction call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSettings {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_link_temperature")]
    pub temperature: f32,

    #[serde(default = "default_link_max_tokens")]
    pub max_tokens: u32,

    /// Optional template file replacing the built-in linker template.
    #[serde(default)]
    pub prompt_path: Option<PathBuf>,
}

/// Defaults for graph retrieval requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    #[serde(default = "default_neighbor_k")]
    pub default_neighbor_k: usize,

    /// When set, the grounding context is cut to this many characters.
    #[serde(default)]
    pub context_max_chars: Option<usize>,
}

/// Locations of the serialized graph documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSettings {
    #[serde(default = "default_graph_path")]
    pub graph_path: PathBuf,

    /// Directory holding `diagnoses.json`, `labs.json` and `medications.json`.
    #[serde(default = "default_lists_dir")]
    pub lists_dir: PathBuf,
}

/// Resolved credentials for the live graph database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Neo4jCredentials {
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub database: Option<String>,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbConfig {
    pub completion: CompletionSettings,
    pub link: LinkSettings,
    pub retrieval: RetrievalSettings,
    pub documents: DocumentSettings,
    #[serde(default)]
    pub neo4j: Option<Neo4jCredentials>,

    #[serde(default = "default_host")]
    pub bind_address: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// `json` or `pretty`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_base_url() -> String {
    "https://api.cerebras.ai/v1".to_string()
}

fn default_model() -> String {
    "gpt-oss-120b".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_answer_temperature() -> f32 {
    0.7
}

fn default_answer_max_tokens() -> u32 {
    4096
}

fn default_link_temperature() -> f32 {
    0.35
}

fn default_link_max_tokens() -> u32 {
    16384
}

fn default_top_k() -> usize {
    12
}

fn default_neighbor_k() -> usize {
    10
}

fn default_graph_path() -> PathBuf {
    PathBuf::from("prompts/graph.json")
}

fn default_lists_dir() -> PathBuf {
    PathBuf::from("prompts")
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            temperature: default_answer_temperature(),
            max_tokens: default_answer_max_tokens(),
        }
    }
}

impl CompletionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Options for answering a retrieval question.
    pub fn answer_options(&self) -> CompletionOptions {
        CompletionOptions {
            model: Some(self.model.clone()),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            system_prompt: Some("You are a clinical assistant.".to_string()),
            timeout: None,
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: default_link_temperature(),
            max_tokens: default_link_max_tokens(),
            prompt_path: None,
        }
    }
}

impl LinkSettings {
    pub fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            model: Some(self.model.clone()),
            temperature: Some(self.temperature),
            max_tokens: Some(self.max_tokens),
            system_prompt: Some("You are a helpful assistant.".to_string()),
            timeout: None,
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            default_neighbor_k: default_neighbor_k(),
            context_max_chars: None,
        }
    }
}

impl Default for DocumentSettings {
    fn default() -> Self {
        Self {
            graph_path: default_graph_path(),
            lists_dir: default_lists_dir(),
        }
    }
}

impl Default for KbConfig {
    fn default() -> Self {
        Self {
            completion: CompletionSettings::default(),
            link: LinkSettings::default(),
            retrieval: RetrievalSettings::default(),
            documents: DocumentSettings::default(),
            neo4j: None,
            bind_address: default_host(),
            port: default_port(),
            log_format: default_log_format(),
        }
    }
}

impl KbConfig {
    /// Load configuration from `.env` and the process environment.
    pub fn load() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let first = |keys: &[&str]| keys.iter().find_map(|k| get(k));
        let mut config = Self::default();

        if let Some(url) = get("CEREBRAS_BASE_URL") {
            config.completion.base_url = url.trim_end_matches('/').to_string();
        }
        config.completion.api_key = first(&["CEREBRAS_API_KEY", "OPENAI_API_KEY"]);
        if let Some(model) = get("CEREBRAS_MODEL") {
            config.completion.model = model;
        }
        parse_into(&get, "COMPLETION_TIMEOUT_SECS", &mut config.completion.timeout_secs);

        config.link.model = first(&["LINK_MODEL", "CEREBRAS_LINK_MODEL", "CEREBRAS_MODEL"])
            .unwrap_or_else(default_model);
        parse_into(&get, "LINK_TEMPERATURE", &mut config.link.temperature);
        parse_into(&get, "LINK_MAX_TOKENS", &mut config.link.max_tokens);
        config.link.prompt_path = get("LINKER_PROMPT_PATH").map(PathBuf::from);

        parse_into(&get, "GRAPH_RAG_TOP_K_DEFAULT", &mut config.retrieval.default_top_k);
        parse_into(&get, "GRAPH_RAG_NEIGHBOR_K_DEFAULT", &mut config.retrieval.default_neighbor_k);
        if let Some(raw) = get("GRAPH_RAG_CONTEXT_MAX_CHARS") {
            match raw.trim().parse::<usize>() {
                Ok(n) => config.retrieval.context_max_chars = Some(n),
                Err(_) => warn!("Invalid GRAPH_RAG_CONTEXT_MAX_CHARS value: {}", raw),
            }
        }

        if let Some(path) = get("GRAPH_DOCUMENT_PATH") {
            config.documents.graph_path = PathBuf::from(path);
        }
        if let Some(dir) = get("GRAPH_LISTS_DIR") {
            config.documents.lists_dir = PathBuf::from(dir);
        }

        config.neo4j = resolve_neo4j_credentials(&get);

        if let Some(host) = get("SERVER_HOST") {
            config.bind_address = host;
        }
        parse_into(&get, "SERVER_PORT", &mut config.port);
        if let Some(format) = get("LOG_FORMAT") {
            config.log_format = format.to_lowercase();
        }

        config
    }
}

fn parse_into<T, G>(get: &G, key: &str, slot: &mut T)
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    if let Some(raw) = get(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *slot = value,
            Err(_) => warn!("Invalid {} value: {}", key, raw),
        }
    }
}

fn embedded_credentials_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^bolt://([^:@]+):([^@]+)@(.+)$").expect("valid regex"))
}

fn credentials_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^bolt://[^@]+@").expect("valid regex"))
}

/// Resolve graph database credentials.
///
/// Order: `NEO4J_PASSWORD`, then `NEO4J_AUTH` (`user/pass` or `user:pass`),
/// then credentials embedded in `NEO4J_URI`. Without a password the live
/// graph is not configured.
pub fn resolve_neo4j_credentials<G>(get: &G) -> Option<Neo4jCredentials>
where
    G: Fn(&str) -> Option<String>,
{
    let uri = get("NEO4J_URI").unwrap_or_else(|| "bolt://localhost:7687".to_string());
    let mut user = get("NEO4J_USER").unwrap_or_else(|| "neo4j".to_string());
    let mut password = get("NEO4J_PASSWORD").unwrap_or_default();

    if password.is_empty() {
        if let Some(auth) = get("NEO4J_AUTH") {
            let sep = if auth.contains(':') { ':' } else { '/' };
            if let Some((_, rest)) = auth.split_once(sep) {
                password = rest.to_string();
            }
        }
    }
    if password.is_empty() {
        if let Some(caps) = embedded_credentials_regex().captures(&uri) {
            user = caps[1].to_string();
            password = caps[2].to_string();
        }
    }
    if user.is_empty() || password.is_empty() {
        return None;
    }

    Some(Neo4jCredentials {
        uri: credentials_prefix_regex().replace(&uri, "bolt://").into_owned(),
        user,
        password,
        database: get("NEO4J_DATABASE"),
    })
}
