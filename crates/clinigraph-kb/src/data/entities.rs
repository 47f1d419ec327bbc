//! Graph entities, edges and the request-scoped views derived from them

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Clinical category of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Diagnosis,
    Medication,
    TestResult,
    Entity,
}

impl Category {
    /// Maps a free-text tag onto a category. Unrecognized tags become `Entity`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "diagnosis" | "condition" => Category::Diagnosis,
            "medication" | "drug" => Category::Medication,
            "lab" | "labtest" | "test" | "testresult" => Category::TestResult,
            _ => Category::Entity,
        }
    }

    /// Tag written to persisted documents.
    pub fn as_tag(&self) -> &'static str {
        match self {
            Category::Diagnosis => "diagnosis",
            Category::Medication => "medication",
            Category::TestResult => "lab",
            Category::Entity => "entity",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Category::Diagnosis => "Diagnosis",
            Category::Medication => "Medication",
            Category::TestResult => "TestResult",
            Category::Entity => "Entity",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A clinical concept in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(rename = "label")]
    pub category: Category,
}

impl Entity {
    pub fn new(title: impl Into<String>, body: impl Into<String>, category: Category) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            category,
        }
    }

    /// Lowercased title, the case-insensitive key used for matching.
    pub fn key(&self) -> String {
        self.title.to_lowercase()
    }
}

/// A directed, described relationship between two entities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Edge {
    pub source_title: String,
    pub target_title: String,
    pub source_category: Option<Category>,
    pub target_category: Option<Category>,
    pub description: Option<String>,
    /// Always within `[0, 1]` when present.
    pub confidence: Option<f64>,
    /// Properties with no typed home, kept for the fallback description.
    pub extra: Map<String, Value>,
}

impl Edge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_title: source.into(),
            target_title: target.into(),
            ..Default::default()
        }
    }

    pub fn with_categories(mut self, source: Category, target: Category) -> Self {
        self.source_category = Some(source);
        self.target_category = Some(target);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_confidence(mut self, raw: &Value) -> Self {
        self.confidence = clamp_confidence(raw);
        self
    }

    /// Text describing the relationship. Falls back to the serialized remaining
    /// properties when no explicit description exists.
    pub fn describe(&self) -> String {
        match self.description.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => {
                let mut props = self.extra.clone();
                if let Some(c) = self.confidence {
                    props.insert("confidence".to_string(), Value::from(c));
                }
                serde_json::to_string(&props).unwrap_or_default()
            }
        }
    }
}

/// Clamp a raw confidence value into `[0, 1]`.
///
/// Numbers and numeric strings are accepted; anything else, including non-finite
/// numbers, yields `None` rather than a default.
pub fn clamp_confidence(raw: &Value) -> Option<f64> {
    let n = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !n.is_finite() {
        return None;
    }
    Some(n.clamp(0.0, 1.0))
}

/// Loose string coercion for untyped document fields.
pub(crate) fn value_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        _ => String::new(),
    }
}

/// Entities and edges loaded for a single request. Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub entities: Vec<Entity>,
    pub edges: Vec<Edge>,
}

impl GraphSnapshot {
    pub fn new(entities: Vec<Entity>, edges: Vec<Edge>) -> Self {
        Self { entities, edges }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.edges.is_empty()
    }

    /// Title (lowercased) to category index. The first entity with a title wins.
    pub fn category_index(&self) -> HashMap<String, Category> {
        let mut index = HashMap::new();
        for entity in &self.entities {
            index.entry(entity.key()).or_insert(entity.category);
        }
        index
    }
}

/// An entity with its relevance score for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredEntity {
    #[serde(flatten)]
    pub entity: Entity,
    pub score: usize,
}

/// One edge surfaced by neighbor expansion, with both endpoints resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborRow {
    #[serde(rename = "src_label")]
    pub source_category: Category,
    #[serde(rename = "src_title")]
    pub source_title: String,
    #[serde(rename = "nbr_label")]
    pub target_category: Category,
    #[serde(rename = "nbr_title")]
    pub target_title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}
