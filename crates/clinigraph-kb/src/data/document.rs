//! Persisted graph document: `{"Nodes": [...], "Links": [...]}`
//!
//! Documents are written by the relationship extractor and read back by the
//! document graph sources and the graph-view projection. Reading is lenient:
//! non-object entries are skipped and loosely typed fields are coerced.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::entities::{clamp_confidence, value_text, Category, Edge, Entity, GraphSnapshot};
use crate::data::errors::StoreError;

/// A node as it appears in a persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: String,
}

impl NodeRecord {
    pub fn new(title: impl Into<String>, body: impl Into<String>, tags: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            tags: tags.into(),
        }
    }

    /// Reads a node from a loosely typed JSON object.
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        Self {
            title: value_text(obj.get("title")).trim().to_string(),
            body: value_text(obj.get("body")).trim().to_string(),
            tags: value_text(obj.get("tags")).trim().to_string(),
        }
    }

    pub fn to_entity(&self) -> Entity {
        Entity::new(self.title.clone(), self.body.clone(), Category::from_tag(&self.tags))
    }
}

/// A link as it appears in a persisted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub source: String,
    #[serde(default)]
    pub source_type: String,
    pub target: String,
    #[serde(default)]
    pub target_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(flatten, default)]
    pub extra: Map<String, Value>,
}

const LINK_FIELDS: &[&str] = &[
    "source",
    "target",
    "source_type",
    "sourceType",
    "target_type",
    "targetType",
    "description",
    "value",
    "confidence",
];

impl LinkRecord {
    /// Reads a link from a loosely typed JSON object, accepting the camelCase
    /// aliases and `confidence` in place of `value`.
    pub fn from_object(obj: &Map<String, Value>) -> Self {
        let pick = |a: &str, b: &str| {
            let first = value_text(obj.get(a));
            if first.trim().is_empty() {
                value_text(obj.get(b))
            } else {
                first
            }
        };
        let raw_value = match obj.get("value") {
            Some(v) if !v.is_null() => v,
            _ => obj.get("confidence").unwrap_or(&Value::Null),
        };
        let extra = obj
            .iter()
            .filter(|(k, _)| !LINK_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            source: value_text(obj.get("source")).trim().to_string(),
            source_type: pick("source_type", "sourceType").trim().to_string(),
            target: value_text(obj.get("target")).trim().to_string(),
            target_type: pick("target_type", "targetType").trim().to_string(),
            description: value_text(obj.get("description")).trim().to_string(),
            value: clamp_confidence(raw_value),
            extra,
        }
    }

    pub fn to_edge(&self) -> Edge {
        let category = |raw: &str| {
            if raw.is_empty() {
                None
            } else {
                Some(Category::from_tag(raw))
            }
        };
        Edge {
            source_title: self.source.clone(),
            target_title: self.target.clone(),
            source_category: category(&self.source_type),
            target_category: category(&self.target_type),
            description: if self.description.is_empty() {
                None
            } else {
                Some(self.description.clone())
            },
            confidence: self.value,
            extra: self.extra.clone(),
        }
    }
}

/// Combined node/link document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(rename = "Nodes", default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(rename = "Links", default)]
    pub links: Vec<LinkRecord>,
}

impl GraphDocument {
    /// Lenient conversion from parsed JSON. The top level must be an object;
    /// missing or non-array collections read as empty.
    pub fn from_value(value: &Value) -> Result<Self, StoreError> {
        let obj = value
            .as_object()
            .ok_or_else(|| StoreError::MappingError("graph document is not a JSON object".to_string()))?;
        Ok(Self {
            nodes: node_records(obj.get("Nodes")),
            links: objects(obj.get("Links")).map(LinkRecord::from_object).collect(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    /// Entities (skipping untitled nodes) and edges in document order.
    pub fn to_snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::new(
            self.nodes
                .iter()
                .filter(|n| !n.title.is_empty())
                .map(NodeRecord::to_entity)
                .collect(),
            self.links.iter().map(LinkRecord::to_edge).collect(),
        )
    }
}

/// Reads node records from an optional JSON array, skipping non-objects.
pub fn node_records(value: Option<&Value>) -> Vec<NodeRecord> {
    objects(value).map(NodeRecord::from_object).collect()
}

fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}
