//! Projection of a persisted graph document into a node/edge view

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::data::{GraphDocument, NodeRecord};

/// Confidence reported for links that carry none.
pub const DEFAULT_VIEW_CONFIDENCE: f64 = 0.8;

/// Node types shown in the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewNodeType {
    Diagnosis,
    TestResult,
    Medication,
    Patient,
    Appointment,
    Guideline,
}

impl ViewNodeType {
    /// Unrecognized tags are guidelines.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "diagnosis" | "condition" => ViewNodeType::Diagnosis,
            "test" | "test results" | "lab" | "labtest" | "lab test" | "testresult" => ViewNodeType::TestResult,
            "medication" | "drug" => ViewNodeType::Medication,
            "patient" => ViewNodeType::Patient,
            "appointment" => ViewNodeType::Appointment,
            _ => ViewNodeType::Guideline,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewNodeType::Diagnosis => "Diagnosis",
            ViewNodeType::TestResult => "TestResult",
            ViewNodeType::Medication => "Medication",
            ViewNodeType::Patient => "Patient",
            ViewNodeType::Appointment => "Appointment",
            ViewNodeType::Guideline => "Guideline",
        }
    }

    /// `{type}:{slug}` with the type lowercased.
    pub fn node_id(&self, title: &str) -> String {
        format!("{}:{}", self.as_str().to_lowercase(), slugify(title))
    }
}

/// Edge type for a pair of endpoint types.
pub fn edge_type_for(source: ViewNodeType, target: ViewNodeType) -> &'static str {
    use ViewNodeType::*;
    match (source, target) {
        (Diagnosis, TestResult) => "has_lab",
        (Diagnosis, Medication) | (TestResult, Medication) => "prescribed",
        (Medication, Medication) => "interacts_with",
        (Patient, Appointment) => "has_appointment",
        _ => "guideline",
    }
}

/// Lowercase, runs of non-alphanumerics become `-`, no leading or trailing `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: ViewNodeType,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

impl GraphView {
    /// Projects a document. Nodes keep document order with the first
    /// occurrence of an id winning; link endpoints missing from the node
    /// list are added with body and tags looked up by title.
    pub fn project(document: &GraphDocument) -> Self {
        let by_title: HashMap<String, &NodeRecord> = document
            .nodes
            .iter()
            .filter(|n| !n.title.is_empty())
            .map(|n| (n.title.to_lowercase(), n))
            .collect();

        let mut view = GraphView::default();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut add_node = |view: &mut GraphView, node: ViewNode| {
            if !positions.contains_key(&node.id) {
                positions.insert(node.id.clone(), view.nodes.len());
                view.nodes.push(node);
            }
        };

        for record in document.nodes.iter().filter(|n| !n.title.is_empty()) {
            let node_type = ViewNodeType::from_tag(&record.tags);
            add_node(
                &mut view,
                ViewNode {
                    id: node_type.node_id(&record.title),
                    node_type,
                    label: record.title.clone(),
                    body: non_empty(&record.body),
                    tags: non_empty(&record.tags),
                },
            );
        }

        for (idx, link) in document.links.iter().enumerate() {
            if link.source.is_empty() || link.target.is_empty() {
                continue;
            }
            let source_type = ViewNodeType::from_tag(&link.source_type);
            let target_type = ViewNodeType::from_tag(&link.target_type);
            let source_id = source_type.node_id(&link.source);
            let target_id = target_type.node_id(&link.target);

            for (id, node_type, title) in [
                (&source_id, source_type, &link.source),
                (&target_id, target_type, &link.target),
            ] {
                let known = by_title.get(&title.to_lowercase());
                add_node(
                    &mut view,
                    ViewNode {
                        id: id.clone(),
                        node_type,
                        label: title.clone(),
                        body: known.and_then(|n| non_empty(&n.body)),
                        tags: known.and_then(|n| non_empty(&n.tags)),
                    },
                );
            }

            view.edges.push(ViewEdge {
                id: format!("edge-{}", idx),
                source: source_id,
                target: target_id,
                edge_type: edge_type_for(source_type, target_type).to_string(),
                confidence: link.value.unwrap_or(DEFAULT_VIEW_CONFIDENCE),
                description: non_empty(&link.description),
            });
        }
        view
    }
}
