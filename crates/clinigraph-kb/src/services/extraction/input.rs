//! Normalization of caller-supplied patient node lists

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::data::{entities::value_text, NodeRecord};

/// Reads a node list leniently: non-objects and untitled entries are
/// dropped, duplicate titles (case-insensitive) keep their first occurrence.
///
/// `title` falls back to `label`, `body` to `description`, `tags` to `type`.
pub fn normalize_node_list(value: Option<&Value>) -> Vec<NodeRecord> {
    normalize_records(
        value
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(|obj| {
                NodeRecord::new(
                    either(obj, "title", "label"),
                    either(obj, "body", "description"),
                    either(obj, "tags", "type"),
                )
            }),
    )
}

/// Trims every field, drops blank titles and keeps the first of each
/// case-insensitive title.
pub fn normalize_records(records: impl IntoIterator<Item = NodeRecord>) -> Vec<NodeRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter_map(|record| {
            let title = record.title.trim();
            if title.is_empty() || !seen.insert(title.to_lowercase()) {
                return None;
            }
            Some(NodeRecord::new(title, record.body.trim(), record.tags.trim()))
        })
        .collect()
}

fn either(obj: &Map<String, Value>, primary: &str, fallback: &str) -> String {
    let first = value_text(obj.get(primary));
    let text = if first.trim().is_empty() {
        value_text(obj.get(fallback))
    } else {
        first
    };
    text.trim().to_string()
}

/// The first of `keys` present with a non-null value.
pub(crate) fn first_present<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| body.get(*k).filter(|v| !v.is_null()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_normalize_aliases_and_duplicates() {
        let raw = json!([
            {"title": "  Hypertension ", "body": "High BP", "tags": "diagnosis"},
            {"label": "hypertension", "description": "duplicate"},
            {"label": "Asthma", "description": "Airway disease", "type": "condition"},
            {"title": ""},
            42,
            {"body": "no title"}
        ]);
        let nodes = normalize_node_list(Some(&raw));
        assert_eq!(
            nodes,
            vec![
                NodeRecord::new("Hypertension", "High BP", "diagnosis"),
                NodeRecord::new("Asthma", "Airway disease", "condition"),
            ]
        );
    }

    #[test]
    fn test_normalize_records_trims_and_dedupes() {
        let nodes = normalize_records(vec![
            NodeRecord::new("  Gout ", " Joint pain ", " diagnosis "),
            NodeRecord::new("gout", "duplicate", ""),
            NodeRecord::new("   ", "blank", ""),
            NodeRecord::new("Allopurinol", "", "medication"),
        ]);
        assert_eq!(
            nodes,
            vec![
                NodeRecord::new("Gout", "Joint pain", "diagnosis"),
                NodeRecord::new("Allopurinol", "", "medication"),
            ]
        );
        assert_eq!(normalize_records(nodes.clone()), nodes);
    }

    #[test]
    fn test_non_array_is_empty() {
        assert!(normalize_node_list(None).is_empty());
        assert!(normalize_node_list(Some(&json!({"title": "x"}))).is_empty());
    }

    #[test]
    fn test_first_present() {
        let body = json!({"diag": null, "conditions": [1]});
        assert_eq!(first_present(&body, &["diagnoses", "diag", "conditions"]), Some(&json!([1])));
        assert_eq!(first_present(&body, &["labs"]), None);
    }
}
