//! Small clinical graphs used across tests

use serde_json::json;

use crate::data::{Category, Edge, Entity, GraphSnapshot};

/// Hypertension treated by Lisinopril, with an unrelated asthma node.
pub fn hypertension_snapshot() -> GraphSnapshot {
    GraphSnapshot::new(
        vec![
            Entity::new("Hypertension", "High BP", Category::Diagnosis),
            Entity::new("Lisinopril", "ACE inhibitor", Category::Medication),
            Entity::new("Asthma", "Airway inflammation", Category::Diagnosis),
        ],
        vec![Edge::new("Hypertension", "Lisinopril")
            .with_categories(Category::Diagnosis, Category::Medication)
            .with_description("first-line treatment")
            .with_confidence(&json!(0.9))],
    )
}

/// A diabetes graph with lab and medication edges, some missing categories.
pub fn diabetes_snapshot() -> GraphSnapshot {
    GraphSnapshot::new(
        vec![
            Entity::new("Type 2 Diabetes", "Insulin resistance", Category::Diagnosis),
            Entity::new("HbA1c", "Glycated hemoglobin 8.1%", Category::TestResult),
            Entity::new("Metformin", "Biguanide", Category::Medication),
        ],
        vec![
            Edge::new("Type 2 Diabetes", "HbA1c")
                .with_categories(Category::Diagnosis, Category::TestResult)
                .with_description("monitored by"),
            Edge::new("HbA1c", "Metformin").with_description("guides dosing"),
        ],
    )
}
