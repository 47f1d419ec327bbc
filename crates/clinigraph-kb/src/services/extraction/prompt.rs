//! Prompt assembly for relationship extraction

use serde::Serialize;

use crate::data::NodeRecord;

pub const DIAGNOSES_PLACEHOLDER: &str = "<PATIENT_DIAGNOSES>";
pub const LABS_PLACEHOLDER: &str = "<PATIENT_LABS>";
pub const MEDICATIONS_PLACEHOLDER: &str = "<PATIENT_MEDICATIONS>";

const PREAMBLE: [&str; 5] = [
    "You are an expert clinical knowledge graph builder.",
    "Think step-by-step. Infer clinically plausible relationships, but avoid hallucination.",
    "Prefer high-recall edges that are still clinically reasonable.",
    "Return strictly valid JSON with a top-level object containing 'Links'.",
    "Do not include any free text outside the JSON.",
];

/// Template used when no linker prompt file is configured.
pub const DEFAULT_LINKER_TEMPLATE: &str = r#"Link the patient's diagnoses, lab results and medications into a clinical knowledge graph.

Diagnoses:
<PATIENT_DIAGNOSES>

Lab results:
<PATIENT_LABS>

Medications:
<PATIENT_MEDICATIONS>

Emit one link for every clinically meaningful relationship between two of the nodes above,
for example a diagnosis monitored by a lab, a medication treating a diagnosis, a lab that
guides a medication, or two interacting medications. Use the node titles exactly as given.

Each link has the shape:
{"source": "<title>", "source_type": "diagnosis|lab|medication", "target": "<title>", "target_type": "diagnosis|lab|medication", "description": "<short clinical rationale>", "value": <confidence between 0 and 1>}

Respond with:
{"Links": [ ... ]}
"#;

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "[]".to_string())
}

/// Preamble, a blank line, then `template` with the first occurrence of each
/// placeholder replaced by the pretty-printed node list.
pub fn build_extraction_prompt(
    template: &str,
    diagnoses: &[NodeRecord],
    labs: &[NodeRecord],
    medications: &[NodeRecord],
) -> String {
    format!("{}\n\n{}", PREAMBLE.join("\n"), template)
        .replacen(DIAGNOSES_PLACEHOLDER, &pretty(&diagnoses), 1)
        .replacen(LABS_PLACEHOLDER, &pretty(&labs), 1)
        .replacen(MEDICATIONS_PLACEHOLDER, &pretty(&medications), 1)
}
