//! Relationship extraction between patient diagnoses, labs and medications

pub mod input;
pub mod parse;
pub mod prompt;
pub mod service;

pub use input::{normalize_node_list, normalize_records};
pub use parse::{link_objects, parse_lenient, ParseStrategy};
pub use prompt::{build_extraction_prompt, DEFAULT_LINKER_TEMPLATE};
pub use service::RelationshipExtractor;
