pub mod service;

pub use service::{build_answer_prompt, GraphRagService, ANSWER_INSTRUCTION};
