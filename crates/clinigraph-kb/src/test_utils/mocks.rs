//! mockall-backed helpers for the CompletionGateway seam

use crate::data::errors::CompletionError;
use crate::traits::{Completion, MockCompletionGateway};

/// Mock gateway that answers every call with `content` from `model`.
pub fn mock_gateway_replying(content: &str, model: &str) -> MockCompletionGateway {
    let content = content.to_string();
    let model = model.to_string();
    let mut mock = MockCompletionGateway::new();
    mock.expect_complete().returning(move |_, _, _| {
        Ok(Completion {
            content: content.clone(),
            model: model.clone(),
        })
    });
    mock
}

/// Mock gateway whose every call fails with a missing-credentials error.
pub fn mock_gateway_unconfigured() -> MockCompletionGateway {
    let mut mock = MockCompletionGateway::new();
    mock.expect_complete()
        .returning(|_, _, _| Err(CompletionError::MissingCredentials));
    mock
}
