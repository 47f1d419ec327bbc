//! Test doubles and fixtures shared by unit and integration tests

pub mod fakes;
pub mod fixtures;

#[cfg(feature = "mocks")]
pub mod mocks;

// Re-export commonly used test utilities
pub use fakes::*;
pub use fixtures::*;
#[cfg(feature = "mocks")]
pub use mocks::*;
