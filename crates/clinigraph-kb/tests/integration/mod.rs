//! Integration tests for clinigraph-kb
//!
//! This module organizes all integration tests in the integration directory.

// Export test utilities for use in all integration tests
pub mod test_utils;

// Integration test modules
pub mod extraction_flow;
pub mod fallback_chain;
pub mod graph_rag_flow;
