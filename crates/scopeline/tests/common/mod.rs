//! Shared test utilities for scopeline integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated pipeline execution with a scripted gateway
//! - Builders for model responses and start requests

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::TestHarness;
