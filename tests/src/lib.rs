//! Shared harness for the pipeline integration tests.

pub mod containers;
pub mod fixtures;
pub mod mocks;
