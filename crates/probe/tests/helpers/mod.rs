//! Shared test utilities for capability probe integration tests.

pub mod fake_engine;
