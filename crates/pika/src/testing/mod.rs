//! # Test Support
//!
//! Deterministic, grammar-directed input generation for tests and benches.

pub mod generators;

pub use generators::{GeneratorConfig, InputGenerator};
