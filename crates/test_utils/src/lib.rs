//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! CRM capstone test suite.
//!
//! # Modules
//!
//! - `fixtures`: The records and configuration files the demos work with
//! - `builders`: Builder patterns for test records and seeded mock connections
//! - `assertions`: Custom assertion helpers for records and faults
//! - `generators`: Property-based and fake-data generators

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
