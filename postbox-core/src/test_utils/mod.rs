//! Test utilities shared by unit tests and downstream crates
//!
//! Compiled for this crate's own tests and, behind the `test-utils` feature,
//! for other workspace crates' test suites.

pub mod async_helpers;
pub mod fixtures;

pub use async_helpers::*;
pub use fixtures::*;
