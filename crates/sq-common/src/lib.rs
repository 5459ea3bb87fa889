//! Shared types, errors, and JSON schemas for sequential hypothesis testing.
//!
//! This crate provides foundational types shared across the configuration,
//! core engine, and telemetry crates:
//! - The hypothesis model (null/alternative mean separation)
//! - The change-of-measure pair used for importance-sampling correction
//! - The operating-characteristic enum and its result-file variable names
//! - Threshold spacing strategies
//! - Common error types
//! - Home-directory path expansion

pub mod error;
pub mod homedir;
pub mod model;
pub mod operating_characteristic;
pub mod spacing;

pub use error::{Error, Result};
pub use homedir::expand_homedir;
pub use model::{ChangeOfMeasure, HypothesisModel};
pub use operating_characteristic::OperatingCharacteristic;
pub use spacing::Spacing;
