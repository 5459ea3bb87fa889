//! Result-file storage for Monte-Carlo simulated operating
//! characteristics.
//!
//! This crate provides:
//! - Arrow schema definitions for the per-run result table and its
//!   flat auxiliary table
//! - A Parquet writer that lays results out under a unique
//!   three-letter-prefixed subdirectory per run

pub mod schema;
pub mod writer;

pub use schema::{aux_schema, result_schema};
pub use writer::{build_aux_batch, build_result_batch, next_prefix, write_run, RuleInitResult, WriteError};
