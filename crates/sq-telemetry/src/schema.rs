//! Arrow schema for the result files a run produces: one row per
//! threshold-grid cell, carrying that cell's thresholds and every
//! estimated operating characteristic's mean/variance, plus an
//! auxiliary flat table breaking the same cells out per
//! change-of-measure pass.
//!
//! `mu_null`/`mu_alt` are 1x1 per rule init and are carried as
//! file-level key-value metadata rather than a column — see
//! [`crate::writer::write_run`].

use arrow::datatypes::{DataType, Field, Schema};

fn scalar_field(name: &str) -> Field {
    Field::new(name, DataType::Float64, false)
}

/// The main result table: one row per `(run, rule init, grid cell)`.
///
/// `b_null`/`b_alt` carry that cell's own threshold values (row `i`'s
/// null threshold, column `j`'s alt threshold); every OC mean/variance
/// pair is that cell's estimate.
pub fn result_schema() -> Schema {
    Schema::new(vec![
        Field::new("run_id", DataType::Utf8, false),
        Field::new("rule_id", DataType::UInt64, false),
        Field::new("rule_init_id", DataType::UInt64, false),
        Field::new("null_index", DataType::UInt32, false),
        Field::new("alt_index", DataType::UInt32, false),
        scalar_field("b_null"),
        scalar_field("b_alt"),
        scalar_field("ess_null"),
        scalar_field("vss_null"),
        scalar_field("ess_alt"),
        scalar_field("vss_alt"),
        scalar_field("pfa"),
        scalar_field("vfa"),
        scalar_field("pms"),
        scalar_field("vms"),
    ])
}

/// The auxiliary "more" table: the same per-cell estimates broken out
/// one row per `(run, rule init, grid cell, characteristic)`, alongside
/// the change-of-measure pair each characteristic was simulated under.
pub fn aux_schema() -> Schema {
    Schema::new(vec![
        Field::new("run_id", DataType::Utf8, false),
        Field::new("rule_id", DataType::UInt64, false),
        Field::new("rule_init_id", DataType::UInt64, false),
        Field::new("null_index", DataType::UInt32, false),
        Field::new("alt_index", DataType::UInt32, false),
        scalar_field("analyzed_mu"),
        scalar_field("simulated_mu"),
        Field::new("perror", DataType::Float64, true),
        Field::new("verror", DataType::Float64, true),
        Field::new("ess", DataType::Float64, true),
        Field::new("vss", DataType::Float64, true),
    ])
}
