//! Writes one result file per `(rule, operating-characteristic set)`
//! combination produced by a run, plus the flat auxiliary table, into a
//! subdirectory named by a unique three-letter prefix and the run's
//! canonical model string.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, StringArray, UInt32Array, UInt64Array};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::format::KeyValue;
use parquet::file::properties::{WriterProperties, WriterVersion};
use sq_common::OperatingCharacteristic;
use sq_math::Grid;
use thiserror::Error;

use crate::schema::{aux_schema, result_schema};

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// The three-letter output-directory prefix space (`aaa`..`zzz`) is
    /// exhausted for this base directory. Scoped to one run; does not
    /// abort the rest of the config's runs.
    #[error("no unused three-letter output prefix remains under {base_dir}")]
    PrefixSpaceExhausted { base_dir: String },
}

/// One rule instantiation's full set of estimated operating
/// characteristics, ready to be flattened into per-cell result rows.
pub struct RuleInitResult {
    pub rule_id: u64,
    pub rule_init_id: u64,
    pub mu_null: f64,
    pub mu_alt: f64,
    pub b_null: Vec<f64>,
    pub b_alt: Vec<f64>,
    /// `(characteristic, mean grid, variance grid)`, one entry per
    /// characteristic the run estimated for this rule init.
    pub characteristics: Vec<(OperatingCharacteristic, Grid<f64>, Grid<f64>)>,
}

/// Find the next unused three-letter directory prefix (`aaa`..`zzz`)
/// under `base_dir`. A prefix is "used" if any entry under `base_dir`
/// already starts with it followed by `_`.
pub fn next_prefix(base_dir: &Path) -> Result<String, WriteError> {
    let existing: Vec<String> = match fs::read_dir(base_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect(),
        Err(_) => Vec::new(),
    };

    for a in b'a'..=b'z' {
        for b in b'a'..=b'z' {
            for c in b'a'..=b'z' {
                let prefix = format!("{}{}{}", a as char, b as char, c as char);
                let taken = existing.iter().any(|name| name.starts_with(&format!("{prefix}_")));
                if !taken {
                    return Ok(prefix);
                }
            }
        }
    }
    Err(WriteError::PrefixSpaceExhausted {
        base_dir: base_dir.display().to_string(),
    })
}

fn cell_value(grid: &Grid<f64>, i: usize, j: usize) -> f64 {
    if i < grid.rows() && j < grid.cols() {
        grid[(i, j)]
    } else {
        f64::NAN
    }
}

/// Build the main result table's record batch: one row per
/// `(rule init, grid cell)`. `mu_null`/`mu_alt` are constant for every
/// row in a run (they're a property of the run's hypothesis model, not
/// of the cell) and are carried as file-level metadata by
/// [`write_run`] instead of a column.
pub fn build_result_batch(run_id: &str, rows: &[RuleInitResult]) -> Result<RecordBatch, WriteError> {
    let mut run_ids = Vec::new();
    let mut rule_ids = Vec::new();
    let mut rule_init_ids = Vec::new();
    let mut null_indices = Vec::new();
    let mut alt_indices = Vec::new();
    let mut b_null = Vec::new();
    let mut b_alt = Vec::new();
    let mut ess_null = Vec::new();
    let mut vss_null = Vec::new();
    let mut ess_alt = Vec::new();
    let mut vss_alt = Vec::new();
    let mut pfa = Vec::new();
    let mut vfa = Vec::new();
    let mut pms = Vec::new();
    let mut vms = Vec::new();

    for row in rows {
        let find = |oc: OperatingCharacteristic| row.characteristics.iter().find(|(c, _, _)| *c == oc);
        let ess_under_null = find(OperatingCharacteristic::EssUnderNull);
        let ess_under_alt = find(OperatingCharacteristic::EssUnderAlt);
        let false_alarm = find(OperatingCharacteristic::ProbabilityOfFalseAlarm);
        let missed_signal = find(OperatingCharacteristic::ProbabilityOfMissedSignal);

        for (i, &null_threshold) in row.b_null.iter().enumerate() {
            for (j, &alt_threshold) in row.b_alt.iter().enumerate() {
                run_ids.push(run_id.to_string());
                rule_ids.push(row.rule_id);
                rule_init_ids.push(row.rule_init_id);
                null_indices.push(i as u32);
                alt_indices.push(j as u32);
                b_null.push(null_threshold);
                b_alt.push(alt_threshold);

                let (ess0, vss0) = ess_under_null
                    .map(|(_, m, v)| (cell_value(m, i, j), cell_value(v, i, j)))
                    .unwrap_or((f64::NAN, f64::NAN));
                ess_null.push(ess0);
                vss_null.push(vss0);

                let (ess1, vss1) = ess_under_alt
                    .map(|(_, m, v)| (cell_value(m, i, j), cell_value(v, i, j)))
                    .unwrap_or((f64::NAN, f64::NAN));
                ess_alt.push(ess1);
                vss_alt.push(vss1);

                let (p, v) = false_alarm
                    .map(|(_, m, v)| (cell_value(m, i, j), cell_value(v, i, j)))
                    .unwrap_or((f64::NAN, f64::NAN));
                pfa.push(p);
                vfa.push(v);

                let (p, v) = missed_signal
                    .map(|(_, m, v)| (cell_value(m, i, j), cell_value(v, i, j)))
                    .unwrap_or((f64::NAN, f64::NAN));
                pms.push(p);
                vms.push(v);
            }
        }
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(run_ids)),
        Arc::new(UInt64Array::from(rule_ids)),
        Arc::new(UInt64Array::from(rule_init_ids)),
        Arc::new(UInt32Array::from(null_indices)),
        Arc::new(UInt32Array::from(alt_indices)),
        Arc::new(Float64Array::from(b_null)),
        Arc::new(Float64Array::from(b_alt)),
        Arc::new(Float64Array::from(ess_null)),
        Arc::new(Float64Array::from(vss_null)),
        Arc::new(Float64Array::from(ess_alt)),
        Arc::new(Float64Array::from(vss_alt)),
        Arc::new(Float64Array::from(pfa)),
        Arc::new(Float64Array::from(vfa)),
        Arc::new(Float64Array::from(pms)),
        Arc::new(Float64Array::from(vms)),
    ];

    Ok(RecordBatch::try_new(Arc::new(result_schema()), columns)?)
}

/// Build the flat auxiliary table's record batch: one row per grid
/// cell per characteristic evaluated.
pub fn build_aux_batch(run_id: &str, rows: &[RuleInitResult]) -> Result<RecordBatch, WriteError> {
    let mut run_ids = Vec::new();
    let mut rule_ids = Vec::new();
    let mut rule_init_ids = Vec::new();
    let mut null_indices = Vec::new();
    let mut alt_indices = Vec::new();
    let mut analyzed_mu = Vec::new();
    let mut simulated_mu = Vec::new();
    let mut perror = Vec::new();
    let mut verror = Vec::new();
    let mut ess = Vec::new();
    let mut vss = Vec::new();

    for row in rows {
        for (oc, mean, variance) in &row.characteristics {
            let (simulated, analyzed) = change_of_measure_means(*oc, row.mu_null, row.mu_alt);
            for i in 0..row.b_null.len() {
                for j in 0..row.b_alt.len() {
                    run_ids.push(run_id.to_string());
                    rule_ids.push(row.rule_id);
                    rule_init_ids.push(row.rule_init_id);
                    null_indices.push(i as u32);
                    alt_indices.push(j as u32);
                    analyzed_mu.push(analyzed);
                    simulated_mu.push(simulated);

                    let is_error_oc = matches!(
                        oc,
                        OperatingCharacteristic::ProbabilityOfFalseAlarm
                            | OperatingCharacteristic::ProbabilityOfMissedSignal
                    );
                    if is_error_oc {
                        perror.push(Some(cell_value(mean, i, j)));
                        verror.push(Some(cell_value(variance, i, j)));
                        ess.push(None);
                        vss.push(None);
                    } else {
                        perror.push(None);
                        verror.push(None);
                        ess.push(Some(cell_value(mean, i, j)));
                        vss.push(Some(cell_value(variance, i, j)));
                    }
                }
            }
        }
    }

    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(run_ids)),
        Arc::new(UInt64Array::from(rule_ids)),
        Arc::new(UInt64Array::from(rule_init_ids)),
        Arc::new(UInt32Array::from(null_indices)),
        Arc::new(UInt32Array::from(alt_indices)),
        Arc::new(Float64Array::from(analyzed_mu)),
        Arc::new(Float64Array::from(simulated_mu)),
        Arc::new(Float64Array::from(perror)),
        Arc::new(Float64Array::from(verror)),
        Arc::new(Float64Array::from(ess)),
        Arc::new(Float64Array::from(vss)),
    ];

    Ok(RecordBatch::try_new(Arc::new(aux_schema()), columns)?)
}

fn change_of_measure_means(oc: OperatingCharacteristic, mu_null: f64, mu_alt: f64) -> (f64, f64) {
    match oc {
        OperatingCharacteristic::EssUnderNull => (mu_null, mu_null),
        OperatingCharacteristic::EssUnderAlt => (mu_alt, mu_alt),
        OperatingCharacteristic::ProbabilityOfFalseAlarm => (mu_alt, mu_null),
        OperatingCharacteristic::ProbabilityOfMissedSignal => (mu_null, mu_alt),
    }
}

fn write_parquet(path: &Path, batch: &RecordBatch, key_value_metadata: Option<Vec<KeyValue>>) -> Result<(), WriteError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let props = WriterProperties::builder()
        .set_writer_version(WriterVersion::PARQUET_2_0)
        .set_compression(Compression::ZSTD(ZstdLevel::try_new(3).expect("valid zstd level")))
        .set_key_value_metadata(key_value_metadata)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(())
}

/// Write both result files for one run into a fresh subdirectory of
/// `mat_output`, named `<prefix>_<canonical_model>`. `mu_null`/`mu_alt`
/// are the same for every rule init in a run (they come from the run's
/// hypothesis model), so they're written once as file-level key-value
/// metadata on `result.parquet` rather than as a column. Returns the
/// subdirectory's path.
pub fn write_run(
    mat_output: &Path,
    canonical_model: &str,
    run_id: &str,
    rows: &[RuleInitResult],
) -> Result<PathBuf, WriteError> {
    fs::create_dir_all(mat_output)?;
    let prefix = next_prefix(mat_output)?;
    let run_dir = mat_output.join(format!("{prefix}_{canonical_model}"));
    fs::create_dir_all(&run_dir)?;

    let metadata = rows.first().map(|row| {
        vec![
            KeyValue::new("mu_null".to_string(), row.mu_null.to_string()),
            KeyValue::new("mu_alt".to_string(), row.mu_alt.to_string()),
        ]
    });

    let result_batch = build_result_batch(run_id, rows)?;
    write_parquet(&run_dir.join("result.parquet"), &result_batch, metadata)?;

    let aux_batch = build_aux_batch(run_id, rows)?;
    write_parquet(&run_dir.join("more.parquet"), &aux_batch, None)?;

    Ok(run_dir)
}
