//! Runs the replication driver once per operating characteristic,
//! pairing each with the change-of-measure it needs and extracting the
//! accumulator its definition is built from.

use sq_common::{ChangeOfMeasure, HypothesisModel, OperatingCharacteristic, Result};
use sq_math::{Grid, MomentStatistic};

use crate::grid::ThresholdGrid;
use crate::process::ObservationProcess;
use crate::rules::RuleVariant;

/// The change-of-measure pair a characteristic is estimated under:
/// expected sample sizes are simulated and analyzed under the same
/// mean, while the two error probabilities are simulated under one
/// mean and reweighted to the other.
fn change_of_measure_for(oc: OperatingCharacteristic, model: &HypothesisModel) -> ChangeOfMeasure {
    let null_mu = model.null_mu();
    let alt_mu = model.smallest_alt_mu();
    match oc {
        OperatingCharacteristic::EssUnderNull => ChangeOfMeasure::new(null_mu, null_mu),
        OperatingCharacteristic::EssUnderAlt => ChangeOfMeasure::new(alt_mu, alt_mu),
        OperatingCharacteristic::ProbabilityOfFalseAlarm => ChangeOfMeasure::new(alt_mu, null_mu),
        OperatingCharacteristic::ProbabilityOfMissedSignal => ChangeOfMeasure::new(null_mu, alt_mu),
    }
}

/// The mean/variance grid pair a characteristic is reported as: the
/// sample-size characteristics read off `run_length`, the error-rate
/// characteristics read off `decision_error`.
fn extract(oc: OperatingCharacteristic, accumulators: &crate::grid::CellAccumulators) -> (Grid<f64>, Grid<f64>) {
    let moments: &MomentStatistic<Grid<f64>> = match oc {
        OperatingCharacteristic::EssUnderNull | OperatingCharacteristic::EssUnderAlt => &accumulators.run_length,
        OperatingCharacteristic::ProbabilityOfFalseAlarm | OperatingCharacteristic::ProbabilityOfMissedSignal => {
            &accumulators.decision_error
        }
    };
    (moments.mean(), moments.variance())
}

/// One operating characteristic's estimated mean/variance grids.
pub struct OcEstimate {
    pub characteristic: OperatingCharacteristic,
    pub mean: Grid<f64>,
    pub variance: Grid<f64>,
}

/// Simulate every requested operating characteristic against the same
/// threshold grid shape, rebuilding a fresh grid per characteristic so
/// replications under one change-of-measure never leak state into the
/// next. `build_grid`/`build_process` each construct fresh, independent
/// state; they are called once per worker thread per characteristic, so
/// every thread gets its own grid and process rather than sharing one.
///
/// Each characteristic's `simulations` replications are split across
/// `threads` workers via [`crate::monte_carlo::run_replications_parallel`].
#[allow(clippy::too_many_arguments)]
pub fn run_all<R: RuleVariant + Send>(
    characteristics: &[OperatingCharacteristic],
    build_grid: impl Fn() -> ThresholdGrid<R> + Sync,
    build_process: impl Fn() -> ObservationProcess + Sync,
    model: &HypothesisModel,
    threads: usize,
    simulations: usize,
    max_length: usize,
    anticipated_run_length: f64,
    seed: u64,
) -> Result<Vec<OcEstimate>> {
    let mut estimates = Vec::with_capacity(characteristics.len());
    for (index, &oc) in characteristics.iter().enumerate() {
        let change_of_measure = change_of_measure_for(oc, model);
        let accumulators = crate::monte_carlo::run_replications_parallel(
            threads,
            &build_grid,
            &build_process,
            model,
            change_of_measure,
            simulations,
            max_length,
            anticipated_run_length,
            seed.wrapping_add(index as u64 * 1_000_003),
        )?;
        let (mean, variance) = extract(oc, &accumulators);
        estimates.push(OcEstimate {
            characteristic: oc,
            mean,
            variance,
        });
    }
    Ok(estimates)
}
