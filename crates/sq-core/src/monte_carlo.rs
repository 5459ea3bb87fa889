//! The Monte-Carlo replication driver: simulates a threshold grid under
//! one change-of-measure pair, replication by replication, until every
//! cell has decided or the configured length limit is exceeded.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sq_common::{ChangeOfMeasure, Error, HypothesisModel, Result};

use crate::grid::{CellAccumulators, ThresholdGrid};
use crate::likelihood::LikelihoodTracker;
use crate::process::ObservationProcess;
use crate::rules::RuleVariant;

/// Run `simulations` replications of `grid` against `process`, folding
/// every replication's per-cell run length and decision-error outcome
/// into a fresh [`CellAccumulators`].
///
/// `grid` must already have been [`ThresholdGrid::initialize`]d. Each
/// replication is simulated under `change_of_measure.simulated` and
/// reweighted back to `change_of_measure.analyzed` at the end of the
/// replication, per [`CellAccumulators::record`].
///
/// Returns [`Error::Invariant`] if any replication's run length exceeds
/// `max_length` without every cell deciding — a rule that never crosses
/// a threshold under the configured means, which the driver treats as
/// a programmer error rather than silently truncating the replication.
pub fn run_replications<R: RuleVariant>(
    grid: &mut ThresholdGrid<R>,
    process: &mut ObservationProcess,
    model: &HypothesisModel,
    change_of_measure: ChangeOfMeasure,
    simulations: usize,
    max_length: usize,
    anticipated_run_length: f64,
    rng: &mut impl Rng,
) -> Result<CellAccumulators> {
    let rows = grid.null_thresholds().len();
    let cols = grid.alt_thresholds().len();
    let mut accumulators = CellAccumulators::new(rows, cols, anticipated_run_length);
    let mut likelihood = LikelihoodTracker::new(model.null_mu());

    for _ in 0..simulations {
        process.reset(change_of_measure.simulated);
        likelihood.reset();
        grid.reset();

        while !grid.is_finished() {
            process.tic(rng);
            likelihood.tic(process);
            grid.tic(process, &likelihood);

            if process.count() > max_length {
                return Err(Error::invariant(
                    "monte_carlo",
                    format!("replication exceeded the maximum run length of {max_length}"),
                ));
            }
        }

        grid.toc();
        accumulators.record(grid, process, model, change_of_measure);
    }

    Ok(accumulators)
}

/// Partition `simulations` replications across `threads` workers, each
/// owning its own grid and observation process built by `build_grid`/
/// `build_process`, then reduce their per-worker [`CellAccumulators`]
/// by summing moment-statistic bins. The only cross-thread object is
/// the final reduction; each worker owns disjoint state until then.
///
/// `threads == 1` still goes through `std::thread::scope` rather than
/// a special-cased sequential path, keeping one code path for both.
#[allow(clippy::too_many_arguments)]
pub fn run_replications_parallel<R: RuleVariant + Send>(
    threads: usize,
    build_grid: impl Fn() -> ThresholdGrid<R> + Sync,
    build_process: impl Fn() -> ObservationProcess + Sync,
    model: &HypothesisModel,
    change_of_measure: ChangeOfMeasure,
    simulations: usize,
    max_length: usize,
    anticipated_run_length: f64,
    seed: u64,
) -> Result<CellAccumulators> {
    let threads = threads.max(1);
    let per_worker = simulations / threads;
    let remainder = simulations % threads;

    let worker_results: Vec<Result<CellAccumulators>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let count = per_worker + if worker == 0 { remainder } else { 0 };
                let build_grid = &build_grid;
                let build_process = &build_process;
                scope.spawn(move || {
                    let mut grid = build_grid();
                    let mut process = build_process();
                    let mut rng = StdRng::seed_from_u64(seed.wrapping_add(worker as u64));
                    run_replications(
                        &mut grid,
                        &mut process,
                        model,
                        change_of_measure,
                        count,
                        max_length,
                        anticipated_run_length,
                        &mut rng,
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().expect("monte carlo worker thread panicked"))
            .collect()
    });

    let mut results = worker_results.into_iter();
    let mut combined = results
        .next()
        .ok_or_else(|| Error::invariant("monte_carlo", "no worker threads were spawned"))??;
    for result in results {
        combined.merge(&result?);
    }
    Ok(combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sq_config::{AdaptiveSprtFlavor, NoiseConfig, SignalConfig};

    use crate::rules::AdaptiveSprtRule;

    fn model() -> HypothesisModel {
        HypothesisModel::new(0.0, 1.0).unwrap()
    }

    #[test]
    fn every_replication_observes_both_accumulators_once() {
        let rule = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::Unconstrained, 0.2, 0.8, false);
        let mut grid = ThresholdGrid::new(rule, vec![2.0], vec![2.0]);
        grid.initialize();

        let mut process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 0.3 },
        );
        let mut rng = StdRng::seed_from_u64(1);
        let change_of_measure = ChangeOfMeasure::new(model().null_mu(), model().null_mu());

        let accumulators =
            run_replications(&mut grid, &mut process, &model(), change_of_measure, 20, 5_000, 50.0, &mut rng)
                .unwrap();

        assert_eq!(accumulators.run_length.count(), 20);
        assert_eq!(accumulators.decision_error.count(), 20);
    }

    #[test]
    fn a_rule_that_never_decides_reports_an_exceeded_length_invariant() {
        struct NeverDecides;
        impl RuleVariant for NeverDecides {
            fn on_initialized(&mut self, _: &[f64], _: &[f64]) {}
            fn on_reset(&mut self) {}
            fn on_tic(&mut self, _: &ObservationProcess, _: &LikelihoodTracker, _: &[(usize, usize)]) {}
            fn on_toc(&mut self) {}
            fn do_decide_null(&self, _: (usize, usize)) -> bool {
                false
            }
            fn do_decide_alt(&self, _: (usize, usize)) -> bool {
                false
            }
            fn is_design_threshold_independent(&self) -> bool {
                false
            }
        }

        let mut grid = ThresholdGrid::new(NeverDecides, vec![2.0], vec![2.0]);
        grid.initialize();
        let mut process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 0.3 },
        );
        let mut rng = StdRng::seed_from_u64(2);
        let change_of_measure = ChangeOfMeasure::new(model().null_mu(), model().null_mu());

        let result = run_replications(&mut grid, &mut process, &model(), change_of_measure, 1, 100, 50.0, &mut rng);
        assert!(matches!(result, Err(Error::Invariant { .. })));
    }

    #[test]
    fn parallel_run_splits_simulations_across_workers_and_merges_counts() {
        let change_of_measure = ChangeOfMeasure::new(model().null_mu(), model().null_mu());

        let accumulators = run_replications_parallel(
            4,
            || {
                let rule = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::Unconstrained, 0.2, 0.8, false);
                let mut grid = ThresholdGrid::new(rule, vec![2.0], vec![2.0]);
                grid.initialize();
                grid
            },
            || ObservationProcess::new(SignalConfig::Constant { level: 1.0 }, &NoiseConfig::White { sigma: 0.3 }),
            &model(),
            change_of_measure,
            20,
            5_000,
            50.0,
            7,
        )
        .unwrap();

        assert_eq!(accumulators.run_length.count(), 20);
        assert_eq!(accumulators.decision_error.count(), 20);
    }

    #[test]
    fn merge_sums_two_accumulators_observation_counts() {
        let rule_a = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::Unconstrained, 0.2, 0.8, false);
        let mut grid_a = ThresholdGrid::new(rule_a, vec![2.0], vec![2.0]);
        grid_a.initialize();
        let mut process_a =
            ObservationProcess::new(SignalConfig::Constant { level: 1.0 }, &NoiseConfig::White { sigma: 0.3 });
        let mut rng_a = StdRng::seed_from_u64(11);
        let change_of_measure = ChangeOfMeasure::new(model().null_mu(), model().null_mu());
        let mut combined =
            run_replications(&mut grid_a, &mut process_a, &model(), change_of_measure, 6, 5_000, 50.0, &mut rng_a)
                .unwrap();

        let rule_b = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::Unconstrained, 0.2, 0.8, false);
        let mut grid_b = ThresholdGrid::new(rule_b, vec![2.0], vec![2.0]);
        grid_b.initialize();
        let mut process_b =
            ObservationProcess::new(SignalConfig::Constant { level: 1.0 }, &NoiseConfig::White { sigma: 0.3 });
        let mut rng_b = StdRng::seed_from_u64(12);
        let other =
            run_replications(&mut grid_b, &mut process_b, &model(), change_of_measure, 9, 5_000, 50.0, &mut rng_b)
                .unwrap();

        combined.merge(&other);
        assert_eq!(combined.run_length.count(), 15);
        assert_eq!(combined.decision_error.count(), 15);
    }
}
