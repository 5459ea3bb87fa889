//! The two-SPRT threshold grid: owns one rule engine instance per
//! `(null_threshold, alt_threshold)` cell, tics every still-active cell
//! each observation, and retires cells once either hypothesis is
//! decided for.

use sq_common::{ChangeOfMeasure, HypothesisModel};
use sq_math::{Grid as Matrix, MomentStatistic};

use crate::likelihood::LikelihoodTracker;
use crate::process::ObservationProcess;
use crate::rules::RuleVariant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Listening,
    Decided,
}

/// A cell's outcome once it stops listening. Both flags can be set at
/// once: a cell that crosses both thresholds on the same tic is an
/// ambiguous decision, which [`CellAccumulators::record`] treats as an
/// error regardless of which mean the replication was simulated under.
#[derive(Debug, Clone, Copy, Default)]
pub struct CellOutcome {
    pub decided_null: bool,
    pub decided_alt: bool,
    pub run_length: usize,
}

/// Drives a [`RuleVariant`] across an `m x n` threshold grid for one
/// replication at a time.
pub struct ThresholdGrid<R: RuleVariant> {
    rule: R,
    null_thresholds: Vec<f64>,
    alt_thresholds: Vec<f64>,
    state: State,
    outcomes: Matrix<CellOutcome>,
    active: Vec<(usize, usize)>,
    threshold_independent: bool,
    first_uncrossed_null: usize,
    first_uncrossed_alt: usize,
}

impl<R: RuleVariant> ThresholdGrid<R> {
    pub fn new(rule: R, null_thresholds: Vec<f64>, alt_thresholds: Vec<f64>) -> Self {
        let rows = null_thresholds.len();
        let cols = alt_thresholds.len();
        ThresholdGrid {
            rule,
            null_thresholds,
            alt_thresholds,
            state: State::Uninitialized,
            outcomes: Matrix::filled(rows, cols, CellOutcome::default()),
            active: Vec::with_capacity(rows * cols),
            threshold_independent: false,
            first_uncrossed_null: 0,
            first_uncrossed_alt: 0,
        }
    }

    pub fn null_thresholds(&self) -> &[f64] {
        &self.null_thresholds
    }

    pub fn alt_thresholds(&self) -> &[f64] {
        &self.alt_thresholds
    }

    /// Allocate the rule's per-cell state. Call once before any
    /// replication.
    pub fn initialize(&mut self) {
        self.rule.on_initialized(&self.null_thresholds, &self.alt_thresholds);
        self.threshold_independent = self.rule.is_design_threshold_independent();
        self.state = State::Listening;
    }

    /// Clear every cell's outcome and reset the rule ahead of a fresh
    /// replication. Every cell starts active again.
    pub fn reset(&mut self) {
        self.rule.on_reset();
        for v in self.outcomes.iter_mut() {
            *v = CellOutcome::default();
        }
        self.active.clear();
        for i in 0..self.null_thresholds.len() {
            for j in 0..self.alt_thresholds.len() {
                self.active.push((i, j));
            }
        }
        self.first_uncrossed_null = 0;
        self.first_uncrossed_alt = 0;
        self.state = State::Listening;
    }

    /// True once every cell has reached a decision.
    pub fn is_finished(&self) -> bool {
        self.active.is_empty()
    }

    /// Advance every still-active cell by one observation, retiring any
    /// cell for which either hypothesis has now been decided. Returns
    /// the cells that decided on this tic.
    ///
    /// When the rule declares itself threshold-independent, decisions
    /// are polled along each axis alone (see [`Self::tic_monotone`])
    /// instead of at every individual cell.
    pub fn tic(&mut self, process: &ObservationProcess, likelihood: &LikelihoodTracker) -> Vec<(usize, usize)> {
        if self.active.is_empty() {
            return Vec::new();
        }
        self.rule.on_tic(process, likelihood, &self.active);
        let run_length = process.count();

        let decided = if self.threshold_independent {
            self.tic_monotone(run_length)
        } else {
            self.tic_grid(run_length)
        };

        if self.active.is_empty() {
            self.state = State::Decided;
        }
        decided
    }

    /// Poll every still-active cell's own decision predicates directly.
    fn tic_grid(&mut self, run_length: usize) -> Vec<(usize, usize)> {
        let mut decided = Vec::new();
        let mut i = 0;
        while i < self.active.len() {
            let cell = self.active[i];
            let decided_null = self.rule.do_decide_null(cell);
            let decided_alt = self.rule.do_decide_alt(cell);

            if decided_null || decided_alt {
                *self.outcomes.get_mut(cell.0, cell.1) = CellOutcome {
                    decided_null,
                    decided_alt,
                    run_length,
                };
                decided.push(cell);
                self.active.swap_remove(i);
            } else {
                i += 1;
            }
        }
        decided
    }

    /// Strip-fill scan for a threshold-independent rule: walk the null
    /// axis from `first_uncrossed_null`, querying `do_decide_null` at a
    /// representative column (0), stopping at the first threshold not
    /// yet crossed; every row up to there is marked decided across the
    /// columns not yet crossed on the alt axis. The alt axis is scanned
    /// symmetrically against a representative row (0). Both scans read
    /// the cursors as they stood before this tic, so a row and a column
    /// that both newly decide on the same tic can mark the same cell on
    /// both axes — an ambiguous decision, same as the per-cell scan.
    fn tic_monotone(&mut self, run_length: usize) -> Vec<(usize, usize)> {
        let rows = self.null_thresholds.len();
        let cols = self.alt_thresholds.len();
        let old_null_cursor = self.first_uncrossed_null;
        let old_alt_cursor = self.first_uncrossed_alt;
        let mut decided = Vec::new();

        let mut next_null_cursor = old_null_cursor;
        for i in old_null_cursor..rows {
            if !self.rule.do_decide_null((i, 0)) {
                break;
            }
            next_null_cursor = i + 1;
            for j in old_alt_cursor..cols {
                let outcome = self.outcomes.get_mut(i, j);
                outcome.decided_null = true;
                outcome.run_length = run_length;
                decided.push((i, j));
            }
        }

        let mut next_alt_cursor = old_alt_cursor;
        for j in old_alt_cursor..cols {
            if !self.rule.do_decide_alt((0, j)) {
                break;
            }
            next_alt_cursor = j + 1;
            for i in old_null_cursor..rows {
                let outcome = self.outcomes.get_mut(i, j);
                outcome.decided_alt = true;
                outcome.run_length = run_length;
                decided.push((i, j));
            }
        }

        self.first_uncrossed_null = next_null_cursor;
        self.first_uncrossed_alt = next_alt_cursor;
        self.active
            .retain(|&(i, j)| i >= self.first_uncrossed_null && j >= self.first_uncrossed_alt);
        decided
    }

    /// Give the rule a chance to finalize any derived state once a
    /// replication has fully decided.
    pub fn toc(&mut self) {
        self.rule.on_toc();
    }

    pub fn outcome(&self, cell: (usize, usize)) -> CellOutcome {
        *self.outcomes.get(cell.0, cell.1)
    }

    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let rows = self.null_thresholds.len();
        let cols = self.alt_thresholds.len();
        (0..rows).flat_map(move |i| (0..cols).map(move |j| (i, j)))
    }
}

/// Per-cell accumulators for one operating characteristic: run length
/// and decision-error rate, each a grid-valued moment statistic running
/// over every cell of a completed grid simultaneously.
pub struct CellAccumulators {
    pub run_length: MomentStatistic<Matrix<f64>>,
    pub decision_error: MomentStatistic<Matrix<f64>>,
}

impl CellAccumulators {
    pub fn new(rows: usize, cols: usize, anticipated_run_length: f64) -> Self {
        let length_shift = Matrix::filled(rows, cols, anticipated_run_length);
        let error_shift = Matrix::zeros(rows, cols);
        CellAccumulators {
            run_length: MomentStatistic::new(3, length_shift),
            decision_error: MomentStatistic::new(3, error_shift),
        }
    }

    /// Fold one fully-decided replication's outcomes into the running
    /// moments. `model` and `change_of_measure.analyzed` determine which
    /// hypothesis is actually true under the measure results are being
    /// reported against; when `change_of_measure.simulated` differs from
    /// `analyzed`, each cell's run length and error indicator are
    /// reweighted by that cell's own change-of-measure correction,
    /// computed from the likelihood ratio accumulated up to the
    /// observation before the cell decided.
    ///
    /// A cell counts as an error if it crossed both thresholds at once
    /// (an ambiguous decision), decided alt while the null is true, or
    /// decided null while the alt is true.
    pub fn record(
        &mut self,
        grid: &ThresholdGrid<impl RuleVariant>,
        process: &ObservationProcess,
        model: &HypothesisModel,
        change_of_measure: ChangeOfMeasure,
    ) {
        let rows = grid.null_thresholds().len();
        let cols = grid.alt_thresholds().len();
        let is_null_true = model.is_null(change_of_measure.analyzed);
        let is_alt_true = model.is_alt(change_of_measure.analyzed);
        let scale = process.log_likelihood_scale();

        let mut run_length = Matrix::zeros(rows, cols);
        let mut decision_error = Matrix::zeros(rows, cols);

        for (i, j) in grid.cells() {
            let outcome = grid.outcome((i, j));
            let is_error = (outcome.decided_null && outcome.decided_alt)
                || (outcome.decided_null && is_alt_true)
                || (outcome.decided_alt && is_null_true);

            let weight = if change_of_measure.is_identity() {
                1.0
            } else {
                let up_to = outcome.run_length.saturating_sub(1);
                (process
                    .unscaled_log_likelihood_between(change_of_measure.simulated, change_of_measure.analyzed, up_to)
                    / scale)
                    .exp()
            };

            *run_length.get_mut(i, j) = outcome.run_length as f64 / weight;
            *decision_error.get_mut(i, j) = if is_error { 1.0 / weight } else { 0.0 };
        }

        self.run_length.observe(run_length);
        self.decision_error.observe(decision_error);
    }

    /// Fold another accumulator's observations into this one, summing
    /// moment-statistic bins. Used to combine per-worker accumulators
    /// from a multi-threaded Monte Carlo run.
    pub fn merge(&mut self, other: &CellAccumulators) {
        self.run_length.merge(&other.run_length);
        self.decision_error.merge(&other.decision_error);
    }
}
