//! The four families of two-SPRT decision rules, each driving the same
//! null/alt threshold grid from a different decision statistic.

pub mod adaptive_sprt;
pub mod double_sprt;
pub mod generalized_sprt;

pub use adaptive_sprt::AdaptiveSprtRule;
pub use double_sprt::DoubleSprtRule;
pub use generalized_sprt::GeneralizedSprtRule;

use crate::likelihood::LikelihoodTracker;
use crate::process::ObservationProcess;
use sq_config::RuleDesign;

/// The common verbs every decision rule implements against a shared
/// null/alt threshold grid. `cell` is `(null_index, alt_index)`.
pub trait RuleVariant {
    /// Allocate per-cell state for the given threshold grid. Called
    /// once before any replication.
    fn on_initialized(&mut self, null_thresholds: &[f64], alt_thresholds: &[f64]);

    /// Clear per-cell state ahead of a fresh replication.
    fn on_reset(&mut self);

    /// Update the decision statistic for every still-active cell after
    /// one more observation has been drawn.
    fn on_tic(
        &mut self,
        process: &ObservationProcess,
        likelihood: &LikelihoodTracker,
        active: &[(usize, usize)],
    );

    /// Called once a cell's final decision statistics are in, ahead of
    /// change-of-measure correction.
    fn on_toc(&mut self);

    fn do_decide_null(&self, cell: (usize, usize)) -> bool;
    fn do_decide_alt(&self, cell: (usize, usize)) -> bool;

    /// Whether `do_decide_null`/`do_decide_alt` depend only on their own
    /// axis (null row for `do_decide_null`, alt column for
    /// `do_decide_alt`) rather than on the opposing threshold index.
    /// A grid driven by a threshold-independent rule can be scanned with
    /// a per-axis cursor instead of visiting every cell.
    fn is_design_threshold_independent(&self) -> bool;
}

/// Tagged-union dispatch over the four rule families, mirroring
/// [`RuleDesign`]'s shape so a grid can be built directly from config.
pub enum RuleEngine {
    AdaptiveSprt(AdaptiveSprtRule),
    DoubleSprt(DoubleSprtRule),
    GeneralizedSprt(GeneralizedSprtRule),
}

impl RuleEngine {
    pub fn build(design: &RuleDesign, model: sq_common::HypothesisModel) -> Self {
        match design {
            RuleDesign::AdaptiveSprt {
                flavor,
                relative_mu_null_init,
                relative_mu_alt_init,
                asymptotic_init,
                ..
            } => RuleEngine::AdaptiveSprt(AdaptiveSprtRule::new(
                model,
                *flavor,
                *relative_mu_null_init,
                *relative_mu_alt_init,
                *asymptotic_init,
            )),
            RuleDesign::DoubleSprt {
                relative_mu_intermediate,
                asymptotic_init,
                huffman,
                ..
            } => RuleEngine::DoubleSprt(DoubleSprtRule::new(
                model,
                *relative_mu_intermediate,
                *asymptotic_init,
                *huffman,
            )),
            RuleDesign::GeneralizedSprt {
                flavor,
                relative_mu_cutoff,
                asymptotic_init,
                ..
            } => RuleEngine::GeneralizedSprt(GeneralizedSprtRule::new(
                model,
                *flavor,
                *relative_mu_cutoff,
                *asymptotic_init,
            )),
        }
    }
}

impl RuleVariant for RuleEngine {
    fn on_initialized(&mut self, null_thresholds: &[f64], alt_thresholds: &[f64]) {
        match self {
            RuleEngine::AdaptiveSprt(r) => r.on_initialized(null_thresholds, alt_thresholds),
            RuleEngine::DoubleSprt(r) => r.on_initialized(null_thresholds, alt_thresholds),
            RuleEngine::GeneralizedSprt(r) => r.on_initialized(null_thresholds, alt_thresholds),
        }
    }

    fn on_reset(&mut self) {
        match self {
            RuleEngine::AdaptiveSprt(r) => r.on_reset(),
            RuleEngine::DoubleSprt(r) => r.on_reset(),
            RuleEngine::GeneralizedSprt(r) => r.on_reset(),
        }
    }

    fn on_tic(
        &mut self,
        process: &ObservationProcess,
        likelihood: &LikelihoodTracker,
        active: &[(usize, usize)],
    ) {
        match self {
            RuleEngine::AdaptiveSprt(r) => r.on_tic(process, likelihood, active),
            RuleEngine::DoubleSprt(r) => r.on_tic(process, likelihood, active),
            RuleEngine::GeneralizedSprt(r) => r.on_tic(process, likelihood, active),
        }
    }

    fn on_toc(&mut self) {
        match self {
            RuleEngine::AdaptiveSprt(r) => r.on_toc(),
            RuleEngine::DoubleSprt(r) => r.on_toc(),
            RuleEngine::GeneralizedSprt(r) => r.on_toc(),
        }
    }

    fn do_decide_null(&self, cell: (usize, usize)) -> bool {
        match self {
            RuleEngine::AdaptiveSprt(r) => r.do_decide_null(cell),
            RuleEngine::DoubleSprt(r) => r.do_decide_null(cell),
            RuleEngine::GeneralizedSprt(r) => r.do_decide_null(cell),
        }
    }

    fn do_decide_alt(&self, cell: (usize, usize)) -> bool {
        match self {
            RuleEngine::AdaptiveSprt(r) => r.do_decide_alt(cell),
            RuleEngine::DoubleSprt(r) => r.do_decide_alt(cell),
            RuleEngine::GeneralizedSprt(r) => r.do_decide_alt(cell),
        }
    }

    fn is_design_threshold_independent(&self) -> bool {
        match self {
            RuleEngine::AdaptiveSprt(r) => r.is_design_threshold_independent(),
            RuleEngine::DoubleSprt(r) => r.is_design_threshold_independent(),
            RuleEngine::GeneralizedSprt(r) => r.is_design_threshold_independent(),
        }
    }
}
