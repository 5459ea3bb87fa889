//! Double SPRT: a single intermediate mean per cell, with the decision
//! statistic recomputed from scratch (not incrementally) on every tic.

use sq_common::HypothesisModel;
use sq_math::Grid;
use statrs::distribution::{ContinuousCDF, Normal};

use super::RuleVariant;
use crate::likelihood::LikelihoodTracker;
use crate::process::ObservationProcess;

pub struct DoubleSprtRule {
    model: HypothesisModel,
    relative_mu_intermediate: f64,
    asymptotic_init: bool,
    huffman: bool,
    null_thresholds: Vec<f64>,
    alt_thresholds: Vec<f64>,
    mu_mid: Grid<f64>,
    distance_null: Grid<f64>,
    distance_alt: Grid<f64>,
}

impl DoubleSprtRule {
    pub fn new(
        model: HypothesisModel,
        relative_mu_intermediate: f64,
        asymptotic_init: bool,
        huffman: bool,
    ) -> Self {
        DoubleSprtRule {
            model,
            relative_mu_intermediate,
            asymptotic_init,
            huffman,
            null_thresholds: Vec::new(),
            alt_thresholds: Vec::new(),
            mu_mid: Grid::zeros(0, 0),
            distance_null: Grid::zeros(0, 0),
            distance_alt: Grid::zeros(0, 0),
        }
    }

    /// The intermediate mean for cell `(i, j)`, computed once from the
    /// threshold grid rather than the data. Huffman's correction nudges
    /// the plain/asymptotic midpoint toward the alt mean using the
    /// standard-normal quantile implied by the relative weight of the
    /// two thresholds, clipped so it never exceeds `smallest_alt_mu`.
    fn intermediate_mean(&self, i: usize, j: usize) -> f64 {
        let a = self.null_thresholds[i];
        let b = self.alt_thresholds[j];

        if !self.huffman {
            return if self.asymptotic_init {
                self.model.null_mu() + (self.model.smallest_alt_mu() - self.model.null_mu()) / (1.0 + (a / b).sqrt())
            } else {
                self.model.mu_relative(self.relative_mu_intermediate)
            };
        }

        let x = 1.0 + (a / b).sqrt();
        let standard_normal = Normal::new(0.0, 1.0).expect("standard normal is always valid");
        let r = standard_normal.inverse_cdf((1.0 / x).clamp(1e-9, 1.0 - 1e-9));
        let mu_diff = self.model.smallest_alt_mu() - self.model.null_mu();
        let delta_mu_star = mu_diff / x;
        let mu_star = self.model.null_mu() + delta_mu_star;
        let mu_tilde = mu_star + r * delta_mu_star / (2.0 * a).sqrt();
        mu_tilde.min(self.model.smallest_alt_mu())
    }
}

impl RuleVariant for DoubleSprtRule {
    fn on_initialized(&mut self, null_thresholds: &[f64], alt_thresholds: &[f64]) {
        self.null_thresholds = null_thresholds.to_vec();
        self.alt_thresholds = alt_thresholds.to_vec();
        let (rows, cols) = (null_thresholds.len(), alt_thresholds.len());
        self.mu_mid = Grid::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                *self.mu_mid.get_mut(i, j) = self.intermediate_mean(i, j);
            }
        }
        self.distance_null = Grid::zeros(rows, cols);
        self.distance_alt = Grid::zeros(rows, cols);
    }

    fn on_reset(&mut self) {
        for v in self.distance_null.iter_mut() {
            *v = 0.0;
        }
        for v in self.distance_alt.iter_mut() {
            *v = 0.0;
        }
    }

    fn on_tic(
        &mut self,
        process: &ObservationProcess,
        _likelihood: &LikelihoodTracker,
        active: &[(usize, usize)],
    ) {
        let up_to = process.count();
        let scale = process.log_likelihood_scale();
        for &(i, j) in active {
            let mu_mid = *self.mu_mid.get(i, j);
            *self.distance_null.get_mut(i, j) =
                process.unscaled_log_likelihood_between(mu_mid, self.model.null_mu(), up_to) / scale;
            *self.distance_alt.get_mut(i, j) =
                process.unscaled_log_likelihood_between(mu_mid, self.model.smallest_alt_mu(), up_to) / scale;
        }
    }

    fn on_toc(&mut self) {}

    fn do_decide_null(&self, (i, j): (usize, usize)) -> bool {
        *self.distance_alt.get(i, j) > self.null_thresholds[i]
    }

    fn do_decide_alt(&self, (i, j): (usize, usize)) -> bool {
        *self.distance_null.get(i, j) > self.alt_thresholds[j]
    }

    fn is_design_threshold_independent(&self) -> bool {
        !self.asymptotic_init && !self.huffman
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sq_config::{NoiseConfig, SignalConfig};

    fn model() -> HypothesisModel {
        HypothesisModel::new(0.0, 1.0).unwrap()
    }

    #[test]
    fn plain_intermediate_mean_matches_relative_interpolation() {
        let mut rule = DoubleSprtRule::new(model(), 0.5, false, false);
        rule.on_initialized(&[3.0], &[3.0]);
        assert!((*rule.mu_mid.get(0, 0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn huffman_correction_never_exceeds_the_alt_mean() {
        let mut rule = DoubleSprtRule::new(model(), 0.5, false, true);
        rule.on_initialized(&[0.01], &[50.0]);
        assert!(*rule.mu_mid.get(0, 0) <= model().smallest_alt_mu() + 1e-12);
    }

    #[test]
    fn decisions_eventually_fire_for_a_strongly_separated_model() {
        let mut rule = DoubleSprtRule::new(model(), 0.5, true, false);
        rule.on_initialized(&[2.0], &[2.0]);
        rule.on_reset();

        let mut process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 0.3 },
        );
        process.reset(1.0);
        let likelihood = LikelihoodTracker::new(model().null_mu());
        let mut rng = StdRng::seed_from_u64(13);

        let mut decided = false;
        for _ in 0..5_000 {
            process.tic(&mut rng);
            rule.on_tic(&process, &likelihood, &[(0, 0)]);
            if rule.do_decide_alt((0, 0)) || rule.do_decide_null((0, 0)) {
                decided = true;
                break;
            }
        }
        assert!(decided, "double SPRT never crossed a threshold");
    }

    #[test]
    fn threshold_independence_requires_neither_asymptotic_init_nor_huffman() {
        assert!(DoubleSprtRule::new(model(), 0.5, false, false).is_design_threshold_independent());
        assert!(!DoubleSprtRule::new(model(), 0.5, true, false).is_design_threshold_independent());
        assert!(!DoubleSprtRule::new(model(), 0.5, false, true).is_design_threshold_independent());
        assert!(!DoubleSprtRule::new(model(), 0.5, true, true).is_design_threshold_independent());
    }
}
