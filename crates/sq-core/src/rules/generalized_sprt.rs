//! Generalized SPRT: the decision statistic is built from the current
//! null-floored MLE, either against the unconstrained estimate
//! (`general`) or a fixed per-cell cutoff mean (`cutoff`).

use sq_common::HypothesisModel;
use sq_config::GeneralizedSprtFlavor;
use sq_math::Grid;

use super::RuleVariant;
use crate::likelihood::LikelihoodTracker;
use crate::process::ObservationProcess;

pub struct GeneralizedSprtRule {
    model: HypothesisModel,
    flavor: GeneralizedSprtFlavor,
    relative_mu_cutoff: f64,
    asymptotic_init: bool,
    null_thresholds: Vec<f64>,
    alt_thresholds: Vec<f64>,
    mu_cut: Grid<f64>,
    distance_null: Grid<f64>,
    distance_alt: Grid<f64>,
    is_estimator_low: Grid<bool>,
    is_estimator_high: Grid<bool>,
}

impl GeneralizedSprtRule {
    pub fn new(
        model: HypothesisModel,
        flavor: GeneralizedSprtFlavor,
        relative_mu_cutoff: f64,
        asymptotic_init: bool,
    ) -> Self {
        GeneralizedSprtRule {
            model,
            flavor,
            relative_mu_cutoff,
            asymptotic_init,
            null_thresholds: Vec::new(),
            alt_thresholds: Vec::new(),
            mu_cut: Grid::zeros(0, 0),
            distance_null: Grid::zeros(0, 0),
            distance_alt: Grid::zeros(0, 0),
            is_estimator_low: Grid::filled(0, 0, false),
            is_estimator_high: Grid::filled(0, 0, false),
        }
    }

    fn cutoff_mean(&self, i: usize, j: usize) -> f64 {
        if self.asymptotic_init {
            let ratio = (self.null_thresholds[i] / self.alt_thresholds[j]).sqrt();
            self.model.null_mu() + (self.model.smallest_alt_mu() - self.model.null_mu()) / (1.0 + ratio)
        } else {
            self.model.mu_relative(self.relative_mu_cutoff)
        }
    }
}

impl RuleVariant for GeneralizedSprtRule {
    fn on_initialized(&mut self, null_thresholds: &[f64], alt_thresholds: &[f64]) {
        self.null_thresholds = null_thresholds.to_vec();
        self.alt_thresholds = alt_thresholds.to_vec();
        let (rows, cols) = (null_thresholds.len(), alt_thresholds.len());
        self.mu_cut = Grid::zeros(rows, cols);
        if matches!(self.flavor, GeneralizedSprtFlavor::Cutoff) {
            for i in 0..rows {
                for j in 0..cols {
                    *self.mu_cut.get_mut(i, j) = self.cutoff_mean(i, j);
                }
            }
        }
        self.distance_null = Grid::zeros(rows, cols);
        self.distance_alt = Grid::zeros(rows, cols);
        self.is_estimator_low = Grid::filled(rows, cols, true);
        self.is_estimator_high = Grid::filled(rows, cols, false);
    }

    fn on_reset(&mut self) {
        for v in self.distance_null.iter_mut() {
            *v = 0.0;
        }
        for v in self.distance_alt.iter_mut() {
            *v = 0.0;
        }
        for v in self.is_estimator_low.iter_mut() {
            *v = true;
        }
        for v in self.is_estimator_high.iter_mut() {
            *v = false;
        }
    }

    fn on_tic(
        &mut self,
        process: &ObservationProcess,
        likelihood: &LikelihoodTracker,
        active: &[(usize, usize)],
    ) {
        let up_to = process.count();
        let scale = process.log_likelihood_scale();
        let mu_null_hat = likelihood.latest_mu_hat0();

        for &(i, j) in active {
            *self.distance_null.get_mut(i, j) =
                process.unscaled_log_likelihood_between(mu_null_hat, self.model.null_mu(), up_to) / scale;

            match self.flavor {
                GeneralizedSprtFlavor::General => {
                    let mu_alt_hat = mu_null_hat.max(self.model.smallest_alt_mu());
                    *self.distance_alt.get_mut(i, j) =
                        process.unscaled_log_likelihood_between(mu_null_hat, mu_alt_hat, up_to) / scale;
                }
                GeneralizedSprtFlavor::Cutoff => {
                    let cut = *self.mu_cut.get(i, j);
                    *self.distance_alt.get_mut(i, j) =
                        process.unscaled_log_likelihood_between(mu_null_hat, self.model.smallest_alt_mu(), up_to) / scale;
                    *self.is_estimator_low.get_mut(i, j) = mu_null_hat <= cut;
                    *self.is_estimator_high.get_mut(i, j) = mu_null_hat >= cut;
                }
            }
        }
    }

    fn on_toc(&mut self) {}

    fn do_decide_null(&self, (i, j): (usize, usize)) -> bool {
        let crosses = *self.distance_alt.get(i, j) > self.null_thresholds[i];
        match self.flavor {
            GeneralizedSprtFlavor::General => crosses,
            GeneralizedSprtFlavor::Cutoff => crosses && *self.is_estimator_low.get(i, j),
        }
    }

    fn do_decide_alt(&self, (i, j): (usize, usize)) -> bool {
        let crosses = *self.distance_null.get(i, j) > self.alt_thresholds[j];
        match self.flavor {
            GeneralizedSprtFlavor::General => crosses,
            GeneralizedSprtFlavor::Cutoff => crosses && *self.is_estimator_high.get(i, j),
        }
    }

    fn is_design_threshold_independent(&self) -> bool {
        match self.flavor {
            GeneralizedSprtFlavor::General => true,
            GeneralizedSprtFlavor::Cutoff => !self.asymptotic_init,
        }
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
    fn cutoff_mean_only_populated_for_cutoff_flavor() {
        let mut general = GeneralizedSprtRule::new(model(), GeneralizedSprtFlavor::General, 0.5, false);
        general.on_initialized(&[3.0], &[3.0]);
        assert_eq!(*general.mu_cut.get(0, 0), 0.0);

        let mut cutoff = GeneralizedSprtRule::new(model(), GeneralizedSprtFlavor::Cutoff, 0.5, false);
        cutoff.on_initialized(&[3.0], &[3.0]);
        assert!((*cutoff.mu_cut.get(0, 0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn estimator_gates_flip_around_the_cutoff() {
        let mut rule = GeneralizedSprtRule::new(model(), GeneralizedSprtFlavor::Cutoff, 0.5, false);
        rule.on_initialized(&[2.0], &[2.0]);
        rule.on_reset();

        let mut process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 0.3 },
        );
        process.reset(1.0);
        let mut likelihood = LikelihoodTracker::new(model().null_mu());
        let mut rng = StdRng::seed_from_u64(21);

        for _ in 0..200 {
            process.tic(&mut rng);
            likelihood.tic(&process);
            rule.on_tic(&process, &likelihood, &[(0, 0)]);
        }
        assert!(*rule.is_estimator_high.get(0, 0) || *rule.is_estimator_low.get(0, 0));
    }

    #[test]
    fn decisions_eventually_fire_for_a_strongly_separated_model() {
        let mut rule = GeneralizedSprtRule::new(model(), GeneralizedSprtFlavor::General, 0.5, true);
        rule.on_initialized(&[2.0], &[2.0]);
        rule.on_reset();

        let mut process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 0.3 },
        );
        process.reset(1.0);
        let mut likelihood = LikelihoodTracker::new(model().null_mu());
        let mut rng = StdRng::seed_from_u64(23);

        let mut decided = false;
        for _ in 0..5_000 {
            process.tic(&mut rng);
            likelihood.tic(&process);
            rule.on_tic(&process, &likelihood, &[(0, 0)]);
            if rule.do_decide_alt((0, 0)) || rule.do_decide_null((0, 0)) {
                decided = true;
                break;
            }
        }
        assert!(decided, "generalized SPRT never crossed a threshold");
    }

    #[test]
    fn general_flavor_is_always_threshold_independent() {
        let asymptotic = GeneralizedSprtRule::new(model(), GeneralizedSprtFlavor::General, 0.5, true);
        let relative = GeneralizedSprtRule::new(model(), GeneralizedSprtFlavor::General, 0.5, false);
        assert!(asymptotic.is_design_threshold_independent());
        assert!(relative.is_design_threshold_independent());
    }

    #[test]
    fn cutoff_flavor_is_threshold_independent_only_without_asymptotic_init() {
        let asymptotic = GeneralizedSprtRule::new(model(), GeneralizedSprtFlavor::Cutoff, 0.5, true);
        let relative = GeneralizedSprtRule::new(model(), GeneralizedSprtFlavor::Cutoff, 0.5, false);
        assert!(!asymptotic.is_design_threshold_independent());
        assert!(relative.is_design_threshold_independent());
    }
}
