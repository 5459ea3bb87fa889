//! Adaptive SPRT: a per-cell initial guess at the driving mean, carried
//! by a single shared running estimate once the first observation is
//! in. The `flavor` controls both which estimate delays the update and,
//! for `general`, how the alt-branch statistic is built.

use sq_common::HypothesisModel;
use sq_config::AdaptiveSprtFlavor;
use sq_math::Grid;

use super::RuleVariant;
use crate::likelihood::LikelihoodTracker;
use crate::process::ObservationProcess;

pub struct AdaptiveSprtRule {
    model: HypothesisModel,
    flavor: AdaptiveSprtFlavor,
    relative_mu_null_init: f64,
    relative_mu_alt_init: f64,
    asymptotic_init: bool,
    null_thresholds: Vec<f64>,
    alt_thresholds: Vec<f64>,
    guess_null: Grid<f64>,
    guess_alt: Grid<f64>,
    init_null: Grid<f64>,
    init_alt: Grid<f64>,
    offset_null: f64,
    offset_alt: f64,
    delayed_mu_null_estimator: f64,
    ticked: bool,
}

impl AdaptiveSprtRule {
    pub fn new(
        model: HypothesisModel,
        flavor: AdaptiveSprtFlavor,
        relative_mu_null_init: f64,
        relative_mu_alt_init: f64,
        asymptotic_init: bool,
    ) -> Self {
        let null_mu = model.null_mu();
        AdaptiveSprtRule {
            model,
            flavor,
            relative_mu_null_init,
            relative_mu_alt_init,
            asymptotic_init,
            null_thresholds: Vec::new(),
            alt_thresholds: Vec::new(),
            guess_null: Grid::zeros(0, 0),
            guess_alt: Grid::zeros(0, 0),
            init_null: Grid::zeros(0, 0),
            init_alt: Grid::zeros(0, 0),
            offset_null: 0.0,
            offset_alt: 0.0,
            delayed_mu_null_estimator: null_mu,
            ticked: false,
        }
    }

    /// The pair of initial guesses driving the null-branch and alt-branch
    /// statistics for cell `(i, j)`: either the shared asymptotic
    /// crossover mean, or the two independently configured relative
    /// positions. Depends only on the threshold grid, so it is computed
    /// once at initialization.
    fn seed_means(&self, i: usize, j: usize) -> (f64, f64) {
        if self.asymptotic_init {
            let ratio = (self.null_thresholds[i] / self.alt_thresholds[j]).sqrt();
            let m = self.model.null_mu() + (self.model.smallest_alt_mu() - self.model.null_mu()) / (1.0 + ratio);
            (m, m)
        } else {
            (
                self.model.mu_relative(self.relative_mu_null_init),
                self.model.mu_relative(self.relative_mu_alt_init),
            )
        }
    }
}

impl RuleVariant for AdaptiveSprtRule {
    fn on_initialized(&mut self, null_thresholds: &[f64], alt_thresholds: &[f64]) {
        self.null_thresholds = null_thresholds.to_vec();
        self.alt_thresholds = alt_thresholds.to_vec();
        let (rows, cols) = (null_thresholds.len(), alt_thresholds.len());
        self.guess_null = Grid::zeros(rows, cols);
        self.guess_alt = Grid::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                let (guess_null, guess_alt) = self.seed_means(i, j);
                *self.guess_null.get_mut(i, j) = guess_null;
                *self.guess_alt.get_mut(i, j) = guess_alt;
            }
        }
        self.init_null = Grid::zeros(rows, cols);
        self.init_alt = Grid::zeros(rows, cols);
    }

    fn on_reset(&mut self) {
        for v in self.init_null.iter_mut() {
            *v = 0.0;
        }
        for v in self.init_alt.iter_mut() {
            *v = 0.0;
        }
        self.offset_null = 0.0;
        self.offset_alt = 0.0;
        self.delayed_mu_null_estimator = self.model.null_mu();
        self.ticked = false;
    }

    fn on_tic(
        &mut self,
        process: &ObservationProcess,
        likelihood: &LikelihoodTracker,
        active: &[(usize, usize)],
    ) {
        let t = process.count() - 1;
        let scale = process.log_likelihood_scale();
        let mu_hat = likelihood.latest_mu_hat();
        let mu_null_hat = likelihood.latest_mu_hat0();
        let mu_alt_hat = mu_hat.max(self.model.smallest_alt_mu());

        if !self.ticked {
            for &(i, j) in active {
                let guess_null = *self.guess_null.get(i, j);
                let guess_alt = *self.guess_alt.get(i, j);
                *self.init_null.get_mut(i, j) = process.log_likelihood_at(t, guess_null, self.model.null_mu());
                *self.init_alt.get_mut(i, j) = match self.flavor {
                    AdaptiveSprtFlavor::Unconstrained | AdaptiveSprtFlavor::Simple => {
                        process.log_likelihood_at(t, guess_alt, self.model.smallest_alt_mu())
                    }
                    AdaptiveSprtFlavor::General => {
                        process.log_likelihood_at(t, guess_alt, self.model.null_mu())
                            - process.unscaled_log_likelihood_between(mu_alt_hat, self.model.null_mu(), t + 1) / scale
                    }
                };
            }
            self.ticked = true;
        } else {
            self.offset_null += process.log_likelihood_at(t, self.delayed_mu_null_estimator, self.model.null_mu());
            match self.flavor {
                AdaptiveSprtFlavor::Unconstrained | AdaptiveSprtFlavor::Simple => {
                    self.offset_alt +=
                        process.log_likelihood_at(t, self.delayed_mu_null_estimator, self.model.smallest_alt_mu());
                }
                AdaptiveSprtFlavor::General => {
                    let up_to = process.count();
                    self.offset_alt = self.offset_null
                        - process.unscaled_log_likelihood_between(mu_alt_hat, self.model.null_mu(), up_to) / scale;
                }
            }
        }

        self.delayed_mu_null_estimator = match self.flavor {
            AdaptiveSprtFlavor::Unconstrained => mu_hat,
            AdaptiveSprtFlavor::Simple | AdaptiveSprtFlavor::General => mu_null_hat,
        };
    }

    fn on_toc(&mut self) {}

    fn do_decide_null(&self, (i, j): (usize, usize)) -> bool {
        *self.init_alt.get(i, j) + self.offset_alt > self.null_thresholds[i]
    }

    fn do_decide_alt(&self, (i, j): (usize, usize)) -> bool {
        *self.init_null.get(i, j) + self.offset_null > self.alt_thresholds[j]
    }

    fn is_design_threshold_independent(&self) -> bool {
        !self.asymptotic_init
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
    fn seed_means_use_shared_crossover_when_asymptotic() {
        let mut rule = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::General, 0.2, 0.8, true);
        rule.on_initialized(&[4.0], &[4.0]);
        let (a, b) = rule.seed_means(0, 0);
        assert!((a - b).abs() < 1e-12);
        assert!((a - 0.5).abs() < 1e-9);
    }

    #[test]
    fn seed_means_use_independent_relative_positions_when_not_asymptotic() {
        let rule = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::Simple, 0.2, 0.8, false);
        let (a, b) = rule.seed_means(0, 0);
        assert!((a - 0.2).abs() < 1e-9);
        assert!((b - 0.8).abs() < 1e-9);
    }

    #[test]
    fn delayed_estimator_uses_raw_mu_hat_only_for_unconstrained() {
        let mut rule = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::Unconstrained, 0.2, 0.8, false);
        rule.on_initialized(&[2.0], &[2.0]);
        rule.on_reset();

        let mut process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 0.3 },
        );
        process.reset(-5.0);
        let mut likelihood = LikelihoodTracker::new(model().null_mu());
        let mut rng = StdRng::seed_from_u64(7);

        process.tic(&mut rng);
        likelihood.tic(&process);
        rule.on_tic(&process, &likelihood, &[(0, 0)]);
        process.tic(&mut rng);
        likelihood.tic(&process);
        rule.on_tic(&process, &likelihood, &[(0, 0)]);

        assert!(rule.delayed_mu_null_estimator < 0.0);
    }

    #[test]
    fn decisions_eventually_fire_for_a_strongly_separated_model() {
        let mut rule = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::Unconstrained, 0.2, 0.8, false);
        rule.on_initialized(&[2.0], &[2.0]);
        rule.on_reset();

        let mut process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 0.3 },
        );
        process.reset(1.0);
        let mut likelihood = LikelihoodTracker::new(model().null_mu());
        let mut rng = StdRng::seed_from_u64(11);

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
        assert!(decided, "adaptive SPRT never crossed a threshold");
    }

    #[test]
    fn general_flavor_overwrites_offset_alt_rather_than_accumulating() {
        let mut rule = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::General, 0.2, 0.8, false);
        rule.on_initialized(&[2.0], &[2.0]);
        rule.on_reset();

        let mut process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 0.3 },
        );
        process.reset(1.0);
        let mut likelihood = LikelihoodTracker::new(model().null_mu());
        let mut rng = StdRng::seed_from_u64(17);

        for _ in 0..50 {
            process.tic(&mut rng);
            likelihood.tic(&process);
            rule.on_tic(&process, &likelihood, &[(0, 0)]);
        }
        let scale = process.log_likelihood_scale();
        let up_to = process.count();
        let mu_alt_hat = likelihood.latest_mu_hat().max(model().smallest_alt_mu());
        let expected = rule.offset_null
            - process.unscaled_log_likelihood_between(mu_alt_hat, model().null_mu(), up_to) / scale;
        assert!((rule.offset_alt - expected).abs() < 1e-9);
    }

    #[test]
    fn threshold_independence_tracks_asymptotic_init() {
        let relative = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::Unconstrained, 0.2, 0.8, false);
        let asymptotic = AdaptiveSprtRule::new(model(), AdaptiveSprtFlavor::Unconstrained, 0.2, 0.8, true);
        assert!(relative.is_design_threshold_independent());
        assert!(!asymptotic.is_design_threshold_independent());
    }
}
