//! The observation process `y(t) = true_mu * r(t) + noise(t)`.
//!
//! Maintains running sums `S_ry = sum(r*y)` and `S_rr = sum(r*r)` as a
//! per-tic snapshot array, so the unconstrained MLE and any windowed
//! log-likelihood ratio are O(1) lookups instead of an O(t) replay.

use rand::Rng;
use sq_config::{NoiseConfig, SignalConfig};

use crate::noise::NoiseGenerator;

pub struct ObservationProcess {
    signal: SignalConfig,
    noise: NoiseGenerator,
    sigma_squared: f64,
    true_mu: f64,
    s_ry: Vec<f64>,
    s_rr: Vec<f64>,
}

impl ObservationProcess {
    pub fn new(signal: SignalConfig, noise_config: &NoiseConfig) -> Self {
        let noise = NoiseGenerator::build(noise_config);
        let sigma_squared = noise.innovation_variance();
        ObservationProcess {
            signal,
            noise,
            sigma_squared,
            true_mu: 0.0,
            s_ry: Vec::new(),
            s_rr: Vec::new(),
        }
    }

    /// Begin a fresh replication simulated under `true_mu`.
    pub fn reset(&mut self, true_mu: f64) {
        self.true_mu = true_mu;
        self.noise.reset();
        self.s_ry.clear();
        self.s_rr.clear();
    }

    /// Number of observations drawn so far this replication.
    pub fn count(&self) -> usize {
        self.s_ry.len()
    }

    /// Draw the next observation, extend the running-sum snapshot, and
    /// return the observed value.
    pub fn tic(&mut self, rng: &mut impl Rng) -> f64 {
        let t = self.count();
        let r = self.signal.at(t);
        let y = self.true_mu * r + self.noise.next(rng);

        let prev_ry = self.s_ry.last().copied().unwrap_or(0.0);
        let prev_rr = self.s_rr.last().copied().unwrap_or(0.0);
        self.s_ry.push(prev_ry + r * y);
        self.s_rr.push(prev_rr + r * r);
        y
    }

    /// The unconstrained maximum-likelihood estimate of `mu` over every
    /// observation so far, `0` before the signal has accumulated any
    /// energy (`S_rr == 0`).
    pub fn estimate_mu(&self) -> f64 {
        match self.s_rr.last() {
            Some(rr) if *rr > 0.0 => self.s_ry.last().copied().unwrap_or(0.0) / rr,
            _ => 0.0,
        }
    }

    /// The unscaled (not divided by the noise variance) log-likelihood
    /// ratio of `theta` vs `eta`, accumulated over the first `up_to`
    /// observations. Used directly by the change-of-measure correction,
    /// which applies its own division by [`Self::log_likelihood_scale`].
    pub fn unscaled_log_likelihood_between(&self, theta: f64, eta: f64, up_to: usize) -> f64 {
        if up_to == 0 {
            return 0.0;
        }
        let idx = up_to - 1;
        let s_ry = self.s_ry[idx];
        let s_rr = self.s_rr[idx];
        (theta - eta) * s_ry - 0.5 * (theta * theta - eta * eta) * s_rr
    }

    /// The natural-log-likelihood-ratio contribution of a single
    /// observation at time `t`, already divided by the noise variance.
    pub fn log_likelihood_at(&self, t: usize, theta: f64, eta: f64) -> f64 {
        let upper = self.unscaled_log_likelihood_between(theta, eta, t + 1);
        let lower = self.unscaled_log_likelihood_between(theta, eta, t);
        (upper - lower) / self.sigma_squared
    }

    /// The noise variance dividing an unscaled log-likelihood sum to
    /// produce the natural-log-likelihood-ratio.
    pub fn log_likelihood_scale(&self) -> f64 {
        self.sigma_squared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn process() -> ObservationProcess {
        ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 1.0 },
        )
    }

    #[test]
    fn estimate_mu_is_zero_before_any_signal_energy() {
        let process = process();
        assert_eq!(process.estimate_mu(), 0.0);
    }

    #[test]
    fn estimate_mu_converges_toward_true_mu_over_many_tics() {
        let mut process = process();
        process.reset(2.0);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..20_000 {
            process.tic(&mut rng);
        }
        assert!((process.estimate_mu() - 2.0).abs() < 0.1);
    }

    #[test]
    fn log_likelihood_ratio_favors_the_true_mean() {
        let mut process = process();
        process.reset(1.0);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5_000 {
            process.tic(&mut rng);
        }
        let favor_true =
            process.unscaled_log_likelihood_between(1.0, 0.0, process.count()) / process.log_likelihood_scale();
        assert!(favor_true > 0.0);
    }

    #[test]
    fn reset_clears_accumulated_state() {
        let mut process = process();
        let mut rng = StdRng::seed_from_u64(3);
        process.reset(1.0);
        process.tic(&mut rng);
        process.tic(&mut rng);
        assert_eq!(process.count(), 2);
        process.reset(0.0);
        assert_eq!(process.count(), 0);
    }
}
