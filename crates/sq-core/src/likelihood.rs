//! Tracks the running unconstrained and null-constrained MLE sequences
//! a rule's decision statistics are built from.

use crate::process::ObservationProcess;

pub struct LikelihoodTracker {
    null_mu: f64,
    unconstrained: Vec<f64>,
    constrained: Vec<f64>,
}

impl LikelihoodTracker {
    pub fn new(null_mu: f64) -> Self {
        LikelihoodTracker {
            null_mu,
            unconstrained: Vec::new(),
            constrained: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.unconstrained.clear();
        self.constrained.clear();
    }

    /// Append this tic's unconstrained estimate `mu_hat` and its
    /// null-floored counterpart `mu_hat0 = max(mu_hat, null_mu)`.
    pub fn tic(&mut self, process: &ObservationProcess) {
        let mu_hat = process.estimate_mu();
        self.unconstrained.push(mu_hat);
        self.constrained.push(mu_hat.max(self.null_mu));
    }

    pub fn len(&self) -> usize {
        self.unconstrained.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unconstrained.is_empty()
    }

    /// The unconstrained estimate at tic `t`, or the null mean before
    /// any observation has been made.
    pub fn mu_hat(&self, t: usize) -> f64 {
        self.unconstrained.get(t).copied().unwrap_or(self.null_mu)
    }

    /// The null-floored estimate at tic `t`.
    pub fn mu_hat0(&self, t: usize) -> f64 {
        self.constrained.get(t).copied().unwrap_or(self.null_mu)
    }

    pub fn latest_mu_hat(&self) -> f64 {
        self.unconstrained.last().copied().unwrap_or(self.null_mu)
    }

    pub fn latest_mu_hat0(&self) -> f64 {
        self.constrained.last().copied().unwrap_or(self.null_mu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use sq_config::{NoiseConfig, SignalConfig};

    #[test]
    fn mu_hat0_floors_at_null_mu() {
        let mut process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 1.0 },
        );
        process.reset(-5.0);
        let mut rng = StdRng::seed_from_u64(1);
        let mut tracker = LikelihoodTracker::new(0.0);
        for _ in 0..50 {
            process.tic(&mut rng);
            tracker.tic(&process);
        }
        assert!(tracker.latest_mu_hat() < 0.0);
        assert_eq!(tracker.latest_mu_hat0(), 0.0);
    }

    #[test]
    fn reset_clears_recorded_sequences() {
        let mut tracker = LikelihoodTracker::new(0.0);
        let process = ObservationProcess::new(
            SignalConfig::Constant { level: 1.0 },
            &NoiseConfig::White { sigma: 1.0 },
        );
        tracker.tic(&process);
        assert_eq!(tracker.len(), 1);
        tracker.reset();
        assert!(tracker.is_empty());
    }
}
