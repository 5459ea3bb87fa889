//! The hypothesis model: the null mean and the smallest alternative mean
//! a test is designed to detect, plus the change-of-measure pair used to
//! reweight simulated replications back to an analyzed measure.

use crate::error::Error;
use serde::{Deserialize, Serialize};

/// The pair of hypothesized means `H0: mu = null_mu` vs.
/// `H1: mu >= smallest_alt_mu`.
///
/// `null_mu` must be strictly less than `smallest_alt_mu`; this is
/// validated at construction, mirroring the original's
/// `model<value_type>` invariant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct HypothesisModel {
    #[serde(rename = "null mu", default)]
    null_mu: f64,
    #[serde(rename = "smallest alt mu")]
    smallest_alt_mu: f64,
}

impl HypothesisModel {
    /// Construct a model, validating `null_mu < smallest_alt_mu` and
    /// that both values are finite.
    pub fn new(null_mu: f64, smallest_alt_mu: f64) -> Result<Self, Error> {
        if !null_mu.is_finite() || !smallest_alt_mu.is_finite() {
            return Err(Error::Configuration(
                "hypothesis model means must be finite".to_string(),
            ));
        }
        if null_mu >= smallest_alt_mu {
            return Err(Error::Configuration(format!(
                "null mu ({null_mu}) must be strictly less than smallest alt mu ({smallest_alt_mu})"
            )));
        }
        Ok(HypothesisModel {
            null_mu,
            smallest_alt_mu,
        })
    }

    pub fn null_mu(&self) -> f64 {
        self.null_mu
    }

    pub fn smallest_alt_mu(&self) -> f64 {
        self.smallest_alt_mu
    }

    /// Linear interpolation between the two hypothesized means: `p = 0`
    /// maps to `null_mu`, `p = 1` maps to `smallest_alt_mu`.
    pub fn mu_relative(&self, p: f64) -> f64 {
        (1.0 - p) * self.null_mu + p * self.smallest_alt_mu
    }

    /// Inverse of [`mu_relative`](Self::mu_relative): the relative
    /// position of `mu` along the null-to-alt axis.
    pub fn where_(&self, mu: f64) -> f64 {
        (mu - self.null_mu) / (self.smallest_alt_mu - self.null_mu)
    }

    pub fn is_null(&self, theta: f64) -> bool {
        theta == self.null_mu
    }

    pub fn is_alt(&self, theta: f64) -> bool {
        theta >= self.smallest_alt_mu
    }
}

/// The pair of means (simulated-under, analyzed-under) driving the
/// change-of-measure correction applied at `toc`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct ChangeOfMeasure {
    pub simulated: f64,
    pub analyzed: f64,
}

impl ChangeOfMeasure {
    pub fn new(simulated: f64, analyzed: f64) -> Self {
        ChangeOfMeasure { simulated, analyzed }
    }

    /// True when simulated and analyzed measures coincide, in which
    /// case the correction factor is exactly 1 and can be skipped.
    pub fn is_identity(&self) -> bool {
        self.simulated == self.analyzed
    }
}
