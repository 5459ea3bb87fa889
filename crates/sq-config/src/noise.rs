//! Noise configuration: the stochastic component added to a signal to
//! produce an observation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sq_common::{Error, Result};

/// A noise generator's recipe, as read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NoiseConfig {
    /// Independent `N(0, sigma^2)` samples.
    White { sigma: f64 },
    /// `v(t) = w(t) + sum_i rho[i] * v(t - 1 - i)`, with the embedded
    /// `white` noise driving `w(t)`.
    Autoregressive {
        white: Box<NoiseConfig>,
        rho: Vec<f64>,
    },
}

impl NoiseConfig {
    /// Validate finiteness, `sigma > 0`, and that the autoregressive
    /// coefficients lie inside the open unit sphere (`sum(rho^2) < 1`),
    /// the stationarity condition the original requires.
    pub fn validate(&self) -> Result<()> {
        match self {
            NoiseConfig::White { sigma } => {
                if !sigma.is_finite() || *sigma <= 0.0 {
                    return Err(Error::Configuration(
                        "white noise sigma must be finite and positive".to_string(),
                    ));
                }
                Ok(())
            }
            NoiseConfig::Autoregressive { white, rho } => {
                white.validate()?;
                if rho.iter().any(|x| !x.is_finite()) {
                    return Err(Error::Configuration(
                        "autoregressive coefficients must be finite".to_string(),
                    ));
                }
                let sum_of_squares: f64 = rho.iter().map(|x| x * x).sum();
                if sum_of_squares >= 1.0 {
                    return Err(Error::Configuration(format!(
                        "autoregressive coefficients must satisfy sum(rho^2) < 1, got {sum_of_squares}"
                    )));
                }
                Ok(())
            }
        }
    }
}
