//! Signal configuration: the deterministic component of an observation,
//! `r(t)`, before noise is added.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sq_common::{Error, Result};

/// A signal's value-at-time-`t` recipe, as read from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignalConfig {
    /// `r(t) = level` for all `t`.
    Constant { level: f64 },
    /// `r(t) = transition[t]` for `t < transition.len()`, `level`
    /// thereafter.
    Transitionary { level: f64, transition: Vec<f64> },
}

impl SignalConfig {
    /// Validate that every numeric field is finite.
    pub fn validate(&self) -> Result<()> {
        match self {
            SignalConfig::Constant { level } => {
                if !level.is_finite() {
                    return Err(Error::Configuration(
                        "signal level must be finite".to_string(),
                    ));
                }
            }
            SignalConfig::Transitionary { level, transition } => {
                if !level.is_finite() || transition.iter().any(|x| !x.is_finite()) {
                    return Err(Error::Configuration(
                        "signal level and transition values must be finite".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The signal's value at `t`, independent of the interpreter used
    /// downstream to build a runtime `Signal`.
    pub fn at(&self, t: usize) -> f64 {
        match self {
            SignalConfig::Constant { level } => *level,
            SignalConfig::Transitionary { level, transition } => {
                transition.get(t).copied().unwrap_or(*level)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_signal_is_time_invariant() {
        let signal = SignalConfig::Constant { level: 3.0 };
        assert_eq!(signal.at(0), 3.0);
        assert_eq!(signal.at(100), 3.0);
    }

    #[test]
    fn transitionary_signal_follows_transition_then_settles() {
        let signal = SignalConfig::Transitionary {
            level: 3.0,
            transition: vec![7.0, 8.0],
        };
        assert_eq!(signal.at(0), 7.0);
        assert_eq!(signal.at(1), 8.0);
        assert_eq!(signal.at(2), 3.0);
        assert_eq!(signal.at(500), 3.0);
    }

    #[test]
    fn rejects_non_finite_fields() {
        assert!(SignalConfig::Constant { level: f64::NAN }.validate().is_err());
        assert!(SignalConfig::Transitionary {
            level: 1.0,
            transition: vec![f64::INFINITY],
        }
        .validate()
        .is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let signal = SignalConfig::Transitionary {
            level: 1.0,
            transition: vec![0.5, 0.25],
        };
        let json = serde_json::to_string(&signal).unwrap();
        let back: SignalConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(signal, back);
    }
}
