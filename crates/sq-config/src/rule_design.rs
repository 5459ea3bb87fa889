//! Rule design configuration: the tunable parameters of each SPRT
//! family, keyed by an `id` a run's `inits` reference.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sq_common::{Error, Result};

/// Which of the three adaptive-SPRT estimator flavors a design uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdaptiveSprtFlavor {
    General,
    Simple,
    Unconstrained,
}

/// Which of the two generalized-SPRT flavors a design uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GeneralizedSprtFlavor {
    General,
    Cutoff,
}

/// A single rule design: the discriminated parameter set for one of
/// the four SPRT families, identified by `id` for reuse across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleDesign {
    #[serde(rename = "adaptive sprt")]
    AdaptiveSprt {
        id: usize,
        flavor: AdaptiveSprtFlavor,
        #[serde(rename = "relative mu null init")]
        relative_mu_null_init: f64,
        #[serde(rename = "relative mu alt init")]
        relative_mu_alt_init: f64,
        #[serde(rename = "asymptotic init")]
        asymptotic_init: bool,
    },
    #[serde(rename = "double sprt")]
    DoubleSprt {
        id: usize,
        #[serde(rename = "relative mu intermediate")]
        relative_mu_intermediate: f64,
        #[serde(rename = "asymptotic init")]
        asymptotic_init: bool,
        huffman: bool,
    },
    #[serde(rename = "generalized sprt")]
    GeneralizedSprt {
        id: usize,
        flavor: GeneralizedSprtFlavor,
        #[serde(rename = "relative mu cutoff")]
        relative_mu_cutoff: f64,
        #[serde(rename = "asymptotic init")]
        asymptotic_init: bool,
    },
}

impl RuleDesign {
    pub fn id(&self) -> usize {
        match self {
            RuleDesign::AdaptiveSprt { id, .. } => *id,
            RuleDesign::DoubleSprt { id, .. } => *id,
            RuleDesign::GeneralizedSprt { id, .. } => *id,
        }
    }

    /// Validate that every relative-position field lies in `[0, 1]`
    /// (it parameterizes a point on the null-to-alt axis), mirroring
    /// the original design headers' range checks.
    pub fn validate(&self) -> Result<()> {
        let in_unit_interval = |name: &str, x: f64| -> Result<()> {
            if !(0.0..=1.0).contains(&x) {
                return Err(Error::Configuration(format!(
                    "{name} must lie in [0, 1], got {x}"
                )));
            }
            Ok(())
        };
        match self {
            RuleDesign::AdaptiveSprt {
                relative_mu_null_init,
                relative_mu_alt_init,
                ..
            } => {
                in_unit_interval("relative mu null init", *relative_mu_null_init)?;
                in_unit_interval("relative mu alt init", *relative_mu_alt_init)?;
            }
            RuleDesign::DoubleSprt {
                relative_mu_intermediate,
                ..
            } => {
                in_unit_interval("relative mu intermediate", *relative_mu_intermediate)?;
            }
            RuleDesign::GeneralizedSprt {
                relative_mu_cutoff, ..
            } => {
                in_unit_interval("relative mu cutoff", *relative_mu_cutoff)?;
            }
        }
        Ok(())
    }
}
