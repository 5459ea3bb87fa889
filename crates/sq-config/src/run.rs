//! Run descriptors: one `model` plus a threshold grid recipe and the
//! set of rule instantiations to evaluate against it.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sq_common::{ChangeOfMeasure, Error, HypothesisModel, Result, Spacing};

/// How many null and alt thresholds to generate for a run's grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ThresholdCount {
    pub null: usize,
    pub alt: usize,
}

/// An inclusive `[from, to]` range a threshold axis is expanded over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThresholdRange {
    pub from: f64,
    pub to: f64,
}

impl ThresholdRange {
    fn validate(&self, axis: &str) -> Result<()> {
        if !self.from.is_finite() || !self.to.is_finite() {
            return Err(Error::Configuration(format!(
                "{axis} threshold range bounds must be finite"
            )));
        }
        if self.from > self.to {
            return Err(Error::Configuration(format!(
                "{axis} threshold range 'from' ({}) must not exceed 'to' ({})",
                self.from, self.to
            )));
        }
        Ok(())
    }
}

/// The null and alt threshold ranges a single rule init expands over.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ThresholdRangePair {
    pub null: ThresholdRange,
    pub alt: ThresholdRange,
}

/// One instantiation of a rule design against a run's threshold grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RuleInit {
    pub id: usize,
    #[serde(rename = "threshold range")]
    pub threshold_range: ThresholdRangePair,
    #[serde(rename = "anticipated run length")]
    pub anticipated_run_length: f64,
}

/// A single Monte Carlo run: one hypothesis model, one threshold grid
/// recipe, the signal strengths to evaluate operating characteristics
/// under, and the rule designs to instantiate against the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunDescriptor {
    pub model: HypothesisModel,
    #[serde(rename = "threshold spacing")]
    pub threshold_spacing: Spacing,
    #[serde(rename = "threshold count")]
    pub threshold_count: ThresholdCount,
    #[serde(rename = "signal strengths")]
    pub signal_strengths: Vec<ChangeOfMeasure>,
    pub inits: Vec<RuleInit>,
}

impl RunDescriptor {
    /// Validate threshold ranges and counts, and that every init
    /// references a nonempty grid (spec: empty threshold arrays at
    /// initialize is a configuration error).
    pub fn validate(&self) -> Result<()> {
        if self.threshold_count.null == 0 || self.threshold_count.alt == 0 {
            return Err(Error::Configuration(
                "threshold count for null and alt axes must both be positive".to_string(),
            ));
        }
        if self.inits.is_empty() {
            return Err(Error::Configuration(
                "a run must declare at least one rule init".to_string(),
            ));
        }
        for init in &self.inits {
            init.threshold_range.null.validate("null")?;
            init.threshold_range.alt.validate("alt")?;
            if !init.anticipated_run_length.is_finite() || init.anticipated_run_length <= 0.0 {
                return Err(Error::Configuration(format!(
                    "anticipated run length for init {} must be finite and positive",
                    init.id
                )));
            }
        }
        for strength in &self.signal_strengths {
            if !strength.analyzed.is_finite() || !strength.simulated.is_finite() {
                return Err(Error::Configuration(
                    "signal strengths must be finite".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Expand a rule init's threshold ranges into concrete null and
    /// alt threshold vectors, per this run's spacing and counts.
    pub fn expand_thresholds(&self, init: &RuleInit) -> (Vec<f64>, Vec<f64>) {
        let null = self.threshold_spacing.expand(
            init.threshold_range.null.from,
            init.threshold_range.null.to,
            self.threshold_count.null,
        );
        let alt = self.threshold_spacing.expand(
            init.threshold_range.alt.from,
            init.threshold_range.alt.to,
            self.threshold_count.alt,
        );
        (null, alt)
    }
}
