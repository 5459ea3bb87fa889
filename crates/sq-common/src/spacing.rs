//! Threshold spacing strategies: how a run descriptor's `[from, to]`
//! threshold range expands into `count` concrete threshold values.

use serde::{Deserialize, Serialize};

/// How threshold values are distributed across a `[from, to]` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    /// Evenly spaced, inclusive of both endpoints.
    Linear,
    /// Evenly spaced in log-space; both endpoints must be positive.
    Logarithmic,
    /// Convexly skewed toward `from`, via `(e^k - 1) / (e - 1)` for `k`
    /// linear in `[0, 1]` — the complement of logarithmic spacing.
    Exponential,
}

impl Spacing {
    /// Expand `[from, to]` into `count` values under this spacing.
    ///
    /// `count` of 0 yields an empty vector; `count` of 1 yields `[from]`.
    pub fn expand(&self, from: f64, to: f64, count: usize) -> Vec<f64> {
        if count == 0 {
            return Vec::new();
        }
        if count == 1 {
            return vec![from];
        }
        let denom = (count - 1) as f64;
        match self {
            Spacing::Linear => (0..count)
                .map(|i| from + (to - from) * (i as f64) / denom)
                .collect(),
            Spacing::Logarithmic => {
                let (log_from, log_to) = (from.ln(), to.ln());
                (0..count)
                    .map(|i| (log_from + (log_to - log_from) * (i as f64) / denom).exp())
                    .collect()
            }
            Spacing::Exponential => {
                let scale = (std::f64::consts::E - 1.0).recip();
                (0..count)
                    .map(|i| {
                        let k = (i as f64) / denom;
                        from + (to - from) * (k.exp() - 1.0) * scale
                    })
                    .collect()
            }
        }
    }
}
