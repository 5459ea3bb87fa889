//! The four operating characteristics the simulator estimates, and the
//! result-file variable names associated with each.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An operating characteristic being estimated by Monte-Carlo simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub enum OperatingCharacteristic {
    /// Expected sample size under the null hypothesis.
    EssUnderNull,
    /// Expected sample size under the alternative hypothesis.
    EssUnderAlt,
    /// Probability of a false alarm (deciding alt when null is true).
    ProbabilityOfFalseAlarm,
    /// Probability of a missed signal (deciding null when alt is true).
    ProbabilityOfMissedSignal,
}

impl OperatingCharacteristic {
    /// The pair of result-file variable names `(expected_value, variance)`
    /// this characteristic is written under.
    pub fn mat_var_names(&self) -> (&'static str, &'static str) {
        match self {
            OperatingCharacteristic::EssUnderNull => ("ess_null", "vss_null"),
            OperatingCharacteristic::EssUnderAlt => ("ess_alt", "vss_alt"),
            OperatingCharacteristic::ProbabilityOfFalseAlarm => ("pfa", "vfa"),
            OperatingCharacteristic::ProbabilityOfMissedSignal => ("pms", "vms"),
        }
    }

    fn canonical_str(&self) -> &'static str {
        match self {
            OperatingCharacteristic::EssUnderNull => "ess null",
            OperatingCharacteristic::EssUnderAlt => "ess alt",
            OperatingCharacteristic::ProbabilityOfFalseAlarm => "pfa",
            OperatingCharacteristic::ProbabilityOfMissedSignal => "pms",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', " ");
        match normalized.as_str() {
            "ess null" | "vss null" | "ss null" => Some(OperatingCharacteristic::EssUnderNull),
            "ess alt" | "vss alt" | "ss alt" => Some(OperatingCharacteristic::EssUnderAlt),
            "pfa" | "vfa" | "fa" => Some(OperatingCharacteristic::ProbabilityOfFalseAlarm),
            "pms" | "vms" | "ms" => Some(OperatingCharacteristic::ProbabilityOfMissedSignal),
            _ => None,
        }
    }
}

impl fmt::Display for OperatingCharacteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_str())
    }
}

impl TryFrom<String> for OperatingCharacteristic {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        OperatingCharacteristic::parse(&value)
            .ok_or_else(|| format!("operating characteristic not recognized: {value:?}"))
    }
}

impl From<OperatingCharacteristic> for String {
    fn from(value: OperatingCharacteristic) -> Self {
        value.canonical_str().to_string()
    }
}
