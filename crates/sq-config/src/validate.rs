//! Semantic validation of a parsed [`Config`], beyond what serde's
//! shape-level deserialization already enforces.

use crate::config::Config;
use sq_common::{Error, HypothesisModel, Result};
use std::collections::HashSet;

/// Validate a configuration document: numeric ranges, signal/noise
/// invariants, rule-design id uniqueness, and that every run's inits
/// reference a declared rule design.
pub fn validate(config: &Config) -> Result<()> {
    if config.simulations() == 0 {
        return Err(Error::Configuration(
            "simulations must be positive".to_string(),
        ));
    }
    if config.threads() == 0 {
        return Err(Error::Configuration("threads must be positive".to_string()));
    }
    if config.limiting_observations() == 0 {
        return Err(Error::Configuration(
            "limiting observations must be positive".to_string(),
        ));
    }
    if config.limiting_cutoff_time() == 0 {
        return Err(Error::Configuration(
            "limiting cutoff time must be positive".to_string(),
        ));
    }

    config.signal().validate()?;
    config.noise().validate()?;

    let mut seen_ids = HashSet::new();
    for design in config.rule_designs() {
        design.validate()?;
        if !seen_ids.insert(design.id()) {
            return Err(Error::Configuration(format!(
                "duplicate rule design id {}",
                design.id()
            )));
        }
    }

    for run in config.runs() {
        HypothesisModel::new(run.model.null_mu(), run.model.smallest_alt_mu())?;
        run.validate()?;
        for init in &run.inits {
            if !config.rule_designs().iter().any(|d| d.id() == init.id) {
                return Err(Error::Configuration(format!(
                    "run init references undeclared rule design id {}",
                    init.id
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn empty_config_is_valid() {
        let config = Config::default();
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn rejects_zero_simulations() {
        let json = r#"{
            "simulations": 0,
            "signal": {"type": "constant", "level": 1.0},
            "noise": {"type": "white", "sigma": 1.0},
            "rules": [],
            "runs": []
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_run_referencing_undeclared_rule_design() {
        let json = r#"{
            "signal": {"type": "constant", "level": 1.0},
            "noise": {"type": "white", "sigma": 1.0},
            "rules": [],
            "runs": [{
                "model": {"null mu": 0.0, "smallest alt mu": 1.0},
                "threshold spacing": "linear",
                "threshold count": {"null": 2, "alt": 2},
                "signal strengths": [],
                "inits": [{
                    "id": 9,
                    "threshold range": {
                        "null": {"from": 1.0, "to": 2.0},
                        "alt": {"from": 1.0, "to": 2.0}
                    },
                    "anticipated run length": 10.0
                }]
            }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_duplicate_rule_design_ids() {
        let json = r#"{
            "signal": {"type": "constant", "level": 1.0},
            "noise": {"type": "white", "sigma": 1.0},
            "rules": [
                {"type": "double sprt", "id": 1, "relative mu intermediate": 0.5, "asymptotic init": true, "huffman": false},
                {"type": "double sprt", "id": 1, "relative mu intermediate": 0.3, "asymptotic init": false, "huffman": true}
            ],
            "runs": []
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(validate(&config).is_err());
    }
}
