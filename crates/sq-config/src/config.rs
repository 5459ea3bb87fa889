//! The top-level configuration document: everything read once at
//! startup from `./config.json`.

use crate::noise::NoiseConfig;
use crate::rule_design::RuleDesign;
use crate::run::RunDescriptor;
use crate::signal::SignalConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sq_common::{expand_homedir, Error, Result};
use std::path::PathBuf;

fn default_mat_output() -> String {
    "./mat/".to_string()
}

fn default_simulations() -> usize {
    1_000
}

fn default_threads() -> usize {
    1
}

fn default_limiting_observations() -> usize {
    1_000
}

fn default_limiting_cutoff_time() -> usize {
    5_000
}

/// The full configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    #[serde(rename = "mat output", default = "default_mat_output")]
    mat_output: String,
    #[serde(rename = "simulations", default = "default_simulations")]
    simulations: usize,
    #[serde(rename = "threads", default = "default_threads")]
    threads: usize,
    signal: SignalConfig,
    noise: NoiseConfig,
    #[serde(rename = "disable oc pass", default)]
    disable_oc_pass: bool,
    #[serde(rename = "disable gray pass", default)]
    disable_gray_pass: bool,
    #[serde(rename = "limiting distribution only", default)]
    limiting_distribution_only: bool,
    #[serde(
        rename = "limiting observations",
        default = "default_limiting_observations"
    )]
    limiting_observations: usize,
    #[serde(
        rename = "limiting cutoff time",
        default = "default_limiting_cutoff_time"
    )]
    limiting_cutoff_time: usize,
    #[serde(rename = "rules")]
    rule_designs: Vec<RuleDesign>,
    runs: Vec<RunDescriptor>,
}

impl Config {
    /// The result-file output directory, with `~` expanded against
    /// `HOME`/`USERPROFILE`.
    pub fn mat_output_path(&self) -> std::path::PathBuf {
        expand_homedir(&self.mat_output)
    }

    pub fn simulations(&self) -> usize {
        self.simulations
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn signal(&self) -> &SignalConfig {
        &self.signal
    }

    pub fn noise(&self) -> &NoiseConfig {
        &self.noise
    }

    pub fn disable_oc_pass(&self) -> bool {
        self.disable_oc_pass
    }

    pub fn disable_gray_pass(&self) -> bool {
        self.disable_gray_pass
    }

    pub fn limiting_distribution_only(&self) -> bool {
        self.limiting_distribution_only
    }

    pub fn limiting_observations(&self) -> usize {
        self.limiting_observations
    }

    pub fn limiting_cutoff_time(&self) -> usize {
        self.limiting_cutoff_time
    }

    pub fn rule_designs(&self) -> &[RuleDesign] {
        &self.rule_designs
    }

    pub fn runs(&self) -> &[RunDescriptor] {
        &self.runs
    }

    pub fn rule_design_by_id(&self, id: usize) -> Result<&RuleDesign> {
        self.rule_designs
            .iter()
            .find(|design| design.id() == id)
            .ok_or_else(|| Error::Configuration(format!("rule design with id {id} not found")))
    }

    /// Parse a configuration document from JSON text and validate it.
    pub fn parse(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        crate::validate::validate(&config)?;
        Ok(config)
    }

    /// Read and parse a configuration document from a file path.
    pub fn read_from(path: &std::path::Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| Error::Resource {
            run: path.display().to_string(),
            source,
        })?;
        Config::parse(&text)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            mat_output: default_mat_output(),
            simulations: default_simulations(),
            threads: default_threads(),
            signal: SignalConfig::Constant { level: 1.0 },
            noise: NoiseConfig::White { sigma: 1.0 },
            disable_oc_pass: false,
            disable_gray_pass: false,
            limiting_distribution_only: false,
            limiting_observations: default_limiting_observations(),
            limiting_cutoff_time: default_limiting_cutoff_time(),
            rule_designs: Vec::new(),
            runs: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = Config::default();
        assert_eq!(config.simulations(), 1_000);
        assert_eq!(config.threads(), 1);
        assert_eq!(config.limiting_observations(), 1_000);
        assert_eq!(config.limiting_cutoff_time(), 5_000);
        assert_eq!(config.mat_output_path(), PathBuf::from("./mat/"));
    }

    #[test]
    fn omitted_optional_fields_fall_back_to_defaults() {
        let json = r#"{
            "signal": {"type": "constant", "level": 1.0},
            "noise": {"type": "white", "sigma": 1.0},
            "rules": [],
            "runs": []
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.simulations(), 1_000);
        assert_eq!(config.mat_output, "./mat/");
    }

    #[test]
    fn rule_design_by_id_finds_a_matching_design() {
        let json = r#"{
            "signal": {"type": "constant", "level": 1.0},
            "noise": {"type": "white", "sigma": 1.0},
            "rules": [{
                "type": "double sprt",
                "id": 5,
                "relative mu intermediate": 0.5,
                "asymptotic init": true,
                "huffman": false
            }],
            "runs": []
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.rule_design_by_id(5).is_ok());
        assert!(config.rule_design_by_id(6).is_err());
    }
}
