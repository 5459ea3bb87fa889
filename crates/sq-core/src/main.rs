//! Entry point: read `./config.json`, run every configured Monte-Carlo
//! simulation, and write one result directory per run.
//!
//! Takes no arguments. Logs a single-line record per event to stderr
//! and exits `0` on success, nonzero otherwise.

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sq_common::{Error, HypothesisModel, OperatingCharacteristic};
use sq_config::{Config, RunDescriptor};
use sq_core::exit_codes::ExitCode;
use sq_core::grid::ThresholdGrid;
use sq_core::oc_simulator;
use sq_core::process::ObservationProcess;
use sq_core::rules::RuleEngine;
use sq_telemetry::RuleInitResult;
use std::path::Path;

const CONFIG_PATH: &str = "./config.json";

/// Runs the configured Monte-Carlo simulations and writes one result
/// directory per run. Takes no arguments beyond `--help`/`--version`;
/// all configuration is read from `./config.json`.
#[derive(Parser)]
#[command(version, about)]
struct Cli;

/// Upper bound on a single replication's run length before it is
/// treated as a violated invariant rather than a slow convergence.
const MAX_RUN_LENGTH: usize = 1_000_000;

const STANDARD_CHARACTERISTICS: [OperatingCharacteristic; 4] = [
    OperatingCharacteristic::EssUnderNull,
    OperatingCharacteristic::EssUnderAlt,
    OperatingCharacteristic::ProbabilityOfFalseAlarm,
    OperatingCharacteristic::ProbabilityOfMissedSignal,
];

/// Turn a hypothesis model into the result directory's canonical
/// model-derived name: `null<value>_alt<value>`, with `.`/`-` replaced
/// so it is filesystem-safe.
fn canonical_model_name(model: &HypothesisModel) -> String {
    let sanitize = |x: f64| {
        format!("{x}")
            .chars()
            .map(|c| match c {
                '-' => 'n',
                '.' => 'p',
                other => other,
            })
            .collect::<String>()
    };
    format!("null{}_alt{}", sanitize(model.null_mu()), sanitize(model.smallest_alt_mu()))
}

fn run_one(run_index: usize, run: &RunDescriptor, config: &Config) -> sq_common::Result<()> {
    run.validate()?;

    let run_id = format!("run-{run_index}");
    let mut seeder = StdRng::from_os_rng();

    let mut results = Vec::with_capacity(run.inits.len());

    for init in &run.inits {
        let design = config.rule_design_by_id(init.id)?;
        design.validate()?;

        let (b_null, b_alt) = run.expand_thresholds(init);
        if b_null.is_empty() || b_alt.is_empty() {
            return Err(Error::Configuration(format!(
                "rule init {} produced an empty threshold axis",
                init.id
            )));
        }

        let characteristics = if config.disable_oc_pass() {
            Vec::new()
        } else {
            let estimates = oc_simulator::run_all(
                &STANDARD_CHARACTERISTICS,
                || {
                    let rule = RuleEngine::build(design, run.model);
                    let mut grid = ThresholdGrid::new(rule, b_null.clone(), b_alt.clone());
                    grid.initialize();
                    grid
                },
                || ObservationProcess::new(config.signal().clone(), config.noise()),
                &run.model,
                config.threads(),
                config.simulations(),
                MAX_RUN_LENGTH,
                init.anticipated_run_length,
                seeder.random(),
            )?;
            estimates
                .into_iter()
                .map(|e| (e.characteristic, e.mean, e.variance))
                .collect()
        };

        results.push(RuleInitResult {
            rule_id: design.id() as u64,
            rule_init_id: init.id as u64,
            mu_null: run.model.null_mu(),
            mu_alt: run.model.smallest_alt_mu(),
            b_null,
            b_alt,
            characteristics,
        });
    }

    if config.disable_gray_pass() {
        tracing::debug!(run = %run_id, "gray pass disabled, skipping signal-strength sweep");
    }

    let mat_output = config.mat_output_path();
    let canonical_model = canonical_model_name(&run.model);
    match sq_telemetry::write_run(&mat_output, &canonical_model, &run_id, &results) {
        Ok(dir) => {
            tracing::info!(run = %run_id, path = %dir.display(), "wrote result files");
            Ok(())
        }
        Err(err) => {
            tracing::error!(run = %run_id, error = %err, "failed to write result files for this run");
            Err(Error::Resource {
                run: run_id,
                source: std::io::Error::other(err.to_string()),
            })
        }
    }
}

fn run(config: &Config) -> ExitCode {
    let mut worst = ExitCode::Success;
    for (index, run) in config.runs().iter().enumerate() {
        match run_one(index, run, config) {
            Ok(()) => {}
            Err(err @ Error::Resource { .. }) => {
                tracing::error!(error = %err, "run failed with a resource error, continuing with remaining runs");
                worst = ExitCode::ResourceError;
            }
            Err(err @ Error::Invariant { .. }) => {
                tracing::error!(error = %err, "run aborted on a violated invariant");
                return ExitCode::InvariantError;
            }
            Err(err) => {
                tracing::error!(error = %err, "run aborted on a configuration error");
                return ExitCode::ConfigurationError;
            }
        }
    }
    worst
}

fn main() -> std::process::ExitCode {
    Cli::parse();
    sq_core::logging::init();

    let config = match Config::read_from(Path::new(CONFIG_PATH)) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, path = CONFIG_PATH, "failed to read configuration");
            return std::process::ExitCode::from(ExitCode::ConfigurationError.as_i32() as u8);
        }
    };

    let code = run(&config);
    tracing::info!(exit_code = %code, "simulation run complete");
    std::process::ExitCode::from(code.as_i32() as u8)
}
