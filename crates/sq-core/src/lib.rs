//! Sequential hypothesis testing core library.
//!
//! This crate implements the observation process, the running MLE
//! tracker, the four SPRT decision-rule families, and the Monte-Carlo
//! replication driver that turns a threshold grid plus a
//! change-of-measure pair into estimated operating characteristics.
//!
//! The binary entry point is in `main.rs`.

pub mod exit_codes;
pub mod grid;
pub mod likelihood;
pub mod logging;
pub mod monte_carlo;
pub mod noise;
pub mod oc_simulator;
pub mod process;
pub mod rules;
