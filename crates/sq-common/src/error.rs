//! Error types shared across the simulator.
//!
//! Three kinds of failure can propagate out of this system:
//! - [`Error::Configuration`]: a config file is malformed or its values
//!   violate an invariant (bad ordering, non-finite value, empty array).
//! - [`Error::Invariant`]: the simulation core detected an internal
//!   inconsistency (a lifecycle transition out of order, a tic-count
//!   desync, a rule that reached `toc` without deciding). These never
//!   happen under correct use; they propagate rather than panic so the
//!   driver can log and exit cleanly instead of aborting the process.
//! - [`Error::Resource`]: an output file could not be written.
//!
//! Numerical warnings (a clipped negative variance, a degenerate
//! threshold) are not represented here: they are absorbed silently at
//! the point of occurrence, per the accumulator's own clipping rules.

use thiserror::Error;

/// Result type alias used throughout the simulator.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the simulator.
#[derive(Error, Debug)]
pub enum Error {
    /// A configuration document is malformed or fails validation.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// JSON parsing of a configuration document failed.
    #[error("failed to parse configuration: {0}")]
    ConfigurationJson(#[from] serde_json::Error),

    /// An internal invariant was violated by the simulation core.
    ///
    /// `component` names the offending module (e.g. `"two_sprt_grid"`),
    /// `cell` pinpoints the threshold-grid cell if the failure is
    /// cell-scoped.
    #[error("invariant violated in {component}: {detail}")]
    Invariant {
        component: &'static str,
        detail: String,
        cell: Option<(usize, usize)>,
    },

    /// An output file could not be written. Scoped to a single run;
    /// does not abort the remaining runs in a config.
    #[error("failed to write output for run {run}: {source}")]
    Resource {
        run: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Construct an [`Error::Invariant`] with no cell context.
    pub fn invariant(component: &'static str, detail: impl Into<String>) -> Self {
        Error::Invariant {
            component,
            detail: detail.into(),
            cell: None,
        }
    }

    /// Construct an [`Error::Invariant`] scoped to a grid cell.
    pub fn invariant_at(component: &'static str, detail: impl Into<String>, cell: (usize, usize)) -> Self {
        Error::Invariant {
            component,
            detail: detail.into(),
            cell: Some(cell),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_without_cell_formats_without_cell() {
        let err = Error::invariant("two_sprt_grid", "tic count desync");
        assert_eq!(
            err.to_string(),
            "invariant violated in two_sprt_grid: tic count desync"
        );
    }

    #[test]
    fn invariant_at_carries_cell() {
        let err = Error::invariant_at("two_sprt_grid", "neither decision fired at toc", (2, 3));
        match err {
            Error::Invariant { cell, .. } => assert_eq!(cell, Some((2, 3))),
            _ => panic!("expected Invariant"),
        }
    }

    #[test]
    fn configuration_json_wraps_serde_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::ConfigurationJson(_)));
    }
}
