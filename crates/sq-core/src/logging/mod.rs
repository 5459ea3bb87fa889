//! Structured logging for the simulator: a single-line-per-event
//! stderr stream, quiet enough not to interleave with a long Monte
//! Carlo run but detailed enough to diagnose a failed one.
//!
//! stdout is reserved for nothing in this binary (there is no payload
//! to print beyond the result files themselves); stderr receives every
//! log record. Verbosity is controlled by `RUST_LOG`, defaulting to
//! `info`.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber: compact, single-line,
/// non-ANSI records to stderr. Call once at process start.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_does_not_panic_when_called_once() {
        init();
    }
}
