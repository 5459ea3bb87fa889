//! Exit codes for the simulator's CLI.
//!
//! Exit codes communicate the run's outcome without requiring stdout
//! parsing: `0` on a clean run, a configuration error in the 10s (the
//! driver never started simulating), an internal error in the 20s (a
//! violated invariant, or a resource failure that could not be scoped
//! to a single run).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Every run completed and every result file was written.
    Success = 0,

    /// The configuration document was malformed or failed validation.
    ConfigurationError = 10,

    /// An internal invariant was violated during simulation.
    InvariantError = 20,

    /// An output file could not be written and its run's results were
    /// dropped, but the process otherwise completed.
    ResourceError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Success => "OK",
            ExitCode::ConfigurationError => "ERR_CONFIGURATION",
            ExitCode::InvariantError => "ERR_INVARIANT",
            ExitCode::ResourceError => "ERR_RESOURCE",
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_zero() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
    }

    #[test]
    fn failure_codes_are_nonzero() {
        assert_ne!(ExitCode::ConfigurationError.as_i32(), 0);
        assert_ne!(ExitCode::InvariantError.as_i32(), 0);
        assert_ne!(ExitCode::ResourceError.as_i32(), 0);
    }
}
