//! Error types for covenant
//!
//! All fallible operations return `Result<T, Error>`.
//! Violations carry the full [`FailureReport`] so callers can inspect
//! position, expected contract and the offending value.

use crate::report::FailureReport;

/// Covenant error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A contract record could not be built (missing return contract,
    /// more than one variadic marker, empty overload set)
    #[error("Construction error: {0}")]
    Construction(String),

    /// An actual argument failed its contract
    #[error("{message}")]
    ArgumentViolation {
        report: Box<FailureReport>,
        message: String,
    },

    /// The guarded callable returned a value that fails the return contract
    #[error("{message}")]
    ReturnViolation {
        report: Box<FailureReport>,
        message: String,
    },

    /// An argument failed a pattern-matching record; the next overload may match
    #[error("{message}")]
    PatternMatch {
        report: Box<FailureReport>,
        message: String,
    },

    /// A post-call invariant no longer holds
    #[error("{message}")]
    InvariantViolation {
        report: Box<FailureReport>,
        message: String,
    },

    /// The guarded callable itself failed
    #[error("Execution error: {0}")]
    Execution(String),

    /// Signature text could not be parsed
    #[error("Parse error at {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },
}

impl Error {
    /// The failure report behind a contract violation, if this is one
    pub fn report(&self) -> Option<&FailureReport> {
        match self {
            Error::ArgumentViolation { report, .. }
            | Error::ReturnViolation { report, .. }
            | Error::PatternMatch { report, .. }
            | Error::InvariantViolation { report, .. } => Some(report),
            _ => None,
        }
    }

    /// True for every kind raised through the failure reporter
    pub fn is_violation(&self) -> bool {
        self.report().is_some()
    }
}

/// Result type alias for covenant operations
pub type Result<T> = std::result::Result<T, Error>;
