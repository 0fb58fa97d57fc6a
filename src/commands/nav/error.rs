use thiserror::Error;

/// Conditions the navigator reports to its caller.
///
/// Ambiguous landmark names and exhausted time budgets are not errors: the
/// former resolves to the first match with a warning, the latter flags the
/// route as possibly non-optimal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NavError {
    #[error("no translocator data available; import a waypoint export first")]
    NoGraphData,

    #[error("unknown location `{0}`: expected `x,y` or a landmark name")]
    UnresolvableCoordinate(String),

    #[error("skipping record at line {line}: {reason}")]
    MalformedImportRecord { line: usize, reason: String },
}

impl NavError {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        NavError::MalformedImportRecord { line, reason: reason.into() }
    }
}
