use thiserror::Error;

/// Result type for analysis setup
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while building the heuristic catalog.
///
/// Scoring itself never fails: degenerate input produces low scores instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// A catalog pattern failed to compile
    #[error("Invalid catalog pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

impl AnalysisError {
    pub fn invalid_pattern(pattern: &str, source: regex::Error) -> Self {
        Self::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        }
    }
}
