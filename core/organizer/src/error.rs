use code_organizer_analysis::AnalysisError;
use code_organizer_schemas::ItemId;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrganizerError>;

/// Errors from setting the organizer up or from malformed requests.
///
/// The scoring and merge engines never return these: degenerate input gives
/// low scores and refused merges come back as `MergeResult { success: false }`.
#[derive(Error, Debug)]
pub enum OrganizerError {
    #[error("Failed to build heuristic catalog: {0}")]
    Catalog(#[from] AnalysisError),

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: String, value: String },

    #[error("Merge candidate refers to {candidate}, request carries {item}")]
    CandidateMismatch { candidate: ItemId, item: ItemId },
}

impl OrganizerError {
    pub fn invalid_env(var: &str, value: &str) -> Self {
        Self::InvalidEnv {
            var: var.to_string(),
            value: value.to_string(),
        }
    }
}
