use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReviewError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Claim '{claim_id}' not found")]
    ClaimNotFound { claim_id: String },

    #[error("Model backend unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Model backend timed out after {after_secs}s")]
    ModelTimeout { after_secs: u64 },

    #[error("Model response invalid: {0}")]
    ModelResponseInvalid(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReviewError {
    /// Stable classification used when a failure is recorded in a batch entry.
    pub fn kind(&self) -> FailureKind {
        match self {
            ReviewError::ClaimNotFound { .. } => FailureKind::ClaimNotFound,
            ReviewError::ModelUnavailable(_) => FailureKind::ModelUnavailable,
            ReviewError::ModelTimeout { .. } => FailureKind::ModelTimeout,
            ReviewError::ModelResponseInvalid(_) => FailureKind::ModelResponseInvalid,
            ReviewError::Database(_) => FailureKind::Storage,
            ReviewError::Serialization(_) | ReviewError::Config(_) | ReviewError::Other(_) => {
                FailureKind::Internal
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ClaimNotFound,
    ModelUnavailable,
    ModelTimeout,
    ModelResponseInvalid,
    Storage,
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::ClaimNotFound => "claim not found",
            FailureKind::ModelUnavailable => "model unavailable",
            FailureKind::ModelTimeout => "model timed out",
            FailureKind::ModelResponseInvalid => "model response invalid",
            FailureKind::Storage => "storage error",
            FailureKind::Internal => "internal error",
        };
        f.write_str(label)
    }
}

pub type ReviewResult<T> = Result<T, ReviewError>;
