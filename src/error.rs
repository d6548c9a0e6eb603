use thiserror::Error;

/// Failures that stop an operation outright.
///
/// Degraded outcomes (a skipped target, an unseen label, a missing artifact,
/// a failed validation check) are reported as values, never through this type.
#[derive(Debug, Error)]
pub enum WeldError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Training data source error: {0}")]
    DataSource(String),

    #[error("Artifact error: {0}")]
    Artifact(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for WeldError {
    fn from(err: rusqlite::Error) -> Self {
        WeldError::DataSource(err.to_string())
    }
}

impl From<WeldError> for String {
    fn from(err: WeldError) -> Self {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, WeldError>;
