use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid session parameter `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("result file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write CSV row: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error("failed to write session summary {}: {source}", .path.display())]
    Summary {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode session summary: {0}")]
    SummaryEncode(#[from] serde_json::Error),
}
