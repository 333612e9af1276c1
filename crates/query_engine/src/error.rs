use std::path::PathBuf;

use shared::error::{ErrorCode, GatewayError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("could not read {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{format} files are not supported by this engine ({}); supported formats: csv, tsv, json", .path.display())]
    UnsupportedFormat { path: PathBuf, format: String },
    #[error("could not parse {}: {detail}", .path.display())]
    Malformed { path: PathBuf, detail: String },
    #[error("{0}")]
    Query(String),
    #[error("invalid url '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },
    #[error("download failed: {0}")]
    Network(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("engine failure: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Unreadable { .. } => ErrorCode::Unreadable,
            Self::UnsupportedFormat { .. } => ErrorCode::UnsupportedFormat,
            Self::Malformed { .. } => ErrorCode::Malformed,
            Self::Query(_) => ErrorCode::Query,
            Self::InvalidUrl { .. } => ErrorCode::InvalidUrl,
            Self::Network(_) => ErrorCode::Network,
            Self::Io { .. } => ErrorCode::Io,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(db) => Self::Query(db.message().to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<EngineError> for GatewayError {
    fn from(value: EngineError) -> Self {
        GatewayError::new(value.code(), value.to_string())
    }
}
