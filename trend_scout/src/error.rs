use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScoutError {
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    UpstreamStatus { url: String, status: u16 },

    #[error("Could not parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("No article content found at {0}")]
    NoContent(String),

    #[error("No news item at rank {0}")]
    UnknownItem(usize),

    #[error("The ranked list has expired or changed; reload it before opening an item")]
    BoardExpired,

    #[error("GOOGLE_API_KEY is not configured")]
    ConfigMissing,

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("Generation service rate limited the request")]
    RateLimited,

    #[error("Generation model `{0}` was not found")]
    ModelNotFound(String),

    #[error("Generation service error: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Stable tag for a failure, so callers can tell "no data" apart from "the call failed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    UpstreamStatus,
    Parse,
    NoContent,
    NotFound,
    Stale,
    ConfigMissing,
    RateLimited,
    ModelNotFound,
    Generation,
    Internal,
}

impl ScoutError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScoutError::Network(_) => FailureKind::Network,
            ScoutError::UpstreamStatus { .. } => FailureKind::UpstreamStatus,
            ScoutError::Parse { .. } => FailureKind::Parse,
            ScoutError::NoContent(_) => FailureKind::NoContent,
            ScoutError::UnknownItem(_) => FailureKind::NotFound,
            ScoutError::BoardExpired => FailureKind::Stale,
            ScoutError::ConfigMissing | ScoutError::InvalidConfig { .. } => {
                FailureKind::ConfigMissing
            }
            ScoutError::RateLimited => FailureKind::RateLimited,
            ScoutError::ModelNotFound(_) => FailureKind::ModelNotFound,
            ScoutError::Generation(_) => FailureKind::Generation,
            ScoutError::Io(_) | ScoutError::Serialization(_) => FailureKind::Internal,
        }
    }

    pub(crate) fn parse(what: &'static str, detail: impl Into<String>) -> Self {
        ScoutError::Parse {
            what,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScoutError>;
