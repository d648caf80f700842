use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Schedule,
    Calendar,
    Feed,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Schedule => "schedule",
            Self::Calendar => "calendar",
            Self::Feed => "feed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("{kind} source unavailable: {message}")]
    SourceUnavailable { kind: SourceKind, message: String },
    #[error("{kind} source is malformed: {message}")]
    MalformedSource { kind: SourceKind, message: String },
    #[error("missing {kind} reference '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("time out of range: {0}")]
    TimeOutOfRange(String),
}
