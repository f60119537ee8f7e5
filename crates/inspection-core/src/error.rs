//! Error types for fetching and configuration

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message shown in place of the result views after a failed fetch
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch restaurant violations";

/// Which class of failure a [`FetchError`] belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Transport,
    Status,
    Malformed,
}

/// Errors raised while talking to the dataset endpoint
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Dataset endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response shape: {0}")]
    Malformed(String),
}

impl FetchError {
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::Transport(_) => FailureKind::Transport,
            FetchError::Status { .. } => FailureKind::Status,
            FetchError::Malformed(_) => FailureKind::Malformed,
        }
    }

    /// Every failure collapses to the same user-visible message
    pub fn user_message(&self) -> &'static str {
        FETCH_FAILED_MESSAGE
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::Malformed(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Malformed(err.to_string())
    }
}

/// Errors raised while loading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Unknown filter strategy: {0} (expected remote or local)")]
    UnknownStrategy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_shares_one_message() {
        let errors = [
            FetchError::Transport("connection reset".into()),
            FetchError::Status {
                status: 503,
                body: "busy".into(),
            },
            FetchError::Malformed("missing count".into()),
        ];
        for err in &errors {
            assert_eq!(err.user_message(), FETCH_FAILED_MESSAGE);
        }
        assert_eq!(errors[1].kind(), FailureKind::Status);
    }

    #[test]
    fn test_json_errors_are_malformed() {
        let err: FetchError = serde_json::from_str::<u64>("\"x\"").unwrap_err().into();
        assert_eq!(err.kind(), FailureKind::Malformed);
    }
}
