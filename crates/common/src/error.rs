//! Error types shared across camsift crates.

use std::path::PathBuf;

/// Top-level error type for camsift operations.
///
/// Only `Config` is ever surfaced as a hard failure before processing
/// begins; every other class is caught at per-segment or per-incident
/// boundaries, logged, and skipped.
#[derive(Debug, thiserror::Error)]
pub enum CamsiftError {
    #[error("Retrieval error: {message}")]
    Retrieval { message: String },

    #[error("Decode error: {message}")]
    Decode { message: String },

    #[error("Consistency error: {message}")]
    Consistency { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using CamsiftError.
pub type CamsiftResult<T> = Result<T, CamsiftError>;

impl CamsiftError {
    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval {
            message: msg.into(),
        }
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
        }
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }

    /// Whether this error must abort the run instead of being skipped.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_config_is_fatal() {
        assert!(CamsiftError::config("bad threshold").is_fatal());
        assert!(!CamsiftError::retrieval("timed out").is_fatal());
        assert!(!CamsiftError::decode("corrupt segment").is_fatal());
        assert!(!CamsiftError::consistency("duration mismatch").is_fatal());
    }

    #[test]
    fn test_display_carries_message() {
        let err = CamsiftError::decode("segment unreadable");
        assert_eq!(err.to_string(), "Decode error: segment unreadable");
    }
}
