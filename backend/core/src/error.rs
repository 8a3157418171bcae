use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level error type for the Plugsmith core.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("environment error: {0}")]
    Environment(String),

    #[error("I/O error at {path}: {message}")]
    Io { path: String, message: String },

    #[error("operation may have timed out; outcome unconfirmed: {0}")]
    TimeoutSuspicion(String),

    #[error("plugin '{0}' not found")]
    NotFound(String),

    #[error("plugin '{0}' is already installed")]
    AlreadyExists(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PluginError {
    pub fn io(path: impl std::fmt::Display, err: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.to_string(),
            message: err.to_string(),
        }
    }

    /// Coarse classification carried on results so callers can branch on it.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Environment(_) => ErrorKind::Environment,
            Self::Io { .. } => ErrorKind::Io,
            Self::TimeoutSuspicion(_) => ErrorKind::TimeoutSuspicion,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::Other(_) => ErrorKind::Internal,
        }
    }
}

/// Serializable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Validation,
    Environment,
    Io,
    /// The caller gave up waiting; effects may or may not have landed.
    TimeoutSuspicion,
    NotFound,
    AlreadyExists,
    Internal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_mentions_slug() {
        let err = PluginError::NotFound("demo".into());
        assert_eq!(err.to_string(), "plugin 'demo' not found");
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn kind_serializes_camel_case() {
        let json = serde_json::to_string(&ErrorKind::TimeoutSuspicion).unwrap();
        assert_eq!(json, "\"timeoutSuspicion\"");
    }
}
