// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Error Handling
//!
//! A single classified error type for the trainer core. Every failure carries an
//! [`ErrorKind`] so the orchestration layer can decide whether to degrade
//! (persistence) or report (provider, computation) without matching on messages.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Classification of a [`TrainerError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid setup (credentials, paths, profile)
    Configuration,
    /// Biometric provider or other external API failure
    Provider,
    /// Storage read/write failure
    Persistence,
    /// Vector generation failure
    Embedding,
    /// Malformed similarity query
    Query,
    /// Readiness or plan computation failed on invalid input
    AgentGeneration,
}

impl ErrorKind {
    /// Stable machine-readable code for logs
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "CONFIG_ERROR",
            ErrorKind::Provider => "PROVIDER_ERROR",
            ErrorKind::Persistence => "PERSISTENCE_ERROR",
            ErrorKind::Embedding => "EMBEDDING_ERROR",
            ErrorKind::Query => "QUERY_ERROR",
            ErrorKind::AgentGeneration => "AGENT_GENERATION_ERROR",
        }
    }

    /// Whether the pipeline may continue on a local fallback after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::Persistence)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors produced by the trainer core
#[derive(Debug, Error)]
pub enum TrainerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("biometric provider error: {0}")]
    Provider(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    /// Insert of an id that is already stored
    #[error("persistence error: {0} already exists")]
    AlreadyExists(String),

    #[error("embedding error: {0}")]
    Embedding(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("generation error: {0}")]
    AgentGeneration(String),
}

/// Result alias used across the core
pub type TrainerResult<T> = Result<T, TrainerError>;

impl TrainerError {
    /// Kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrainerError::Configuration(_) => ErrorKind::Configuration,
            TrainerError::Provider(_) => ErrorKind::Provider,
            TrainerError::Persistence(_) | TrainerError::AlreadyExists(_) => {
                ErrorKind::Persistence
            }
            TrainerError::Embedding(_) => ErrorKind::Embedding,
            TrainerError::Query(_) => ErrorKind::Query,
            TrainerError::AgentGeneration(_) => ErrorKind::AgentGeneration,
        }
    }

    /// Whether a store may serve this operation from its fallback instead.
    /// Conflicts are not recoverable: the fallback would accept the duplicate.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TrainerError::AlreadyExists(_) => false,
            other => other.kind().is_recoverable(),
        }
    }

    pub fn already_exists(what: impl Into<String>) -> Self {
        TrainerError::AlreadyExists(what.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        TrainerError::Configuration(message.into())
    }

    pub fn provider(message: impl Into<String>) -> Self {
        TrainerError::Provider(message.into())
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        TrainerError::Persistence(message.into())
    }

    pub fn embedding(message: impl Into<String>) -> Self {
        TrainerError::Embedding(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        TrainerError::Query(message.into())
    }

    pub fn generation(message: impl Into<String>) -> Self {
        TrainerError::AgentGeneration(message.into())
    }
}

impl From<sqlx::Error> for TrainerError {
    fn from(err: sqlx::Error) -> Self {
        TrainerError::Persistence(err.to_string())
    }
}

impl From<std::io::Error> for TrainerError {
    fn from(err: std::io::Error) -> Self {
        TrainerError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for TrainerError {
    fn from(err: serde_json::Error) -> Self {
        TrainerError::Persistence(format!("serialization failed: {err}"))
    }
}

impl From<tokio::time::error::Elapsed> for TrainerError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        TrainerError::Persistence("storage call timed out".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(TrainerError::provider("down").kind(), ErrorKind::Provider);
        assert_eq!(TrainerError::query("bad").kind(), ErrorKind::Query);
        assert_eq!(
            TrainerError::generation("score 140").kind(),
            ErrorKind::AgentGeneration
        );
    }

    #[test]
    fn test_only_persistence_is_recoverable() {
        assert!(ErrorKind::Persistence.is_recoverable());
        assert!(!ErrorKind::Provider.is_recoverable());
        assert!(!ErrorKind::AgentGeneration.is_recoverable());
    }

    #[test]
    fn test_conflicts_are_not_recoverable() {
        let err = TrainerError::already_exists("workout_logs record l1");
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(!err.is_recoverable());
        assert!(TrainerError::persistence("locked").is_recoverable());
    }

    #[test]
    fn test_display_includes_message() {
        let err = TrainerError::embedding("model unavailable");
        assert_eq!(err.to_string(), "embedding error: model unavailable");
        assert_eq!(err.kind().to_string(), "EMBEDDING_ERROR");
    }

    #[test]
    fn test_io_errors_classified_as_persistence() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: TrainerError = io.into();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }
}
