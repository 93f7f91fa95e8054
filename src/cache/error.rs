//! Errors surfaced through cache entries.
//!
//! `QueryError` is cloneable on purpose: a failure is part of the entry's
//! state and travels to every subscriber through snapshots.

use thiserror::Error;

use crate::domain::error::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("network request failed: {0}")]
    Network(String),
    #[error("request failed with status {status}")]
    Status { status: u16 },
    #[error("response transform failed: {0}")]
    Transform(String),
    #[error("entity validation failed: {0}")]
    Validation(String),
    #[error("invalid arguments for endpoint `{endpoint}`: {reason}")]
    InvalidArgs {
        endpoint: &'static str,
        reason: String,
    },
    #[error("unknown {kind} endpoint `{name}`")]
    UnknownEndpoint { kind: &'static str, name: String },
}

impl QueryError {
    pub fn transform(message: impl Into<String>) -> Self {
        Self::Transform(message.into())
    }

    pub fn invalid_args(endpoint: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgs {
            endpoint,
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_query(name: &str) -> Self {
        Self::UnknownEndpoint {
            kind: "query",
            name: name.to_string(),
        }
    }

    pub(crate) fn unknown_mutation(name: &str) -> Self {
        Self::UnknownEndpoint {
            kind: "mutation",
            name: name.to_string(),
        }
    }
}

impl From<DomainError> for QueryError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation { message } => Self::Validation(message),
        }
    }
}
