//! Infrastructure failures that are not tied to a single request.

use thiserror::Error;

/// Process-level infrastructure errors. Request-scoped transport failures
/// live in [`crate::infra::http::ApiError`] instead.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("could not initialize telemetry: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
