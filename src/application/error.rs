use thiserror::Error;

use crate::cache::QueryError;
use crate::config::LoadError;
use crate::infra::error::InfraError;
use crate::infra::http::ApiError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    /// Process exit code: configuration and argument problems exit with 2,
    /// runtime failures with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 2,
            AppError::Query(QueryError::InvalidArgs { .. }) => 2,
            _ => 1,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unexpected(format!("could not encode output: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_failures_exit_with_a_usage_code() {
        let err = AppError::from(LoadError::Invalid {
            key: "api.base_url",
            reason: "not a url".to_string(),
        });
        assert_eq!(err.exit_code(), 2);

        let bad_args = AppError::Query(QueryError::invalid_args(
            "posts.delete",
            "expected a post id",
        ));
        assert_eq!(bad_args.exit_code(), 2);

        assert_eq!(
            AppError::Unexpected("wire fell out".to_string()).exit_code(),
            1,
            "runtime failures exit with 1"
        );
    }
}
