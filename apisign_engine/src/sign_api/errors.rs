use std::fmt::Display;

use thiserror::Error;

/// Failures of the store behind a [`crate::SecretResolver`] or [`crate::SaltLedger`]. Business-expected absence
/// (unknown app, missing permission) is never reported through this type.
#[derive(Debug, Clone, Error)]
pub enum ResolverError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Timed out waiting for the secret store: {0}")]
    Timeout(String),
    #[error("Secret store is misconfigured: {0}")]
    ConfigurationError(String),
}

impl ResolverError {
    /// Whether a caller could reasonably try the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ResolverError::DatabaseError(_) | ResolverError::Timeout(_))
    }
}

impl From<sqlx::Error> for ResolverError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut => ResolverError::Timeout(e.to_string()),
            e => ResolverError::DatabaseError(e.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for ResolverError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        ResolverError::DatabaseError(format!("Migration failed. {e}"))
    }
}

/// The classification of a failed salt or signature operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    Unknown,
    Forbidden,
    Expired,
    Infrastructure,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::InvalidArgument => "InvalidArgument",
            ErrorKind::Unknown => "Unknown",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Expired => "Expired",
            ErrorKind::Infrastructure => "InfrastructureError",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Error)]
pub enum SignApiError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Unknown, inactive or expired caller, or a signature that does not match. Callers can't tell these apart.
    #[error("Unknown caller or invalid signature")]
    Unknown,
    #[error("{app_code} is not permitted to access {api_path}")]
    Forbidden { app_code: String, api_path: String },
    #[error("Expired: {0}")]
    Expired(String),
    #[error(transparent)]
    Infrastructure(#[from] ResolverError),
}

impl SignApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SignApiError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            SignApiError::Unknown => ErrorKind::Unknown,
            SignApiError::Forbidden { .. } => ErrorKind::Forbidden,
            SignApiError::Expired(_) => ErrorKind::Expired,
            SignApiError::Infrastructure(_) => ErrorKind::Infrastructure,
        }
    }

    pub fn forbidden<S: Into<String>>(app_code: S, api_path: S) -> Self {
        SignApiError::Forbidden { app_code: app_code.into(), api_path: api_path.into() }
    }

    pub fn is_infrastructure(&self) -> bool {
        matches!(self, SignApiError::Infrastructure(_))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pool_timeouts_are_retryable() {
        let err = ResolverError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, ResolverError::Timeout(_)));
        assert!(err.is_retryable());
        let err = ResolverError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ResolverError::DatabaseError(_)));
        assert!(!ResolverError::ConfigurationError("x".into()).is_retryable());
    }

    #[test]
    fn error_kinds() {
        assert_eq!(SignApiError::Unknown.kind(), ErrorKind::Unknown);
        assert_eq!(SignApiError::forbidden("a", "/b").kind(), ErrorKind::Forbidden);
        assert_eq!(SignApiError::forbidden("a", "/b").to_string(), "a is not permitted to access /b");
        let infra: SignApiError = ResolverError::Timeout("pool".into()).into();
        assert_eq!(infra.kind(), ErrorKind::Infrastructure);
        assert!(infra.is_infrastructure());
        assert_eq!(ErrorKind::Infrastructure.to_string(), "InfrastructureError");
    }
}
