use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use apisign_engine::{Rejection, ResolverError, SignApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid argument. {0}")]
    InvalidArgument(String),
    #[error("Signature could not be verified.")]
    Unauthenticated,
    #[error("Signature is no longer valid. {0}")]
    Expired(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The signing backend is unavailable. Try again later. {0}")]
    BackendUnavailable(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Expired(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<SignApiError> for ServerError {
    fn from(e: SignApiError) -> Self {
        match e {
            SignApiError::InvalidArgument(m) => Self::InvalidArgument(m),
            // Unknown callers get the same response as bad signatures
            SignApiError::Unknown => Self::Unauthenticated,
            SignApiError::Forbidden { .. } => Self::InsufficientPermissions(e.to_string()),
            SignApiError::Expired(m) => Self::Expired(m),
            SignApiError::Infrastructure(e) => e.into(),
        }
    }
}

impl From<ResolverError> for ServerError {
    fn from(e: ResolverError) -> Self {
        match e {
            ResolverError::ConfigurationError(m) => Self::ConfigurationError(m),
            e => Self::BackendUnavailable(e.to_string()),
        }
    }
}

impl From<Rejection> for ServerError {
    fn from(r: Rejection) -> Self {
        r.error.into()
    }
}
