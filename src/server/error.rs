//! Gateway error responses
//!
//! Every failure funnels into [`ApiError`], which carries the HTTP status
//! and renders a `{"detail": "..."}` body. Module errors convert in with
//! their status mapping: validation failures are 400s, identity failures
//! 401/403, upstream failures 502/503.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use thiserror::Error;

use crate::ades::AdesError;
use crate::airbus::AirbusError;
use crate::auth::AuthError;
use crate::authz::AuthzError;
use crate::catalogue::CatalogueError;
use crate::ingest::IngestError;
use crate::orders::OrderValidationError;
use crate::planet::PlanetError;
use crate::router::RouterError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Access denied")]
    Forbidden,

    #[error("{0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Rate limit exceeded for workspace. Try again in {retry_after} seconds")]
    RateLimited { retry_after: u64 },

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    BadGateway(String),

    #[error("{0}")]
    Unavailable(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Render the error as an HTTP response with a JSON detail body
    pub fn into_response(self) -> Response<Full<Bytes>> {
        let body = serde_json::json!({ "detail": self.to_string() }).to_string();
        let mut builder = Response::builder()
            .status(self.status())
            .header("Content-Type", "application/json");
        if let Self::RateLimited { retry_after } = &self {
            builder = builder.header("Retry-After", retry_after.to_string());
        }
        builder
            .body(Full::new(Bytes::from(body)))
            .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
    }
}

impl From<RouterError> for ApiError {
    fn from(err: RouterError) -> Self {
        match err {
            RouterError::NotFound(path) => Self::NotFound(format!("Not found: {path}")),
            RouterError::MethodNotAllowed(_) => Self::MethodNotAllowed,
            RouterError::InvalidSegment(detail) => Self::NotFound(detail),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

impl From<AuthzError> for ApiError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::AccessDenied => Self::Forbidden,
            AuthzError::ConfigError(detail) => Self::Internal(detail),
            AuthzError::BackendError(detail) => Self::BadGateway(detail),
        }
    }
}

impl From<OrderValidationError> for ApiError {
    fn from(err: OrderValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<CatalogueError> for ApiError {
    fn from(err: CatalogueError) -> Self {
        match err {
            CatalogueError::FetchError { .. } => Self::Unavailable(err.to_string()),
            CatalogueError::UpstreamStatus { .. } | CatalogueError::InvalidItem(_) => {
                Self::BadGateway(err.to_string())
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        Self::BadGateway(err.to_string())
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        Self::BadGateway(err.to_string())
    }
}

impl From<AdesError> for ApiError {
    fn from(err: AdesError) -> Self {
        match err {
            AdesError::Unreachable { .. } => Self::Unavailable(err.to_string()),
            AdesError::UpstreamStatus { .. } => Self::BadGateway(err.to_string()),
        }
    }
}

impl From<AirbusError> for ApiError {
    fn from(err: AirbusError) -> Self {
        match err {
            AirbusError::InvalidCountryCode { .. } => Self::Validation(err.to_string()),
            AirbusError::QuoteNotFound | AirbusError::AssetLinkNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            AirbusError::MultiNotSupported
            | AirbusError::TokenGeneration
            | AirbusError::MissingApiKey => Self::Internal(err.to_string()),
            AirbusError::RequestFailed { .. } => Self::Unavailable(err.to_string()),
            AirbusError::UpstreamStatus { .. } => Self::BadGateway(err.to_string()),
        }
    }
}

impl From<PlanetError> for ApiError {
    fn from(err: PlanetError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(format!("Invalid request body: {err}"))
    }
}
