//! Casting Agency error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl on
//! [`ApiError`], which is the single place responses for failures are built.
//! Domain failures use the `{success, error, message}` envelope; authorization
//! failures surface their `{code, description}` pair instead. Internal causes
//! are logged server-side and never echoed to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Authorization failures raised by the token verifier and permission guard.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization` header on the request.
    #[error("Authorization header is expected.")]
    MissingHeader,

    /// Header is not `bearer <token>`, or the token header has no `kid`.
    #[error("{0}")]
    MalformedHeader(String),

    /// No published key matches the token's `kid`.
    #[error("Unable to find the appropriate key.")]
    UnknownKey,

    /// Signature verified but `exp` has passed.
    #[error("Token expired.")]
    TokenExpired,

    /// Audience or issuer mismatch.
    #[error("Incorrect claims. Please, check the audience and issuer.")]
    InvalidClaims,

    /// Any other decode or signature failure.
    #[error("Unable to parse authentication token.")]
    InvalidHeader,

    /// Verified claim set has no `permissions` entry.
    #[error("Permissions not included in JWT.")]
    MissingClaims,

    /// Required permission is not granted.
    #[error("Permission not found.")]
    Unauthorized,
}

impl AuthError {
    /// HTTP status for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingHeader
            | AuthError::MalformedHeader(_)
            | AuthError::TokenExpired
            | AuthError::InvalidClaims => StatusCode::UNAUTHORIZED,
            AuthError::UnknownKey | AuthError::InvalidHeader | AuthError::MissingClaims => {
                StatusCode::BAD_REQUEST
            }
            AuthError::Unauthorized => StatusCode::FORBIDDEN,
        }
    }

    /// Machine-readable error code surfaced to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::MissingHeader => "authorization_header_missing",
            AuthError::MalformedHeader(_) | AuthError::UnknownKey | AuthError::InvalidHeader => {
                "invalid_header"
            }
            AuthError::TokenExpired => "token_expired",
            AuthError::InvalidClaims | AuthError::MissingClaims => "invalid_claims",
            AuthError::Unauthorized => "unauthorized",
        }
    }
}

/// Failures reported by an entity store.
///
/// Handlers collapse every variant to 422, but the cause is kept typed so
/// logs and metrics can tell them apart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Bounded label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::NotFound => "not_found",
            StoreError::Validation(_) => "validation",
            StoreError::Constraint(_) => "constraint",
            StoreError::Database(_) => "database",
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err)
                if db_err.is_unique_violation()
                    || db_err.is_foreign_key_violation()
                    || db_err.is_check_violation() =>
            {
                StoreError::Constraint(db_err.message().to_string())
            }
            _ => StoreError::Database(err.to_string()),
        }
    }
}

/// API error type returned by handlers and middleware.
///
/// Maps to HTTP status codes:
/// - Auth: 400/401/403 per [`AuthError::status_code`]
/// - BadRequest: 400 Bad Request
/// - NotFound: 404 Not Found
/// - MethodNotAllowed: 405 Method Not Allowed
/// - Unprocessable: 422 Unprocessable Entity
/// - Internal: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authorization failed: {0}")]
    Auth(#[from] AuthError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Unprocessable: {0}")]
    Unprocessable(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(err) => err.status_code(),
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    success: bool,
    error: u16,
    message: String,
}

/// Client-facing message for an error status.
fn envelope_message(status: StatusCode) -> String {
    match status {
        StatusCode::BAD_REQUEST => "Bad request".to_string(),
        StatusCode::NOT_FOUND => "Resource not found".to_string(),
        StatusCode::METHOD_NOT_ALLOWED => "Method not allowed".to_string(),
        StatusCode::UNPROCESSABLE_ENTITY => "Unprocessable".to_string(),
        StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_string(),
        other => {
            // "Payload Too Large" -> "Payload too large"
            let reason = other.canonical_reason().unwrap_or("Error");
            let mut chars = reason.chars();
            match chars.next() {
                Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
                None => "Error".to_string(),
            }
        }
    }
}

/// Build the `{success, error, message}` envelope for `status`.
///
/// Used for failures produced outside handlers (body limits, timeouts,
/// router 405s) so every error body has the same shape.
pub fn error_envelope(status: StatusCode) -> Response {
    let envelope = ErrorEnvelope {
        success: false,
        error: status.as_u16(),
        message: envelope_message(status),
    };

    (status, Json(envelope)).into_response()
}

#[derive(Serialize)]
struct AuthErrorBody {
    success: bool,
    code: &'static str,
    description: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Auth(err) => {
                tracing::debug!(target: "casting.auth", code = err.code(), "Request rejected");
                let body = AuthErrorBody {
                    success: false,
                    code: err.code(),
                    description: err.to_string(),
                };
                let mut response = (status, Json(body)).into_response();

                // Add WWW-Authenticate header for 401 responses
                if status == StatusCode::UNAUTHORIZED {
                    if let Ok(header_value) =
                        "Bearer realm=\"casting-agency\", error=\"invalid_token\"".parse()
                    {
                        response
                            .headers_mut()
                            .insert("WWW-Authenticate", header_value);
                    }
                }

                return response;
            }
            ApiError::BadRequest(reason) => {
                tracing::debug!(target: "casting.api", reason = %reason, "Bad request");
            }
            ApiError::NotFound(resource) => {
                tracing::debug!(target: "casting.api", resource = %resource, "Resource not found");
            }
            ApiError::MethodNotAllowed => {}
            ApiError::Unprocessable(err) => {
                // Log actual cause server-side, return generic message to client
                tracing::warn!(target: "casting.store", error = %err, kind = err.kind(), "Store rejected operation");
            }
            ApiError::Internal(err) => {
                tracing::error!(target: "casting.api", error = %err, "Internal error");
            }
        }

        error_envelope(status)
    }
}
