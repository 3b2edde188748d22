//! Index and fallback handlers.

use crate::errors::ApiError;
use crate::models::IndexResponse;
use axum::http::Uri;
use axum::Json;

/// Handler for GET /
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        message: "Welcome to Casting Agency",
    })
}

/// Fallback for paths no route matches.
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("no route for {}", uri.path()))
}
