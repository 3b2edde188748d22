//! HTTP request handlers.
//!
//! Protected handlers receive the verified [`Claims`](crate::auth::Claims)
//! as an `Extension` inserted by the permission middleware.

pub mod actors;
pub mod associations;
pub mod health;
pub mod index;
pub mod metrics;
pub mod movies;

pub use actors::{create_actor, delete_actor, get_actor, list_actors, update_actor};
pub use associations::associate;
pub use health::{health_check, readiness_check};
pub use index::{index, not_found};
pub use metrics::metrics_handler;
pub use movies::{create_movie, delete_movie, get_movie, list_movies, update_movie};

use crate::errors::ApiError;
use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::Path;
use serde::de::DeserializeOwned;

/// Deserialize a JSON body, mapping any failure to 400.
///
/// Bodies are read as raw bytes so that parse errors produce the service's
/// own envelope rather than axum's default rejection.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(target: "casting.handlers", error = %e, "Invalid request body");
        ApiError::BadRequest(format!("invalid request body: {}", e))
    })
}

/// Unwrap a numeric path id. A non-numeric id matches no record, so it is 404.
fn record_id(id: Result<Path<i32>, PathRejection>, resource: &str) -> Result<i32, ApiError> {
    id.map(|Path(id)| id).map_err(|e| {
        tracing::debug!(target: "casting.handlers", error = %e, resource, "Unparseable record id");
        ApiError::NotFound(format!("{} id is not an integer", resource))
    })
}
