//! Actor/movie association handler.

use super::parse_body;
use crate::auth::Claims;
use crate::errors::ApiError;
use crate::models::{AssociateRequest, AssociateResponse};
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /associate
///
/// Links an actor to a movie. Requires `post:movies`.
///
/// # Response
///
/// - 200 OK: `{success, actor_id, movie_id}`; linking an already linked pair succeeds
/// - 400 Bad Request: body unparseable
/// - 404 Not Found: `actor_id` or `movie_id` absent, or no such record
/// - 422 Unprocessable Entity: store rejected the link
#[instrument(skip_all, name = "casting.handlers.associate")]
pub async fn associate(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Json<AssociateResponse>, ApiError> {
    let request: AssociateRequest = parse_body(&body)?;

    // A missing id is reported the same way as an unknown one.
    let actor_id = request
        .actor_id
        .ok_or_else(|| ApiError::NotFound("actor_id not given".to_string()))?;
    let movie_id = request
        .movie_id
        .ok_or_else(|| ApiError::NotFound("movie_id not given".to_string()))?;

    if state.store.get_actor(actor_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("actor {}", actor_id)));
    }
    if state.store.get_movie(movie_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("movie {}", movie_id)));
    }

    state.store.associate(actor_id, movie_id).await?;

    tracing::info!(
        target: "casting.handlers.associations",
        subject = %claims.subject(),
        actor_id,
        movie_id,
        "Actor associated with movie"
    );
    Ok(Json(AssociateResponse {
        success: true,
        actor_id,
        movie_id,
    }))
}
