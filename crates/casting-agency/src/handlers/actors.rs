//! Actor handlers.
//!
//! | Route | Permission |
//! |---|---|
//! | `GET /actors` | `get:actors` |
//! | `GET /actors/:id` | `get:actors` |
//! | `POST /actors` | `post:actors` |
//! | `PATCH /actors/:id` | `patch:actors` |
//! | `DELETE /actors/:id` | `delete:actors` |

use super::{parse_body, record_id};
use crate::auth::Claims;
use crate::errors::ApiError;
use crate::models::{
    ActorChanges, ActorListResponse, ActorRequest, ActorResponse, DeleteResponse, NewActor,
};
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /actors
#[instrument(skip_all, name = "casting.handlers.actors.list")]
pub async fn list_actors(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ActorListResponse>, ApiError> {
    let actors = state.store.list_actors().await?;

    tracing::debug!(target: "casting.handlers.actors", subject = %claims.subject(), count = actors.len(), "Listed actors");
    Ok(Json(ActorListResponse {
        success: true,
        actors,
    }))
}

/// Handler for GET /actors/:id
#[instrument(skip_all, name = "casting.handlers.actors.get")]
pub async fn get_actor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<ActorResponse>, ApiError> {
    let id = record_id(id, "actor")?;

    let actor = state
        .store
        .get_actor(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("actor {}", id)))?;

    tracing::debug!(target: "casting.handlers.actors", subject = %claims.subject(), actor_id = id, "Fetched actor");
    Ok(Json(ActorResponse {
        success: true,
        actor,
    }))
}

/// Handler for POST /actors
///
/// # Response
///
/// - 200 OK: actor created, echoed with its id and an empty movie list
/// - 400 Bad Request: body unparseable, or `name`, `age` or `gender` missing
/// - 422 Unprocessable Entity: store rejected the record
#[instrument(skip_all, name = "casting.handlers.actors.create")]
pub async fn create_actor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Json<ActorResponse>, ApiError> {
    let request: ActorRequest = parse_body(&body)?;

    let (Some(name), Some(age), Some(gender)) = (request.name, request.age, request.gender)
    else {
        return Err(ApiError::BadRequest(
            "name, age and gender are required".to_string(),
        ));
    };

    let actor = state
        .store
        .insert_actor(NewActor { name, age, gender })
        .await?;

    tracing::info!(target: "casting.handlers.actors", subject = %claims.subject(), actor_id = actor.id, "Actor created");
    Ok(Json(ActorResponse {
        success: true,
        actor,
    }))
}

/// Handler for PATCH /actors/:id
///
/// Only fields present in the body are changed.
#[instrument(skip_all, name = "casting.handlers.actors.update")]
pub async fn update_actor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i32>, PathRejection>,
    body: Bytes,
) -> Result<Json<ActorResponse>, ApiError> {
    let id = record_id(id, "actor")?;
    let request: ActorRequest = parse_body(&body)?;

    if state.store.get_actor(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("actor {}", id)));
    }

    let changes = ActorChanges {
        name: request.name,
        age: request.age,
        gender: request.gender,
    };
    let actor = state.store.update_actor(id, changes).await?;

    tracing::info!(target: "casting.handlers.actors", subject = %claims.subject(), actor_id = id, "Actor updated");
    Ok(Json(ActorResponse {
        success: true,
        actor,
    }))
}

/// Handler for DELETE /actors/:id
///
/// Associations of the actor are removed with it.
#[instrument(skip_all, name = "casting.handlers.actors.delete")]
pub async fn delete_actor(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = record_id(id, "actor")?;

    if state.store.get_actor(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("actor {}", id)));
    }

    state.store.delete_actor(id).await?;

    tracing::info!(target: "casting.handlers.actors", subject = %claims.subject(), actor_id = id, "Actor deleted");
    Ok(Json(DeleteResponse {
        success: true,
        delete: id,
    }))
}
