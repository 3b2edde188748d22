//! Movie handlers.
//!
//! `release_date` is accepted as an ISO-8601 date or date-time and returned
//! as `YYYY-MM-DDTHH:MM:SS`. An unparseable date is a store-level rejection
//! (422), not a malformed request.

use super::{parse_body, record_id};
use crate::auth::Claims;
use crate::errors::ApiError;
use crate::models::{
    parse_release_date, DeleteResponse, MovieChanges, MovieListResponse, MovieRequest,
    MovieResponse, NewMovie,
};
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /movies
#[instrument(skip_all, name = "casting.handlers.movies.list")]
pub async fn list_movies(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MovieListResponse>, ApiError> {
    let movies = state.store.list_movies().await?;

    tracing::debug!(target: "casting.handlers.movies", subject = %claims.subject(), count = movies.len(), "Listed movies");
    Ok(Json(MovieListResponse {
        success: true,
        movies,
    }))
}

/// Handler for GET /movies/:id
#[instrument(skip_all, name = "casting.handlers.movies.get")]
pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<MovieResponse>, ApiError> {
    let id = record_id(id, "movie")?;

    let movie = state
        .store
        .get_movie(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("movie {}", id)))?;

    tracing::debug!(target: "casting.handlers.movies", subject = %claims.subject(), movie_id = id, "Fetched movie");
    Ok(Json(MovieResponse {
        success: true,
        movie,
    }))
}

/// Handler for POST /movies
///
/// # Response
///
/// - 200 OK: movie created
/// - 400 Bad Request: body unparseable, or `title` or `release_date` missing
/// - 422 Unprocessable Entity: invalid date or store rejected the record
#[instrument(skip_all, name = "casting.handlers.movies.create")]
pub async fn create_movie(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Json<MovieResponse>, ApiError> {
    let request: MovieRequest = parse_body(&body)?;

    let (Some(title), Some(release_date)) = (request.title, request.release_date) else {
        return Err(ApiError::BadRequest(
            "title and release_date are required".to_string(),
        ));
    };

    let movie = NewMovie {
        title,
        release_date: parse_release_date(&release_date)?,
    };
    let movie = state.store.insert_movie(movie).await?;

    tracing::info!(target: "casting.handlers.movies", subject = %claims.subject(), movie_id = movie.id, "Movie created");
    Ok(Json(MovieResponse {
        success: true,
        movie,
    }))
}

/// Handler for PATCH /movies/:id
#[instrument(skip_all, name = "casting.handlers.movies.update")]
pub async fn update_movie(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i32>, PathRejection>,
    body: Bytes,
) -> Result<Json<MovieResponse>, ApiError> {
    let id = record_id(id, "movie")?;
    let request: MovieRequest = parse_body(&body)?;

    if state.store.get_movie(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("movie {}", id)));
    }

    let changes = MovieChanges {
        title: request.title,
        release_date: request
            .release_date
            .as_deref()
            .map(parse_release_date)
            .transpose()?,
    };
    let movie = state.store.update_movie(id, changes).await?;

    tracing::info!(target: "casting.handlers.movies", subject = %claims.subject(), movie_id = id, "Movie updated");
    Ok(Json(MovieResponse {
        success: true,
        movie,
    }))
}

/// Handler for DELETE /movies/:id
#[instrument(skip_all, name = "casting.handlers.movies.delete")]
pub async fn delete_movie(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = record_id(id, "movie")?;

    if state.store.get_movie(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("movie {}", id)));
    }

    state.store.delete_movie(id).await?;

    tracing::info!(target: "casting.handlers.movies", subject = %claims.subject(), movie_id = id, "Movie deleted");
    Ok(Json(DeleteResponse {
        success: true,
        delete: id,
    }))
}
