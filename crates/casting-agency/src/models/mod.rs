//! Casting Agency models.
//!
//! Contains the formatted records returned by the API, the inputs accepted by
//! the entity store, and the request bodies parsed by handlers.

use crate::errors::StoreError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================================================
// Records
// ============================================================================

/// Actor as returned by the API, with the titles of associated movies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: i32,
    pub name: String,
    pub age: i32,
    pub gender: String,
    /// Titles of associated movies, ordered by movie id.
    pub movies: Vec<String>,
}

/// Movie as returned by the API, with the names of associated actors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movie {
    pub id: i32,
    pub title: String,
    pub release_date: NaiveDateTime,
    /// Names of associated actors, ordered by actor id.
    pub actors: Vec<String>,
}

// ============================================================================
// Store inputs
// ============================================================================

/// Fields for a new actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewActor {
    pub name: String,
    pub age: i32,
    pub gender: String,
}

impl NewActor {
    /// Check the same constraints the database schema enforces.
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_non_empty("name", &self.name)?;
        validate_age(self.age)
    }
}

/// Partial update for an actor. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActorChanges {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

impl ActorChanges {
    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(name) = &self.name {
            validate_non_empty("name", name)?;
        }
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        Ok(())
    }
}

/// Fields for a new movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovie {
    pub title: String,
    pub release_date: NaiveDateTime,
}

impl NewMovie {
    pub fn validate(&self) -> Result<(), StoreError> {
        validate_non_empty("title", &self.title)
    }
}

/// Partial update for a movie. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MovieChanges {
    pub title: Option<String>,
    pub release_date: Option<NaiveDateTime>,
}

impl MovieChanges {
    pub fn validate(&self) -> Result<(), StoreError> {
        if let Some(title) = &self.title {
            validate_non_empty("title", title)?;
        }
        Ok(())
    }
}

fn validate_non_empty(field: &str, value: &str) -> Result<(), StoreError> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn validate_age(age: i32) -> Result<(), StoreError> {
    if age < 0 {
        return Err(StoreError::Validation(format!(
            "age must not be negative, got {}",
            age
        )));
    }
    Ok(())
}

/// Parse a release date.
///
/// Accepts RFC 3339 (`2022-01-01T00:00:00Z`, offset is normalized to UTC),
/// date-times without offset (`2022-01-01T00:00:00`, `2022-01-01 00:00:00`)
/// and bare dates (`2022-01-01`, midnight).
pub fn parse_release_date(raw: &str) -> Result<NaiveDateTime, StoreError> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| StoreError::Validation(format!("invalid release_date '{}'", raw)))
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body of `POST /actors` and `PATCH /actors/{id}`.
///
/// Every field is optional at the parsing stage so that a missing field can
/// be reported as 400 (create) or treated as "unchanged" (update).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActorRequest {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
}

/// Body of `POST /movies` and `PATCH /movies/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MovieRequest {
    pub title: Option<String>,
    pub release_date: Option<String>,
}

/// Body of `POST /associate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssociateRequest {
    pub actor_id: Option<i32>,
    pub movie_id: Option<i32>,
}

// ============================================================================
// Response bodies
// ============================================================================

/// `GET /` response.
#[derive(Debug, Clone, Serialize)]
pub struct IndexResponse {
    pub message: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActorListResponse {
    pub success: bool,
    pub actors: Vec<Actor>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActorResponse {
    pub success: bool,
    pub actor: Actor,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieListResponse {
    pub success: bool,
    pub movies: Vec<Movie>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieResponse {
    pub success: bool,
    pub movie: Movie,
}

/// Response for both delete endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub delete: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssociateResponse {
    pub success: bool,
    pub actor_id: i32,
    pub movie_id: i32,
}

/// Readiness check response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    pub status: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<&'static str>,
}
