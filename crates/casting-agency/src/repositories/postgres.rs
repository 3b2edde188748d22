//! PostgreSQL entity store.
//!
//! # Security
//!
//! - All queries use parameterized statements (SQL injection safe)
//!
//! Association cleanup on delete is done by `ON DELETE CASCADE` in the schema.

use crate::errors::StoreError;
use crate::models::{Actor, ActorChanges, Movie, MovieChanges, NewActor, NewMovie};
use crate::observability::metrics;
use crate::repositories::CastingStore;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// Actors with the titles of their movies. `$1` NULL selects all actors.
const SELECT_ACTORS: &str = r#"
    SELECT a.id, a.name, a.age, a.gender,
           COALESCE(
               ARRAY_AGG(m.title ORDER BY m.id) FILTER (WHERE m.id IS NOT NULL),
               ARRAY[]::TEXT[]
           ) AS movies
    FROM actors a
    LEFT JOIN movie_actors ma ON ma.actor_id = a.id
    LEFT JOIN movies m ON m.id = ma.movie_id
    WHERE ($1::INTEGER IS NULL OR a.id = $1)
    GROUP BY a.id
    ORDER BY a.id
"#;

/// Movies with the names of their actors. `$1` NULL selects all movies.
const SELECT_MOVIES: &str = r#"
    SELECT m.id, m.title, m.release_date,
           COALESCE(
               ARRAY_AGG(a.name ORDER BY a.id) FILTER (WHERE a.id IS NOT NULL),
               ARRAY[]::TEXT[]
           ) AS actors
    FROM movies m
    LEFT JOIN movie_actors ma ON ma.movie_id = m.id
    LEFT JOIN actors a ON a.id = ma.actor_id
    WHERE ($1::INTEGER IS NULL OR m.id = $1)
    GROUP BY m.id
    ORDER BY m.id
"#;

/// Entity store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgCastingStore {
    pool: PgPool,
}

impl PgCastingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_actors(&self, id: Option<i32>) -> Result<Vec<Actor>, StoreError> {
        let rows = sqlx::query(SELECT_ACTORS)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_actor).collect()
    }

    async fn fetch_movies(&self, id: Option<i32>) -> Result<Vec<Movie>, StoreError> {
        let rows = sqlx::query(SELECT_MOVIES)
            .bind(id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(map_row_to_movie).collect()
    }

    async fn insert_actor_row(&self, actor: NewActor) -> Result<Actor, StoreError> {
        actor.validate()?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO actors (name, age, gender) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&actor.name)
        .bind(actor.age)
        .bind(&actor.gender)
        .fetch_one(&self.pool)
        .await?;

        Ok(Actor {
            id,
            name: actor.name,
            age: actor.age,
            gender: actor.gender,
            movies: Vec::new(),
        })
    }

    async fn update_actor_row(&self, id: i32, changes: ActorChanges) -> Result<Actor, StoreError> {
        changes.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE actors
            SET name = COALESCE($2, name),
                age = COALESCE($3, age),
                gender = COALESCE($4, gender)
            WHERE id = $1
            "#,
        )
        .bind(id) // $1
        .bind(changes.name) // $2
        .bind(changes.age) // $3
        .bind(changes.gender) // $4
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        self.fetch_actors(Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_movie_row(&self, movie: NewMovie) -> Result<Movie, StoreError> {
        movie.validate()?;

        let id: i32 = sqlx::query_scalar(
            "INSERT INTO movies (title, release_date) VALUES ($1, $2) RETURNING id",
        )
        .bind(&movie.title)
        .bind(movie.release_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(Movie {
            id,
            title: movie.title,
            release_date: movie.release_date,
            actors: Vec::new(),
        })
    }

    async fn update_movie_row(&self, id: i32, changes: MovieChanges) -> Result<Movie, StoreError> {
        changes.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE movies
            SET title = COALESCE($2, title),
                release_date = COALESCE($3, release_date)
            WHERE id = $1
            "#,
        )
        .bind(id) // $1
        .bind(changes.title) // $2
        .bind(changes.release_date) // $3
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        self.fetch_movies(Some(id))
            .await?
            .into_iter()
            .next()
            .ok_or(StoreError::NotFound)
    }

    async fn delete_row(&self, statement: &'static str, id: i32) -> Result<(), StoreError> {
        let result = sqlx::query(statement).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn insert_association(&self, actor_id: i32, movie_id: i32) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO movie_actors (movie_id, actor_id)
            VALUES ($1, $2)
            ON CONFLICT (movie_id, actor_id) DO NOTHING
            "#,
        )
        .bind(movie_id)
        .bind(actor_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Record duration and outcome of a store operation.
fn observe<T>(
    operation: &'static str,
    start: Instant,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    let status = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::record_store_operation(operation, status, start.elapsed());

    if let Err(e) = &result {
        tracing::debug!(target: "casting.store.pg", operation, error = %e, "Store operation failed");
    }

    result
}

#[async_trait]
impl CastingStore for PgCastingStore {
    #[instrument(skip_all, name = "casting.store.list_actors")]
    async fn list_actors(&self) -> Result<Vec<Actor>, StoreError> {
        let start = Instant::now();
        observe("list_actors", start, self.fetch_actors(None).await)
    }

    #[instrument(skip_all, name = "casting.store.get_actor", fields(actor_id = id))]
    async fn get_actor(&self, id: i32) -> Result<Option<Actor>, StoreError> {
        let start = Instant::now();
        let result = self
            .fetch_actors(Some(id))
            .await
            .map(|actors| actors.into_iter().next());
        observe("get_actor", start, result)
    }

    #[instrument(skip_all, name = "casting.store.insert_actor")]
    async fn insert_actor(&self, actor: NewActor) -> Result<Actor, StoreError> {
        let start = Instant::now();
        observe("insert_actor", start, self.insert_actor_row(actor).await)
    }

    #[instrument(skip_all, name = "casting.store.update_actor", fields(actor_id = id))]
    async fn update_actor(&self, id: i32, changes: ActorChanges) -> Result<Actor, StoreError> {
        let start = Instant::now();
        observe("update_actor", start, self.update_actor_row(id, changes).await)
    }

    #[instrument(skip_all, name = "casting.store.delete_actor", fields(actor_id = id))]
    async fn delete_actor(&self, id: i32) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.delete_row("DELETE FROM actors WHERE id = $1", id).await;
        observe("delete_actor", start, result)
    }

    #[instrument(skip_all, name = "casting.store.list_movies")]
    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let start = Instant::now();
        observe("list_movies", start, self.fetch_movies(None).await)
    }

    #[instrument(skip_all, name = "casting.store.get_movie", fields(movie_id = id))]
    async fn get_movie(&self, id: i32) -> Result<Option<Movie>, StoreError> {
        let start = Instant::now();
        let result = self
            .fetch_movies(Some(id))
            .await
            .map(|movies| movies.into_iter().next());
        observe("get_movie", start, result)
    }

    #[instrument(skip_all, name = "casting.store.insert_movie")]
    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie, StoreError> {
        let start = Instant::now();
        observe("insert_movie", start, self.insert_movie_row(movie).await)
    }

    #[instrument(skip_all, name = "casting.store.update_movie", fields(movie_id = id))]
    async fn update_movie(&self, id: i32, changes: MovieChanges) -> Result<Movie, StoreError> {
        let start = Instant::now();
        observe("update_movie", start, self.update_movie_row(id, changes).await)
    }

    #[instrument(skip_all, name = "casting.store.delete_movie", fields(movie_id = id))]
    async fn delete_movie(&self, id: i32) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.delete_row("DELETE FROM movies WHERE id = $1", id).await;
        observe("delete_movie", start, result)
    }

    #[instrument(skip_all, name = "casting.store.associate", fields(actor_id = actor_id, movie_id = movie_id))]
    async fn associate(&self, actor_id: i32, movie_id: i32) -> Result<(), StoreError> {
        let start = Instant::now();
        let result = self.insert_association(actor_id, movie_id).await;
        observe("associate", start, result)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn map_row_to_actor(row: &PgRow) -> Result<Actor, StoreError> {
    Ok(Actor {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        age: row.try_get("age")?,
        gender: row.try_get("gender")?,
        movies: row.try_get("movies")?,
    })
}

fn map_row_to_movie(row: &PgRow) -> Result<Movie, StoreError> {
    Ok(Movie {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        release_date: row.try_get("release_date")?,
        actors: row.try_get("actors")?,
    })
}
