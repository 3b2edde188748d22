//! In-process entity store.
//!
//! Enforces the same constraints as the PostgreSQL schema: non-blank names
//! and titles, non-negative ages, and associations that cascade on delete.
//! Data does not survive a restart.

use crate::errors::StoreError;
use crate::models::{Actor, ActorChanges, Movie, MovieChanges, NewActor, NewMovie};
use crate::repositories::CastingStore;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct ActorRow {
    name: String,
    age: i32,
    gender: String,
}

#[derive(Debug, Clone)]
struct MovieRow {
    title: String,
    release_date: NaiveDateTime,
}

#[derive(Debug, Default)]
struct Tables {
    actors: BTreeMap<i32, ActorRow>,
    movies: BTreeMap<i32, MovieRow>,
    /// (actor_id, movie_id) pairs.
    links: BTreeSet<(i32, i32)>,
    last_actor_id: i32,
    last_movie_id: i32,
}

impl Tables {
    fn actor(&self, id: i32) -> Option<Actor> {
        let row = self.actors.get(&id)?;

        // BTreeMap iteration keeps the titles in movie id order.
        let movies = self
            .movies
            .iter()
            .filter(|(movie_id, _)| self.links.contains(&(id, **movie_id)))
            .map(|(_, movie)| movie.title.clone())
            .collect();

        Some(Actor {
            id,
            name: row.name.clone(),
            age: row.age,
            gender: row.gender.clone(),
            movies,
        })
    }

    fn movie(&self, id: i32) -> Option<Movie> {
        let row = self.movies.get(&id)?;

        let actors = self
            .links
            .iter()
            .filter(|(_, movie_id)| *movie_id == id)
            .filter_map(|(actor_id, _)| self.actors.get(actor_id))
            .map(|actor| actor.name.clone())
            .collect();

        Some(Movie {
            id,
            title: row.title.clone(),
            release_date: row.release_date,
            actors,
        })
    }
}

/// In-memory [`CastingStore`].
///
/// `failing()` builds a store whose every operation returns a database
/// error, for exercising the 422 and readiness paths.
#[derive(Debug, Default)]
pub struct MemoryCastingStore {
    tables: Mutex<Tables>,
    fail: bool,
}

impl MemoryCastingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every operation.
    pub fn failing() -> Self {
        Self {
            tables: Mutex::default(),
            fail: true,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        if self.fail {
            return Err(StoreError::Database("store unavailable".to_string()));
        }
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("store lock poisoned".to_string()))
    }
}

#[async_trait]
impl CastingStore for MemoryCastingStore {
    async fn list_actors(&self) -> Result<Vec<Actor>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .actors
            .keys()
            .filter_map(|id| tables.actor(*id))
            .collect())
    }

    async fn get_actor(&self, id: i32) -> Result<Option<Actor>, StoreError> {
        Ok(self.lock()?.actor(id))
    }

    async fn insert_actor(&self, actor: NewActor) -> Result<Actor, StoreError> {
        actor.validate()?;
        let mut tables = self.lock()?;

        tables.last_actor_id += 1;
        let id = tables.last_actor_id;
        tables.actors.insert(
            id,
            ActorRow {
                name: actor.name,
                age: actor.age,
                gender: actor.gender,
            },
        );

        tables.actor(id).ok_or(StoreError::NotFound)
    }

    async fn update_actor(&self, id: i32, changes: ActorChanges) -> Result<Actor, StoreError> {
        changes.validate()?;
        let mut tables = self.lock()?;

        let row = tables.actors.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(name) = changes.name {
            row.name = name;
        }
        if let Some(age) = changes.age {
            row.age = age;
        }
        if let Some(gender) = changes.gender {
            row.gender = gender;
        }

        tables.actor(id).ok_or(StoreError::NotFound)
    }

    async fn delete_actor(&self, id: i32) -> Result<(), StoreError> {
        let mut tables = self.lock()?;

        tables.actors.remove(&id).ok_or(StoreError::NotFound)?;
        tables.links.retain(|(actor_id, _)| *actor_id != id);
        Ok(())
    }

    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .movies
            .keys()
            .filter_map(|id| tables.movie(*id))
            .collect())
    }

    async fn get_movie(&self, id: i32) -> Result<Option<Movie>, StoreError> {
        Ok(self.lock()?.movie(id))
    }

    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie, StoreError> {
        movie.validate()?;
        let mut tables = self.lock()?;

        tables.last_movie_id += 1;
        let id = tables.last_movie_id;
        tables.movies.insert(
            id,
            MovieRow {
                title: movie.title,
                release_date: movie.release_date,
            },
        );

        tables.movie(id).ok_or(StoreError::NotFound)
    }

    async fn update_movie(&self, id: i32, changes: MovieChanges) -> Result<Movie, StoreError> {
        changes.validate()?;
        let mut tables = self.lock()?;

        let row = tables.movies.get_mut(&id).ok_or(StoreError::NotFound)?;
        if let Some(title) = changes.title {
            row.title = title;
        }
        if let Some(release_date) = changes.release_date {
            row.release_date = release_date;
        }

        tables.movie(id).ok_or(StoreError::NotFound)
    }

    async fn delete_movie(&self, id: i32) -> Result<(), StoreError> {
        let mut tables = self.lock()?;

        tables.movies.remove(&id).ok_or(StoreError::NotFound)?;
        tables.links.retain(|(_, movie_id)| *movie_id != id);
        Ok(())
    }

    async fn associate(&self, actor_id: i32, movie_id: i32) -> Result<(), StoreError> {
        let mut tables = self.lock()?;

        if !tables.actors.contains_key(&actor_id) || !tables.movies.contains_key(&movie_id) {
            return Err(StoreError::NotFound);
        }
        tables.links.insert((actor_id, movie_id));
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }
}
