//! Entity store for actors, movies and their associations.
//!
//! Handlers talk to the store through [`CastingStore`]. Two implementations
//! exist: [`PgCastingStore`] on PostgreSQL and [`MemoryCastingStore`] for
//! tests and local runs.
//!
//! Every record returned by a store is fully formatted: actors carry the
//! titles of their movies and movies the names of their actors, both ordered
//! by the related record's id.

pub mod memory;
pub mod postgres;

pub use memory::MemoryCastingStore;
pub use postgres::PgCastingStore;

use crate::errors::StoreError;
use crate::models::{Actor, ActorChanges, Movie, MovieChanges, NewActor, NewMovie};
use async_trait::async_trait;

#[async_trait]
pub trait CastingStore: Send + Sync {
    /// All actors, ordered by id.
    async fn list_actors(&self) -> Result<Vec<Actor>, StoreError>;

    /// The actor with `id`, or `None`.
    async fn get_actor(&self, id: i32) -> Result<Option<Actor>, StoreError>;

    /// Insert an actor and return it with its assigned id.
    async fn insert_actor(&self, actor: NewActor) -> Result<Actor, StoreError>;

    /// Apply `changes` to an existing actor and return the updated record.
    ///
    /// Fails with `StoreError::NotFound` if no actor has `id`.
    async fn update_actor(&self, id: i32, changes: ActorChanges) -> Result<Actor, StoreError>;

    /// Delete an actor and its associations.
    ///
    /// Fails with `StoreError::NotFound` if no actor has `id`.
    async fn delete_actor(&self, id: i32) -> Result<(), StoreError>;

    /// All movies, ordered by id.
    async fn list_movies(&self) -> Result<Vec<Movie>, StoreError>;

    async fn get_movie(&self, id: i32) -> Result<Option<Movie>, StoreError>;

    async fn insert_movie(&self, movie: NewMovie) -> Result<Movie, StoreError>;

    async fn update_movie(&self, id: i32, changes: MovieChanges) -> Result<Movie, StoreError>;

    /// Delete a movie and its associations.
    async fn delete_movie(&self, id: i32) -> Result<(), StoreError>;

    /// Link an actor to a movie. Linking an already linked pair is a no-op.
    ///
    /// Fails with `StoreError::NotFound` (memory) or `StoreError::Constraint`
    /// (PostgreSQL) if either side does not exist.
    async fn associate(&self, actor_id: i32, movie_id: i32) -> Result<(), StoreError>;

    /// Check that the store can serve requests.
    async fn ping(&self) -> Result<(), StoreError>;
}
