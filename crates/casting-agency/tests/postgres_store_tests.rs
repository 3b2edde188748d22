//! PostgreSQL entity store tests.
//!
//! Uses `#[sqlx::test]` for isolated test databases. These need a running
//! PostgreSQL reachable through `DATABASE_URL`, so they are ignored by
//! default: `cargo test -- --ignored`.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use casting_agency::errors::StoreError;
use casting_agency::models::{parse_release_date, ActorChanges, MovieChanges, NewActor, NewMovie};
use casting_agency::repositories::{CastingStore, PgCastingStore};
use sqlx::PgPool;

fn actor(name: &str) -> NewActor {
    NewActor {
        name: name.to_string(),
        age: 50,
        gender: "Female".to_string(),
    }
}

fn movie(title: &str) -> NewMovie {
    NewMovie {
        title: title.to_string(),
        release_date: parse_release_date("2001-07-20").unwrap(),
    }
}

/// Insert then fetch returns the same record with an empty association list.
#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_insert_and_get_actor(pool: PgPool) {
    let store = PgCastingStore::new(pool);

    let inserted = store.insert_actor(actor("Cate Blanchett")).await.unwrap();
    let fetched = store.get_actor(inserted.id).await.unwrap();

    assert_eq!(fetched, Some(inserted.clone()));
    assert!(inserted.movies.is_empty());
}

/// Missing ids are `None`, not errors.
#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_get_missing_records(pool: PgPool) {
    let store = PgCastingStore::new(pool);

    assert_eq!(store.get_actor(12345).await.unwrap(), None);
    assert_eq!(store.get_movie(12345).await.unwrap(), None);
}

/// Lists are ordered by id.
#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_list_movies_ordered(pool: PgPool) {
    let store = PgCastingStore::new(pool);
    store.insert_movie(movie("Spirited Away")).await.unwrap();
    store.insert_movie(movie("Amelie")).await.unwrap();

    let titles: Vec<String> = store
        .list_movies()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.title)
        .collect();

    assert_eq!(titles, vec!["Spirited Away", "Amelie"]);
}

/// Partial updates leave omitted columns untouched.
#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_update_actor_partial(pool: PgPool) {
    let store = PgCastingStore::new(pool);
    let inserted = store.insert_actor(actor("Cate Blanchett")).await.unwrap();

    let updated = store
        .update_actor(
            inserted.id,
            ActorChanges {
                age: Some(55),
                ..ActorChanges::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Cate Blanchett");
    assert_eq!(updated.age, 55);
    assert_eq!(updated.gender, "Female");
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_update_missing_movie_is_not_found(pool: PgPool) {
    let store = PgCastingStore::new(pool);

    let result = store
        .update_movie(
            12345,
            MovieChanges {
                title: Some("Nothing".to_string()),
                ..MovieChanges::default()
            },
        )
        .await;

    assert!(matches!(result, Err(StoreError::NotFound)));
}

/// Negative ages are rejected before reaching the database.
#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_insert_invalid_actor_rejected(pool: PgPool) {
    let store = PgCastingStore::new(pool);

    let result = store
        .insert_actor(NewActor {
            age: -3,
            ..actor("Cate Blanchett")
        })
        .await;

    assert!(matches!(result, Err(StoreError::Validation(_))));
}

/// Associations appear on both sides and repeat links are no-ops.
#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_associate_bidirectional_and_idempotent(pool: PgPool) {
    let store = PgCastingStore::new(pool);
    let a = store.insert_actor(actor("Cate Blanchett")).await.unwrap();
    let m = store.insert_movie(movie("Elizabeth")).await.unwrap();

    store.associate(a.id, m.id).await.unwrap();
    store.associate(a.id, m.id).await.unwrap();

    let a = store.get_actor(a.id).await.unwrap().unwrap();
    let m = store.get_movie(m.id).await.unwrap().unwrap();
    assert_eq!(a.movies, vec!["Elizabeth"]);
    assert_eq!(m.actors, vec!["Cate Blanchett"]);
}

/// Linking to a missing record violates the foreign key.
#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_associate_missing_movie_rejected(pool: PgPool) {
    let store = PgCastingStore::new(pool);
    let a = store.insert_actor(actor("Cate Blanchett")).await.unwrap();

    let result = store.associate(a.id, 12345).await;

    assert!(matches!(result, Err(StoreError::Constraint(_))));
}

/// Deleting either side cascades to the association table.
#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_delete_cascades(pool: PgPool) {
    let store = PgCastingStore::new(pool);
    let a = store.insert_actor(actor("Cate Blanchett")).await.unwrap();
    let m = store.insert_movie(movie("Elizabeth")).await.unwrap();
    store.associate(a.id, m.id).await.unwrap();

    store.delete_actor(a.id).await.unwrap();

    let m = store.get_movie(m.id).await.unwrap().unwrap();
    assert!(m.actors.is_empty());
    assert!(matches!(
        store.delete_actor(a.id).await,
        Err(StoreError::NotFound)
    ));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore]
async fn test_ping(pool: PgPool) {
    let store = PgCastingStore::new(pool);
    store.ping().await.unwrap();
}
