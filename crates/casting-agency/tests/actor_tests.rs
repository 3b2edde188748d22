//! Actor endpoint integration tests.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use anyhow::Result;
use casting_agency::models::NewActor;
use casting_agency::repositories::CastingStore;
use casting_test_utils::TestCastingServer;
use serde_json::{json, Value};

const ALL_ACTOR_PERMISSIONS: &[&str] = &[
    "get:actors",
    "post:actors",
    "patch:actors",
    "delete:actors",
];

struct ActorClient {
    server: TestCastingServer,
    client: reqwest::Client,
    token: String,
}

impl ActorClient {
    async fn spawn() -> Result<Self> {
        let server = TestCastingServer::spawn().await?;
        let token = server.token_with_permissions(ALL_ACTOR_PERMISSIONS);
        Ok(Self {
            server,
            client: reqwest::Client::new(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.server.url(), path)
    }

    async fn seed(&self, name: &str, age: i32, gender: &str) -> i32 {
        self.server
            .store()
            .insert_actor(NewActor {
                name: name.to_string(),
                age,
                gender: gender.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    async fn patch(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(&self.token)
            .send()
            .await
            .unwrap()
    }
}

fn bad_request() -> Value {
    json!({"success": false, "error": 400, "message": "Bad request"})
}

fn not_found() -> Value {
    json!({"success": false, "error": 404, "message": "Resource not found"})
}

fn unprocessable() -> Value {
    json!({"success": false, "error": 422, "message": "Unprocessable"})
}

#[tokio::test]
async fn test_list_actors_ordered_by_id() -> Result<()> {
    let client = ActorClient::spawn().await?;
    client.seed("Meryl Streep", 74, "Female").await;
    client.seed("Denzel Washington", 69, "Male").await;

    let response = client.get("/actors").await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], true);
    let names: Vec<&str> = body["actors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|actor| actor["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Meryl Streep", "Denzel Washington"]);

    Ok(())
}

#[tokio::test]
async fn test_get_actor_by_id() -> Result<()> {
    let client = ActorClient::spawn().await?;
    let id = client.seed("Meryl Streep", 74, "Female").await;

    let response = client.get(&format!("/actors/{}", id)).await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body,
        json!({
            "success": true,
            "actor": {"id": id, "name": "Meryl Streep", "age": 74, "gender": "Female", "movies": []}
        })
    );

    Ok(())
}

#[tokio::test]
async fn test_get_missing_actor_is_404() -> Result<()> {
    let client = ActorClient::spawn().await?;

    let response = client.get("/actors/100").await;

    assert_eq!(response.status(), 404);
    assert_eq!(response.json::<Value>().await?, not_found());

    Ok(())
}

#[tokio::test]
async fn test_non_integer_id_is_404() -> Result<()> {
    let client = ActorClient::spawn().await?;

    let response = client.get("/actors/abc").await;

    assert_eq!(response.status(), 404);
    assert_eq!(response.json::<Value>().await?, not_found());

    Ok(())
}

#[tokio::test]
async fn test_create_actor_echoes_record() -> Result<()> {
    let client = ActorClient::spawn().await?;

    let response = client
        .post(
            "/actors",
            &json!({"name": "John Doe", "age": 30, "gender": "Male"}),
        )
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["success"], true);
    let id = body["actor"]["id"].as_i64().unwrap();
    assert_eq!(
        body["actor"],
        json!({"id": id, "name": "John Doe", "age": 30, "gender": "Male", "movies": []})
    );

    let stored = client.server.store().get_actor(id as i32).await?;
    assert_eq!(stored.map(|actor| actor.name), Some("John Doe".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_create_actor_missing_field_is_400() -> Result<()> {
    let client = ActorClient::spawn().await?;

    let response = client
        .post("/actors", &json!({"name": "John Doe", "age": 30}))
        .await;

    assert_eq!(response.status(), 400);
    assert_eq!(response.json::<Value>().await?, bad_request());

    Ok(())
}

#[tokio::test]
async fn test_create_actor_unparseable_body_is_400() -> Result<()> {
    let client = ActorClient::spawn().await?;

    let response = client
        .client
        .post(client.url("/actors"))
        .bearer_auth(&client.token)
        .header("Content-Type", "application/json")
        .body("{\"name\": ")
        .send()
        .await?;

    assert_eq!(response.status(), 400);
    assert_eq!(response.json::<Value>().await?, bad_request());

    Ok(())
}

#[tokio::test]
async fn test_create_actor_wrong_type_is_400() -> Result<()> {
    let client = ActorClient::spawn().await?;

    let response = client
        .post(
            "/actors",
            &json!({"name": "John Doe", "age": "thirty", "gender": "Male"}),
        )
        .await;

    assert_eq!(response.status(), 400);

    Ok(())
}

#[tokio::test]
async fn test_create_actor_negative_age_is_422() -> Result<()> {
    let client = ActorClient::spawn().await?;

    let response = client
        .post(
            "/actors",
            &json!({"name": "John Doe", "age": -1, "gender": "Male"}),
        )
        .await;

    assert_eq!(response.status(), 422);
    assert_eq!(response.json::<Value>().await?, unprocessable());

    Ok(())
}

#[tokio::test]
async fn test_patch_actor_negative_age_is_422_and_unchanged() -> Result<()> {
    let client = ActorClient::spawn().await?;
    let id = client.seed("Meryl Streep", 74, "Female").await;

    let response = client
        .patch(&format!("/actors/{}", id), &json!({"age": -74}))
        .await;

    assert_eq!(response.status(), 422);
    assert_eq!(response.json::<Value>().await?, unprocessable());
    let stored = client.server.store().get_actor(id).await?;
    assert_eq!(stored.map(|actor| actor.age), Some(74));

    Ok(())
}

#[tokio::test]
async fn test_patch_actor_keeps_omitted_fields() -> Result<()> {
    let client = ActorClient::spawn().await?;
    let id = client.seed("Meryl Streep", 74, "Female").await;

    let response = client
        .patch(&format!("/actors/{}", id), &json!({"age": 75}))
        .await;

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await?;
    assert_eq!(
        body["actor"],
        json!({"id": id, "name": "Meryl Streep", "age": 75, "gender": "Female", "movies": []})
    );

    Ok(())
}

#[tokio::test]
async fn test_patch_missing_actor_is_404() -> Result<()> {
    let client = ActorClient::spawn().await?;

    let response = client.patch("/actors/100", &json!({"age": 40})).await;

    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_patch_actor_blank_name_is_422() -> Result<()> {
    let client = ActorClient::spawn().await?;
    let id = client.seed("Meryl Streep", 74, "Female").await;

    let response = client
        .patch(&format!("/actors/{}", id), &json!({"name": "   "}))
        .await;

    assert_eq!(response.status(), 422);
    assert_eq!(response.json::<Value>().await?, unprocessable());

    Ok(())
}

#[tokio::test]
async fn test_delete_actor_then_get_is_404() -> Result<()> {
    let client = ActorClient::spawn().await?;
    let id = client.seed("Meryl Streep", 74, "Female").await;

    let response = client.delete(&format!("/actors/{}", id)).await;

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.json::<Value>().await?,
        json!({"success": true, "delete": id})
    );

    let response = client.get(&format!("/actors/{}", id)).await;
    assert_eq!(response.status(), 404);

    Ok(())
}

#[tokio::test]
async fn test_delete_missing_actor_is_404() -> Result<()> {
    let client = ActorClient::spawn().await?;

    let response = client.delete("/actors/100").await;

    assert_eq!(response.status(), 404);
    assert_eq!(response.json::<Value>().await?, not_found());

    Ok(())
}
