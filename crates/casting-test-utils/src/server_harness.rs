//! Test server harness for end-to-end testing.
//!
//! Provides `TestCastingServer`, which spawns the real router on a random
//! port with the in-memory store and a wiremock JWKS endpoint serving the
//! harness keypair.

use crate::crypto_fixtures::TestKeypair;
use crate::token_builders::{TestTokenBuilder, TEST_AUDIENCE, TEST_AUTH_DOMAIN};
use casting_agency::config::Config;
use casting_agency::observability::metrics::init_metrics_recorder;
use casting_agency::repositories::MemoryCastingStore;
use casting_agency::routes::{self, AppState};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock issuer serves its key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Global metrics handle for test servers; the recorder can only be installed once per process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the Casting Agency server in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_list_actors() -> Result<()> {
///     let server = TestCastingServer::spawn().await?;
///     let token = server.token_with_permissions(&["get:actors"]);
///
///     let response = reqwest::Client::new()
///         .get(format!("{}/actors", server.url()))
///         .bearer_auth(token)
///         .send()
///         .await?;
///
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestCastingServer {
    addr: SocketAddr,
    config: Config,
    store: Arc<MemoryCastingStore>,
    keypair: TestKeypair,
    mock_server: MockServer,
    _handle: JoinHandle<()>,
}

impl TestCastingServer {
    /// Spawn with an Ed25519 signing key.
    pub async fn spawn() -> Result<Self, anyhow::Error> {
        Self::spawn_with(TestKeypair::ed25519(1, "test-key-01"), &[]).await
    }

    /// Spawn with the given signing key and extra configuration variables.
    ///
    /// `overrides` replace the harness defaults, e.g.
    /// `[("AUTH_BYPASS", "true")]` or `[("JWKS_CACHE_TTL_SECONDS", "0")]`.
    pub async fn spawn_with(
        keypair: TestKeypair,
        overrides: &[(&str, &str)],
    ) -> Result<Self, anyhow::Error> {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(keypair.jwks_json()))
            .mount(&mock_server)
            .await;

        let mut vars = HashMap::from([
            ("CASTING_STORE".to_string(), "memory".to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("AUTH_DOMAIN".to_string(), TEST_AUTH_DOMAIN.to_string()),
            ("API_AUDIENCE".to_string(), TEST_AUDIENCE.to_string()),
            ("ALGORITHMS".to_string(), "RS256,EdDSA".to_string()),
            (
                "JWKS_URL".to_string(),
                format!("{}{}", mock_server.uri(), JWKS_PATH),
            ),
            ("JWKS_CACHE_TTL_SECONDS".to_string(), "300".to_string()),
        ]);
        for (key, value) in overrides {
            vars.insert((*key).to_string(), (*value).to_string());
        }

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let store = Arc::new(MemoryCastingStore::new());
        let state = Arc::new(AppState {
            store: store.clone(),
            config: config.clone(),
        });

        let app = routes::build_routes(state, get_test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            store,
            keypair,
            mock_server,
            _handle: handle,
        })
    }

    /// Base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The in-memory store backing the server, for seeding and inspection.
    pub fn store(&self) -> &Arc<MemoryCastingStore> {
        &self.store
    }

    pub fn keypair(&self) -> &TestKeypair {
        &self.keypair
    }

    /// The mock issuer, for inspecting JWKS fetches.
    pub fn mock_server(&self) -> &MockServer {
        &self.mock_server
    }

    /// Valid token granting exactly `permissions`.
    pub fn token_with_permissions(&self, permissions: &[&str]) -> String {
        self.keypair.sign_token(
            &TestTokenBuilder::new()
                .with_permissions(permissions)
                .build(),
        )
    }
}

impl Drop for TestCastingServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
