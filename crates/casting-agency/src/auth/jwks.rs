//! Key sources for token verification.
//!
//! [`JwksClient`] fetches the issuer's `/.well-known/jwks.json` and caches the
//! key set with a configurable TTL. A TTL of zero refetches on every lookup.
//! An unknown `kid` in a still-valid cache triggers one refetch so rotated
//! keys are picked up without waiting for expiry. Such refetches happen at
//! most once per [`MIN_REFETCH_INTERVAL`], so tokens carrying made-up kids
//! cannot turn every request into a call to the issuer.
//!
//! [`StaticKeySet`] serves a fixed set of keys and never touches the network.

use crate::errors::ApiError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::instrument;

/// Timeout for a single JWKS fetch.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Minimum gap between fetches triggered by a kid missing from a valid cache.
pub const MIN_REFETCH_INTERVAL: Duration = Duration::from_secs(10);

/// JSON Web Key as published by the issuer.
///
/// RSA keys carry `n`/`e`, Ed25519 keys (`kty = "OKP"`) carry `crv`/`x`.
/// Unknown members such as `x5c` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Jwk {
    /// Key type: "RSA" or "OKP".
    pub kty: String,

    /// Key ID, matched against the token header's `kid`.
    #[serde(default)]
    pub kid: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for OKP keys ("Ed25519").
    #[serde(default)]
    pub crv: Option<String>,

    /// OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// Algorithm the key is intended for, if the issuer says.
    #[serde(default)]
    pub alg: Option<String>,

    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// Source of verification keys, looked up by `kid`.
///
/// `Ok(None)` means the source is healthy but has no such key. `Err` means
/// the source itself could not be reached or parsed.
#[async_trait]
pub trait KeySource: Send + Sync {
    async fn get_key(&self, kid: &str) -> Result<Option<Jwk>, ApiError>;
}

/// Cached JWKS data with expiry time.
struct CachedJwks {
    keys: HashMap<String, Jwk>,
    fetched_at: Instant,
    expires_at: Instant,
}

/// Outcome of a cache lookup.
enum CacheLookup {
    Hit(Jwk),
    /// Valid cache without the kid, fetched too recently to refetch.
    KnownAbsent,
    /// No usable cache, or a miss old enough to justify a refetch.
    Refresh,
}

/// JWKS client for fetching and caching the issuer's public keys.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: Arc<RwLock<Option<CachedJwks>>>,
    cache_ttl: Duration,
    min_refetch_interval: Duration,
}

impl JwksClient {
    /// Create a new JWKS client.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL of the issuer's JWKS endpoint
    /// * `cache_ttl` - How long to reuse a fetched key set; zero disables caching
    pub fn with_ttl(jwks_url: String, cache_ttl: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "casting.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: Arc::new(RwLock::new(None)),
            cache_ttl,
            min_refetch_interval: MIN_REFETCH_INTERVAL,
        }
    }

    /// Override the minimum gap between unknown-kid refetches.
    pub fn with_min_refetch_interval(mut self, interval: Duration) -> Self {
        self.min_refetch_interval = interval;
        self
    }

    /// Look up `kid` in a cache that has not expired yet.
    async fn cached_key(&self, kid: &str) -> CacheLookup {
        let cache = self.cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return CacheLookup::Refresh;
        };

        let now = Instant::now();
        if cached.expires_at <= now {
            return CacheLookup::Refresh;
        }

        match cached.keys.get(kid) {
            Some(key) => CacheLookup::Hit(key.clone()),
            None if now.duration_since(cached.fetched_at) < self.min_refetch_interval => {
                CacheLookup::KnownAbsent
            }
            None => CacheLookup::Refresh,
        }
    }

    /// Fetch the key set and replace the cache. Returns the freshly fetched keys.
    #[instrument(skip(self))]
    async fn refresh_cache(&self) -> Result<HashMap<String, Jwk>, ApiError> {
        tracing::debug!(target: "casting.auth.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to fetch JWKS");
                ApiError::Internal("JWKS endpoint unreachable".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "casting.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(ApiError::Internal(format!(
                "JWKS endpoint returned {}",
                response.status()
            )));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "casting.auth.jwks", error = %e, "Failed to parse JWKS response");
            ApiError::Internal("JWKS response was not a key set".to_string())
        })?;

        let keys = index_by_kid(jwks.keys);

        tracing::info!(
            target: "casting.auth.jwks",
            key_count = keys.len(),
            "JWKS cache refreshed"
        );

        let now = Instant::now();
        let mut cache = self.cache.write().await;
        *cache = Some(CachedJwks {
            keys: keys.clone(),
            fetched_at: now,
            expires_at: now + self.cache_ttl,
        });

        Ok(keys)
    }
}

#[async_trait]
impl KeySource for JwksClient {
    #[instrument(skip(self), fields(kid = %kid))]
    async fn get_key(&self, kid: &str) -> Result<Option<Jwk>, ApiError> {
        match self.cached_key(kid).await {
            CacheLookup::Hit(key) => {
                tracing::debug!(target: "casting.auth.jwks", kid = %kid, "JWKS cache hit");
                return Ok(Some(key));
            }
            CacheLookup::KnownAbsent => {
                tracing::debug!(target: "casting.auth.jwks", kid = %kid, "Unknown kid, refetch throttled");
                return Ok(None);
            }
            CacheLookup::Refresh => {}
        }

        let keys = self.refresh_cache().await?;
        let key = keys.get(kid).cloned();

        if key.is_none() {
            tracing::warn!(target: "casting.auth.jwks", kid = %kid, "Key not found in JWKS after refresh");
        }

        Ok(key)
    }
}

/// Fixed in-memory key set.
#[derive(Debug, Clone, Default)]
pub struct StaticKeySet {
    keys: HashMap<String, Jwk>,
}

impl StaticKeySet {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self {
            keys: index_by_kid(keys),
        }
    }
}

#[async_trait]
impl KeySource for StaticKeySet {
    async fn get_key(&self, kid: &str) -> Result<Option<Jwk>, ApiError> {
        Ok(self.keys.get(kid).cloned())
    }
}

/// Index keys by `kid`, dropping keys that have none.
fn index_by_kid(keys: Vec<Jwk>) -> HashMap<String, Jwk> {
    keys.into_iter()
        .filter_map(|key| key.kid.clone().map(|kid| (kid, key)))
        .collect()
}
