//! Casting Agency configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! redacted in Debug output.

use jsonwebtoken::Algorithm;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default accepted signing algorithm (what Auth0 tenants issue).
pub const DEFAULT_ALGORITHMS: &str = "RS256";

/// Default database pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

/// Signing algorithms the token verifier knows how to build keys for.
const SUPPORTED_ALGORITHMS: &[Algorithm] = &[
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::EdDSA,
];

/// Which entity store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// PostgreSQL via sqlx.
    Postgres,

    /// In-process store; data is lost on restart.
    Memory,
}

impl FromStr for StoreKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(ConfigError::InvalidStore(format!(
                "CASTING_STORE must be 'postgres' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

/// Casting Agency configuration.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection URL. Empty when the memory store is selected.
    pub database_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Identity issuer domain, e.g. "casting.eu.auth0.com".
    pub auth_domain: String,

    /// Algorithms accepted on incoming tokens.
    pub algorithms: Vec<Algorithm>,

    /// Expected `aud` claim.
    pub api_audience: String,

    /// URL of the issuer's JSON Web Key Set.
    pub jwks_url: String,

    /// How long a fetched key set may be reused. Zero disables caching.
    pub jwks_cache_ttl: Duration,

    /// Skip token verification and permission checks entirely.
    ///
    /// Only for non-production testing.
    pub auth_bypass: bool,

    /// Entity store backend.
    pub store: StoreKind,

    /// Maximum database pool connections.
    pub db_max_connections: u32,
}

impl Config {
    /// Expected `iss` claim, derived from the issuer domain.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.auth_domain)
    }
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("auth_domain", &self.auth_domain)
            .field("algorithms", &self.algorithms)
            .field("api_audience", &self.api_audience)
            .field("jwks_url", &self.jwks_url)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("auth_bypass", &self.auth_bypass)
            .field("store", &self.store)
            .field("db_max_connections", &self.db_max_connections)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid algorithm configuration: {0}")]
    InvalidAlgorithms(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidCacheTtl(String),

    #[error("Invalid auth bypass configuration: {0}")]
    InvalidAuthBypass(String),

    #[error("Invalid store configuration: {0}")]
    InvalidStore(String),

    #[error("Invalid database pool configuration: {0}")]
    InvalidPoolSize(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let store = match vars.get("CASTING_STORE") {
            Some(value) => value.parse()?,
            None => StoreKind::Postgres,
        };

        let database_url = match (vars.get("DATABASE_URL"), store) {
            (Some(url), _) => url.clone(),
            (None, StoreKind::Memory) => String::new(),
            (None, StoreKind::Postgres) => {
                return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()))
            }
        };

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let auth_domain = required(vars, "AUTH_DOMAIN")?;
        let api_audience = required(vars, "API_AUDIENCE")?;

        let algorithms = parse_algorithms(
            vars.get("ALGORITHMS")
                .map(String::as_str)
                .unwrap_or(DEFAULT_ALGORITHMS),
        )?;

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| format!("https://{}/.well-known/jwks.json", auth_domain));

        let jwks_cache_ttl = if let Some(value_str) = vars.get("JWKS_CACHE_TTL_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidCacheTtl(format!(
                    "JWKS_CACHE_TTL_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;
            Duration::from_secs(value)
        } else {
            Duration::ZERO
        };

        let auth_bypass = match vars.get("AUTH_BYPASS") {
            Some(value) => parse_bool(value).ok_or_else(|| {
                ConfigError::InvalidAuthBypass(format!(
                    "AUTH_BYPASS must be 'true' or 'false', got '{}'",
                    value
                ))
            })?,
            None => false,
        };

        let db_max_connections = if let Some(value_str) = vars.get("DB_MAX_CONNECTIONS") {
            let value: u32 = value_str.parse().map_err(|e| {
                ConfigError::InvalidPoolSize(format!(
                    "DB_MAX_CONNECTIONS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidPoolSize(
                    "DB_MAX_CONNECTIONS must be greater than 0".to_string(),
                ));
            }

            value
        } else {
            DEFAULT_DB_MAX_CONNECTIONS
        };

        Ok(Config {
            database_url,
            bind_address,
            auth_domain,
            algorithms,
            api_audience,
            jwks_url,
            jwks_cache_ttl,
            auth_bypass,
            store,
            db_max_connections,
        })
    }
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

/// Parse a comma-separated algorithm list such as `RS256,RS384`.
fn parse_algorithms(raw: &str) -> Result<Vec<Algorithm>, ConfigError> {
    let mut algorithms = Vec::new();

    for name in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let alg = Algorithm::from_str(name).map_err(|_| {
            ConfigError::InvalidAlgorithms(format!("unknown algorithm '{}'", name))
        })?;

        if !SUPPORTED_ALGORITHMS.contains(&alg) {
            return Err(ConfigError::InvalidAlgorithms(format!(
                "algorithm '{}' is not supported for JWKS verification",
                name
            )));
        }

        if !algorithms.contains(&alg) {
            algorithms.push(alg);
        }
    }

    if algorithms.is_empty() {
        return Err(ConfigError::InvalidAlgorithms(
            "ALGORITHMS must list at least one algorithm".to_string(),
        ));
    }

    Ok(algorithms)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
