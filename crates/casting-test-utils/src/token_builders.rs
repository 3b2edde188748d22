//! Builder for test access token claims.

use chrono::{Duration, Utc};
use serde_json::json;

/// Audience the test server expects.
pub const TEST_AUDIENCE: &str = "casting-test-api";

/// Issuer domain the test server is configured with.
pub const TEST_AUTH_DOMAIN: &str = "casting-test.auth.local";

/// Builder for JWT claims in the shape an Auth0-style issuer emits.
///
/// # Example
/// ```rust,ignore
/// let claims = TestTokenBuilder::new()
///     .with_permissions(&["get:actors", "post:actors"])
///     .expires_in(3600)
///     .build();
/// let token = keypair.sign_token(&claims);
/// ```
pub struct TestTokenBuilder {
    sub: String,
    aud: String,
    iss: String,
    exp: Option<i64>,
    iat: i64,
    permissions: Option<Vec<String>>,
}

impl TestTokenBuilder {
    /// Defaults: valid audience and issuer, one hour lifetime, no `permissions` claim.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "auth0|test-subject".to_string(),
            aud: TEST_AUDIENCE.to_string(),
            iss: format!("https://{}/", TEST_AUTH_DOMAIN),
            exp: Some((now + Duration::seconds(3600)).timestamp()),
            iat: now.timestamp(),
            permissions: None,
        }
    }

    pub fn for_user(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    pub fn with_permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = Some(permissions.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.aud = audience.to_string();
        self
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set expiration in seconds from now. Negative values produce an expired token.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Drop the `exp` claim entirely.
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Build the claims as a JSON value.
    pub fn build(self) -> serde_json::Value {
        let mut claims = json!({
            "sub": self.sub,
            "aud": self.aud,
            "iss": self.iss,
            "iat": self.iat,
        });

        if let Some(exp) = self.exp {
            claims["exp"] = json!(exp);
        }
        if let Some(permissions) = self.permissions {
            claims["permissions"] = json!(permissions);
        }

        claims
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
