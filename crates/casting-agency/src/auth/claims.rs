//! JWT claims structure.
//!
//! Contains the claims extracted from validated tokens. The `sub` field is
//! redacted in Debug output to prevent exposure in logs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claim set of a verified access token.
///
/// Only `sub` and `permissions` are read by the service; every other claim
/// (`aud`, `iss`, `exp`, `azp`, ...) is kept in `extra`.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user or client id). Redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Permission strings granted by the issuer, e.g. `"post:actors"`.
    ///
    /// `None` when the token has no `permissions` claim at all, which is
    /// distinct from an empty list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Vec<String>>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &self.sub.as_ref().map(|_| "[REDACTED]"))
            .field("permissions", &self.permissions)
            .field("extra", &self.extra.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Claims {
    /// Whether `permission` is listed exactly in the `permissions` claim.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|p| p == permission))
    }

    /// Subject for log fields, `"anonymous"` when absent.
    pub fn subject(&self) -> &str {
        self.sub.as_deref().unwrap_or("anonymous")
    }
}
