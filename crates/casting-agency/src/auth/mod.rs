//! Authentication and authorization.
//!
//! Bearer tokens are verified against the issuer's JWKS (`jwt`, `jwks`) and
//! the resulting claim set is checked for the permission a route requires
//! (`permissions`).

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::Claims;
pub use jwks::{Jwk, JwksClient, KeySource, StaticKeySet};
pub use jwt::{extract_bearer_token, TokenVerifier};
pub use permissions::check_permissions;
