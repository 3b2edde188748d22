//! Test utilities for the Casting Agency service.
//!
//! - `crypto_fixtures`: deterministic Ed25519 keys and a fixed RSA key, with
//!   matching JWKs and token signing
//! - `token_builders`: fluent builder for access token claims
//! - `server_harness`: real server on a random port backed by the in-memory
//!   store and a mocked JWKS endpoint

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
