//! Casting Agency Service Library
//!
//! A REST API for managing the actors and movies of a casting agency, and
//! which actors appear in which movies. Every data endpoint is protected by
//! bearer tokens carrying fine-grained permissions.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Bearer token verification against a JWKS and permission checks
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Per-route authorization and HTTP metrics
//! - `models` - Records, write inputs and response envelopes
//! - `observability` - Prometheus metrics
//! - `repositories` - Entity store (PostgreSQL and in-memory)
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
