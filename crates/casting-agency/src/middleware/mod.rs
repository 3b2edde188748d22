//! HTTP middleware.
//!
//! # Components
//!
//! - `auth` - Per-route bearer token and permission checks
//! - `http_metrics` - HTTP request metrics

pub mod auth;
pub mod http_metrics;

pub use auth::{require_permission, AuthState, RouteAuth};
pub use http_metrics::http_metrics_middleware;
