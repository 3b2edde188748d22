//! Observability module.
//!
//! Provides metrics definitions and recording helpers.

pub mod metrics;
