//! # API Shared
//!
//! Shared utilities and definitions for clinic APIs.
//!
//! Contains:
//! - JSON wire types with OpenAPI schemas (`wire` module)
//! - Shared services like `HealthService`
//! - API key authentication utilities

pub mod auth;
pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
