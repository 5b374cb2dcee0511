//! Infrastructure layer for external integrations.
//!
//! This layer implements interfaces defined by the domain and application
//! layers against PostgreSQL, Redis and HTTP services.
//!
//! # Modules
//!
//! - [`cache`] - Caching abstractions (Redis and no-op implementations)
//! - [`geo`] - IP geolocation clients
//! - [`persistence`] - PostgreSQL repository implementations
//! - [`tracking`] - Click recording channels

pub mod cache;
pub mod geo;
pub mod persistence;
pub mod tracking;
