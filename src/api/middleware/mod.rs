//! HTTP middleware for request processing and protection.
//!
//! Provides host-based rewriting, rate limiting, and observability middleware.

pub mod domain_router;
pub mod rate_limit;
pub mod tracing;
