//! HTTP layer for request/response handling.
//!
//! This layer translates HTTP requests into application operations and
//! formats responses: JSON for the API, HTML pages for visitors.
//!
//! # Modules
//!
//! - [`dto`] - Data Transfer Objects for request/response serialization
//! - [`handlers`] - HTTP request handlers
//! - [`middleware`] - Domain routing, rate limiting and tracing middleware
//! - [`routes`] - API route configuration

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod routes;
