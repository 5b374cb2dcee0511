//! Application layer services orchestrating the domain.
//!
//! Services consume repository and channel traits and expose the operations
//! the HTTP layer and the admin CLI call.
//!
//! # Available Services
//!
//! - [`services::redirect_service::RedirectService`] - Short link resolution pipeline
//! - [`services::link_service::LinkService`] - Retried link lookup
//! - [`services::click_recorder::ClickRecorder`] - Click recording fallback chain
//! - [`services::domain_routing::DomainRoutingService`] - Host-based path rewriting
//! - [`services::retry::BackoffRetrier`] - Exponential backoff for flaky calls

pub mod services;
