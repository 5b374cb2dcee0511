//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx runtime
//! queries with `FromRow` mapping; JSONB columns decode through
//! `sqlx::types::Json`.
//!
//! # Repositories
//!
//! - [`PgLinkRepository`] - Link lookup and click counters
//! - [`PgClickRepository`] - Click event appends
//! - [`PgDomainRepository`] - Custom domain bindings

pub mod pg_click_repository;
pub mod pg_domain_repository;
pub mod pg_link_repository;

pub use pg_click_repository::PgClickRepository;
pub use pg_domain_repository::PgDomainRepository;
pub use pg_link_repository::PgLinkRepository;
