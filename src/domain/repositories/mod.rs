//! Repository trait definitions for the domain layer.
//!
//! These traits abstract the storage the engine reads from and appends to.
//! Concrete implementations live in `crate::infrastructure::persistence`;
//! mock implementations are generated via `mockall` for unit tests.
//!
//! # Available Repositories
//!
//! - [`LinkRepository`] - Link lookup and click counter updates
//! - [`ClickRepository`] - Append-only click event store
//! - [`DomainRepository`] - Custom domain bindings and public handles

pub mod click_repository;
pub mod domain_repository;
pub mod link_repository;

pub use click_repository::ClickRepository;
pub use domain_repository::DomainRepository;
pub use link_repository::LinkRepository;

#[cfg(test)]
pub use click_repository::MockClickRepository;
#[cfg(test)]
pub use domain_repository::MockDomainRepository;
#[cfg(test)]
pub use link_repository::MockLinkRepository;
