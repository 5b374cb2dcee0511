//! Core domain entities.
//!
//! Entities are plain data structures; the decision logic that reads them
//! lives in [`crate::domain::policy`], [`crate::domain::variant`] and
//! [`crate::domain::deep_link`].
//!
//! # Entity Types
//!
//! - [`Link`] - A short link with lifecycle, access and override settings
//! - [`ClickEvent`] / [`MinimalClickEvent`] - Recorded visits
//! - [`DomainBinding`] - A customer-owned hostname bound to an owner

pub mod click;
pub mod domain_binding;
pub mod link;

pub use click::{ClickEvent, MinimalClickEvent, UtmParams};
pub use domain_binding::{BindingStatus, DomainBinding, TargetType};
pub use link::{AbTestConfig, AbVariant, Link, LinkMetadata, LinkType, SmartRedirects};
