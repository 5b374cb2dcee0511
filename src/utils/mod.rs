//! Request helpers shared by the HTTP layer and the domain router.
//!
//! - [`extract_domain`] - Host header normalization
//! - [`visitor`] - Client IP, edge country and language extraction

pub mod extract_domain;
pub mod visitor;
