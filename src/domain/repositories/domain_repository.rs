//! Repository trait for custom domain bindings.

use async_trait::async_trait;

use crate::domain::entities::DomainBinding;
use crate::error::AppError;

/// Lookup of customer-owned hostnames.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgDomainRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// Finds the binding for a lower-cased hostname, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_binding(&self, host: &str) -> Result<Option<DomainBinding>, AppError>;

    /// Resolves the public handle an owner's bio page is served under.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn find_public_handle(&self, owner_id: i64) -> Result<Option<String>, AppError>;
}
