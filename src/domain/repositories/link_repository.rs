//! Repository trait for short link data access.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::Link;
use crate::error::AppError;

/// Read access to links plus the two counter fields the engine owns.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgLinkRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkRepository: Send + Sync {
    /// Finds a link by its short code.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Link))` if found
    /// - `Ok(None)` if not found
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors. Callers retry these.
    async fn find_by_code(&self, code: &str) -> Result<Option<Link>, AppError>;

    /// Adds one to `clicks` and sets `last_clicked_at`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::NotFound`] if the link no longer exists.
    /// Returns [`AppError::Internal`] on database errors.
    async fn increment_clicks(&self, id: i64, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Cheap connectivity check used by the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] when the store is unreachable.
    async fn ping(&self) -> Result<(), AppError>;
}
