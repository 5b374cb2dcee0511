//! Repository trait for the append-only click event store.

use async_trait::async_trait;

use crate::domain::entities::{ClickEvent, MinimalClickEvent};
use crate::error::AppError;

/// Append-only sink for visit records.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgClickRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickRepository: Send + Sync {
    /// Appends a full click event.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the link does not exist.
    /// Returns [`AppError::Internal`] on database errors.
    async fn append(&self, event: ClickEvent) -> Result<(), AppError>;

    /// Appends the last-resort event shape.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] on database errors.
    async fn append_minimal(&self, event: MinimalClickEvent) -> Result<(), AppError>;
}
