//! Link lookup service.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::services::retry::BackoffRetrier;
use crate::domain::entities::Link;
use crate::domain::repositories::LinkRepository;
use crate::error::{AppError, ResolveError};

/// Resolves short codes to links, retrying transient storage failures.
///
/// A missing link is an answer, not a failure, and is never retried.
pub struct LinkService {
    link_repository: Arc<dyn LinkRepository>,
    retrier: BackoffRetrier,
}

impl LinkService {
    pub fn new(link_repository: Arc<dyn LinkRepository>, retrier: BackoffRetrier) -> Self {
        Self {
            link_repository,
            retrier,
        }
    }

    /// Fetches the link behind `code`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::NotFound`] if no link has this code
    /// - [`ResolveError::LookupFailed`] if storage kept failing after all retries,
    ///   or the row could not be read
    pub async fn lookup(&self, code: &str) -> Result<Link, ResolveError> {
        let repo = &self.link_repository;

        let found = self
            .retrier
            .execute_if(
                || repo.find_by_code(code),
                AppError::is_transient,
                |attempt, err| {
                    warn!(code, attempt, error = %err, "Link lookup failed, retrying");
                },
            )
            .await;

        match found {
            Ok(Some(link)) => Ok(link),
            Ok(None) => {
                debug!(code, "Short code not found");
                Err(ResolveError::NotFound)
            }
            Err(e) => {
                warn!(code, error = %e, "Link lookup gave up");
                Err(ResolveError::LookupFailed)
            }
        }
    }

    /// Reports whether the link store is reachable.
    pub async fn is_healthy(&self) -> bool {
        self.link_repository.ping().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::retry::RetryPolicy;
    use crate::domain::repositories::MockLinkRepository;
    use serde_json::json;
    use std::time::Duration;

    fn fast_retrier() -> BackoffRetrier {
        BackoffRetrier::new(RetryPolicy::new(
            3,
            Duration::from_millis(1),
            Duration::from_millis(5),
        ))
    }

    #[tokio::test]
    async fn test_lookup_found() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code()
            .withf(|code| code == "abc")
            .times(1)
            .returning(|code| {
                Ok(Some(Link::new(
                    1,
                    code.to_string(),
                    "https://example.com".to_string(),
                )))
            });

        let service = LinkService::new(Arc::new(repo), fast_retrier());
        let link = service.lookup("abc").await.unwrap();
        assert_eq!(link.original_url, "https://example.com");
    }

    #[tokio::test]
    async fn test_missing_link_is_not_retried() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code().times(1).returning(|_| Ok(None));

        let service = LinkService::new(Arc::new(repo), fast_retrier());
        assert_eq!(service.lookup("nope").await, Err(ResolveError::NotFound));
    }

    #[tokio::test]
    async fn test_storage_failures_exhaust_into_lookup_failed() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code()
            .times(4)
            .returning(|_| Err(AppError::internal("Database error", json!({}))));

        let service = LinkService::new(Arc::new(repo), fast_retrier());
        assert_eq!(service.lookup("abc").await, Err(ResolveError::LookupFailed));
    }

    #[tokio::test]
    async fn test_unreadable_row_is_not_retried() {
        let mut repo = MockLinkRepository::new();
        repo.expect_find_by_code()
            .times(1)
            .returning(|_| Err(AppError::data("Unreadable row", json!({}))));

        let service = LinkService::new(Arc::new(repo), fast_retrier());
        assert_eq!(service.lookup("abc").await, Err(ResolveError::LookupFailed));
    }
}
