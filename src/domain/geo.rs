//! IP geolocation seam.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeoError {
    #[error("geolocation request failed: {0}")]
    Unavailable(String),
    #[error("geolocation response could not be read: {0}")]
    BadResponse(String),
}

/// Maps a client IP to an ISO 3166-1 alpha-2 country code.
///
/// # Implementations
///
/// - [`crate::infrastructure::geo::HttpGeoLocator`] - lookup service over HTTP
/// - [`crate::infrastructure::geo::NullGeoLocator`] - always unknown
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GeoLocator: Send + Sync {
    /// Returns the upper-case country code, or `None` when the IP is not located
    /// (private ranges, unknown blocks).
    ///
    /// # Errors
    ///
    /// Returns [`GeoError`] when the lookup itself failed; callers may retry.
    async fn country_for(&self, ip: &str) -> Result<Option<String>, GeoError>;
}

/// Accepts only two ASCII letters and upper-cases them.
pub fn normalize_country(code: &str) -> Option<String> {
    let code = code.trim();
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()))
        .then(|| code.to_ascii_uppercase())
}
