//! IP geolocation implementations.

use async_trait::async_trait;
use reqwest::Client;
use std::net::IpAddr;
use std::time::Duration;

use crate::domain::geo::{GeoError, GeoLocator, normalize_country};

/// Placeholder replaced with the client IP in the lookup URL template.
pub const IP_PLACEHOLDER: &str = "{ip}";

/// Looks up countries through an HTTP service answering with a bare country code.
///
/// The URL template must contain `{ip}`, e.g. `https://ipapi.co/{ip}/country/`.
pub struct HttpGeoLocator {
    client: Client,
    url_template: String,
}

impl HttpGeoLocator {
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the HTTP client cannot be built.
    pub fn new(url_template: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url_template: url_template.into(),
        })
    }
}

#[async_trait]
impl GeoLocator for HttpGeoLocator {
    async fn country_for(&self, ip: &str) -> Result<Option<String>, GeoError> {
        let Ok(addr) = ip.parse::<IpAddr>() else {
            return Ok(None);
        };
        if !is_public(&addr) {
            return Ok(None);
        }

        let url = self.url_template.replace(IP_PLACEHOLDER, &addr.to_string());
        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| GeoError::Unavailable(e.to_string()))?
            .text()
            .await
            .map_err(|e| GeoError::BadResponse(e.to_string()))?;

        Ok(normalize_country(&body))
    }
}

/// Used when no lookup service is configured.
pub struct NullGeoLocator;

#[async_trait]
impl GeoLocator for NullGeoLocator {
    async fn country_for(&self, _ip: &str) -> Result<Option<String>, GeoError> {
        Ok(None)
    }
}

fn is_public(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast())
        }
        IpAddr::V6(v6) => !(v6.is_loopback() || v6.is_unspecified()),
    }
}
