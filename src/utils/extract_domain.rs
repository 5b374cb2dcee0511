//! Host extraction from HTTP request headers.

use crate::AppError;
use axum::http::{HeaderMap, header};
use serde_json::json;

/// Normalizes a raw `Host` value: port stripped, lower-cased, trailing dot removed.
///
/// IPv6 literals keep their brackets (`[::1]:8080` becomes `[::1]`).
///
/// # Examples
///
/// ```
/// use link_resolver::utils::extract_domain::normalize_host;
///
/// assert_eq!(normalize_host("Go.Acme.COM:8443"), "go.acme.com");
/// assert_eq!(normalize_host("[::1]:8080"), "[::1]");
/// ```
pub fn normalize_host(raw: &str) -> String {
    let raw = raw.trim();

    let host = if raw.starts_with('[') {
        match raw.find(']') {
            Some(end_bracket) => &raw[..=end_bracket],
            None => raw,
        }
    } else {
        raw.split(':').next().unwrap_or(raw)
    };

    host.trim_end_matches('.').to_ascii_lowercase()
}

/// Extracts the normalized host from the `Host` header.
///
/// # Errors
///
/// Returns [`AppError::Validation`] if the `Host` header is missing, not
/// valid UTF-8, or empty.
pub fn extract_domain_from_headers(headers: &HeaderMap) -> Result<String, AppError> {
    let host = headers
        .get(header::HOST)
        .ok_or_else(|| AppError::bad_request("Missing Host header", json!({})))?
        .to_str()
        .map_err(|_| AppError::bad_request("Invalid Host header", json!({})))?;

    let domain = normalize_host(host);
    if domain.is_empty() {
        return Err(AppError::bad_request("Empty Host header", json!({})));
    }

    Ok(domain)
}
