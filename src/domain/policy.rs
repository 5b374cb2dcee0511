//! Policy evaluation: decides whether a link may be visited right now.
//!
//! The evaluator is a pure function of the link and the current instant.
//! Checks run in a fixed order and the first violation wins, so an expired
//! link is always reported as expired even when its click limit is also
//! exhausted.

use chrono::{DateTime, Utc};

use crate::domain::entities::Link;
use crate::domain::entities::link::is_widget_url;
use crate::error::ResolveError;

/// A link that passed every policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Destination before any A/B, device or geo override.
    pub base_url: String,
    /// The caller must obtain a matching password before redirecting.
    pub requires_password: bool,
}

/// Evaluates all policies, including the password gate.
///
/// # Errors
///
/// Returns the first violated policy as a terminal [`ResolveError`].
pub fn evaluate(link: &Link, now: DateTime<Utc>) -> Result<Resolution, ResolveError> {
    let base_url = check_policies(link, now)?;

    Ok(Resolution {
        base_url,
        requires_password: link.is_password_protected(),
    })
}

/// Re-runs the policies once the password gate has been passed.
///
/// # Errors
///
/// Same as [`evaluate`]; time-based policies may have changed since the
/// challenge was shown.
pub fn evaluate_unlocked(link: &Link, now: DateTime<Utc>) -> Result<Resolution, ResolveError> {
    let base_url = check_policies(link, now)?;

    Ok(Resolution {
        base_url,
        requires_password: false,
    })
}

fn check_policies(link: &Link, now: DateTime<Utc>) -> Result<String, ResolveError> {
    if link.expiration_date.is_some_and(|exp| now > exp) {
        return Err(ResolveError::Expired);
    }

    if link.start_date.is_some_and(|start| now < start) {
        return Err(ResolveError::NotYetActive);
    }

    if link.max_clicks.is_some_and(|max| link.clicks >= max) {
        return Err(ResolveError::ClickLimitReached);
    }

    let escape_hatch = [
        link.metadata.embed_url.as_deref(),
        link.metadata.url.as_deref(),
    ]
    .into_iter()
    .flatten()
    .find(|url| is_usable(url));

    if link.is_widget() {
        return escape_hatch
            .map(str::to_string)
            .ok_or(ResolveError::InvalidWidget);
    }

    Ok(escape_hatch.unwrap_or(&link.original_url).to_string())
}

fn is_usable(url: &str) -> bool {
    !url.trim().is_empty() && !is_widget_url(url)
}
