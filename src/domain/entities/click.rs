//! Click event entities appended by the click recorder.

use chrono::{DateTime, Utc};

/// Referrer value stored when the visit had no `Referer` header.
pub const DIRECT_REFERRER: &str = "direct";

/// Country value stored when geolocation failed or was not attempted.
pub const UNKNOWN_COUNTRY: &str = "Unknown";

/// Campaign parameters copied from the short-link query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UtmParams {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub term: Option<String>,
    pub content: Option<String>,
}

impl UtmParams {
    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.medium.is_none()
            && self.campaign.is_none()
            && self.term.is_none()
            && self.content.is_none()
    }
}

/// An immutable record of one resolved visit.
///
/// `destination_url` is the variant actually chosen, so A/B results can be
/// attributed per destination.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickEvent {
    pub link_id: i64,
    pub timestamp: DateTime<Utc>,
    pub referrer: String,
    pub device: String,
    pub os: String,
    pub browser: String,
    pub country: String,
    pub visitor_id: String,
    pub destination_url: String,
    pub language: Option<String>,
    pub screen_width: Option<i32>,
    pub screen_height: Option<i32>,
    pub timezone: Option<String>,
    pub utm: UtmParams,
    /// Name of the channel that persisted the event.
    pub channel: &'static str,
}

/// Last-resort event shape: only what can be derived without any lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinimalClickEvent {
    pub link_id: i64,
    pub timestamp: DateTime<Utc>,
    pub device: String,
    pub os: String,
}

/// Normalizes an optional referrer to the stored representation.
pub fn normalize_referrer(referrer: Option<&str>) -> String {
    match referrer.map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => DIRECT_REFERRER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_referrer_is_direct() {
        assert_eq!(normalize_referrer(None), "direct");
        assert_eq!(normalize_referrer(Some("  ")), "direct");
        assert_eq!(
            normalize_referrer(Some("https://google.com")),
            "https://google.com"
        );
    }

    #[test]
    fn test_utm_params_empty() {
        assert!(UtmParams::default().is_empty());

        let utm = UtmParams {
            campaign: Some("spring".to_string()),
            ..Default::default()
        };
        assert!(!utm.is_empty());
    }
}
