//! Unit of work handed from the redirect path to the click recorder.

use chrono::{DateTime, Utc};

use crate::domain::entities::click::normalize_referrer;
use crate::domain::entities::{ClickEvent, MinimalClickEvent, UtmParams};
use crate::domain::user_agent::UserAgentInfo;

/// Everything the recorder needs to persist one visit.
///
/// Built by the redirect orchestrator after the destination has been chosen
/// and queued without awaiting. All client metadata is optional so missing
/// headers never block the redirect.
///
/// # Usage Flow
///
/// 1. Created by [`crate::application::services::RedirectService`]
/// 2. Queued through [`crate::application::services::ClickDispatcher`] (non-blocking)
/// 3. Picked up by [`crate::domain::click_worker::run_click_worker`]
/// 4. Persisted by [`crate::application::services::ClickRecorder`]
#[derive(Debug, Clone, PartialEq)]
pub struct ClickJob {
    pub link_id: i64,
    pub short_code: String,
    /// The variant actually chosen for this visit.
    pub destination_url: String,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub ip: Option<String>,
    /// Country supplied by an edge proxy header, if any.
    pub country_hint: Option<String>,
    pub language: Option<String>,
    pub screen_width: Option<i32>,
    pub screen_height: Option<i32>,
    pub timezone: Option<String>,
    pub utm: UtmParams,
    pub visitor_id: String,
    pub occurred_at: DateTime<Utc>,
}

impl ClickJob {
    /// Creates a job with no optional client metadata.
    pub fn new(
        link_id: i64,
        short_code: impl Into<String>,
        destination_url: impl Into<String>,
        visitor_id: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            link_id,
            short_code: short_code.into(),
            destination_url: destination_url.into(),
            user_agent: None,
            referrer: None,
            ip: None,
            country_hint: None,
            language: None,
            screen_width: None,
            screen_height: None,
            timezone: None,
            utm: UtmParams::default(),
            visitor_id: visitor_id.into(),
            occurred_at,
        }
    }

    /// Builds the full event, deriving device / OS / browser from the user agent.
    pub fn to_event(&self, country: String, channel: &'static str) -> ClickEvent {
        let ua = UserAgentInfo::parse(self.user_agent.as_deref());

        ClickEvent {
            link_id: self.link_id,
            timestamp: self.occurred_at,
            referrer: normalize_referrer(self.referrer.as_deref()),
            device: ua.device.as_str().to_string(),
            os: ua.os.to_string(),
            browser: ua.browser.to_string(),
            country,
            visitor_id: self.visitor_id.clone(),
            destination_url: self.destination_url.clone(),
            language: self.language.clone(),
            screen_width: self.screen_width,
            screen_height: self.screen_height,
            timezone: self.timezone.clone(),
            utm: self.utm.clone(),
            channel,
        }
    }

    /// Builds the last-resort event.
    pub fn to_minimal(&self) -> MinimalClickEvent {
        let ua = UserAgentInfo::parse(self.user_agent.as_deref());

        MinimalClickEvent {
            link_id: self.link_id,
            timestamp: self.occurred_at,
            device: ua.device.as_str().to_string(),
            os: ua.os.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_job_creation_minimal() {
        let at = Utc::now();
        let job = ClickJob::new(7, "abc", "https://example.com", "v1", at);

        assert_eq!(job.link_id, 7);
        assert_eq!(job.short_code, "abc");
        assert_eq!(job.destination_url, "https://example.com");
        assert_eq!(job.occurred_at, at);
        assert!(job.user_agent.is_none());
        assert!(job.referrer.is_none());
        assert!(job.utm.is_empty());
    }

    #[test]
    fn test_to_event_derives_client_fields() {
        let mut job = ClickJob::new(7, "abc", "https://b.example", "v1", Utc::now());
        job.user_agent = Some(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148 Safari/604.1"
                .to_string(),
        );

        let event = job.to_event("Unknown".to_string(), "store");
        assert_eq!(event.referrer, "direct");
        assert_eq!(event.device, "mobile");
        assert_eq!(event.os, "iOS");
        assert_eq!(event.destination_url, "https://b.example");
        assert_eq!(event.channel, "store");

        let minimal = job.to_minimal();
        assert_eq!(minimal.link_id, 7);
        assert_eq!(minimal.os, "iOS");
    }
}
