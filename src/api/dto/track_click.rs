//! DTOs for the click tracking endpoint.
//!
//! The same payload is sent by the recorder's HTTP channel and accepted by
//! `POST /api/track-click`.

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use validator::Validate;

use crate::domain::click_job::ClickJob;

/// One click as reported to the tracking API.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackClickRequest {
    #[validate(range(min = 1, message = "linkId must be positive"))]
    pub link_id: i64,

    #[validate(length(min = 1, max = 64))]
    pub short_code: Option<String>,

    #[validate(url(message = "Invalid destination URL"))]
    pub destination_url: Option<String>,

    #[validate(length(max = 1024))]
    pub user_agent: Option<String>,

    #[validate(length(max = 2048))]
    pub referrer: Option<String>,

    #[validate(range(min = 0, max = 20000))]
    pub screen_width: Option<i32>,

    #[validate(range(min = 0, max = 20000))]
    pub screen_height: Option<i32>,

    #[validate(length(max = 64))]
    pub timezone: Option<String>,

    #[validate(length(max = 35))]
    pub language: Option<String>,

    #[validate(length(min = 1, max = 128))]
    pub visitor_id: Option<String>,

    #[validate(length(max = 45))]
    pub ip_address: Option<String>,

    #[validate(length(max = 255))]
    pub utm_source: Option<String>,
    #[validate(length(max = 255))]
    pub utm_medium: Option<String>,
    #[validate(length(max = 255))]
    pub utm_campaign: Option<String>,
    #[validate(length(max = 255))]
    pub utm_term: Option<String>,
    #[validate(length(max = 255))]
    pub utm_content: Option<String>,
}

/// Builds the payload for a visit, clipping free-form visitor input to the
/// limits the endpoint validates.
impl From<&ClickJob> for TrackClickRequest {
    fn from(job: &ClickJob) -> Self {
        let utm = |value: &Option<String>| clip_opt(value, 255);

        Self {
            link_id: job.link_id,
            short_code: Some(clip(&job.short_code, 64)),
            destination_url: Some(job.destination_url.clone()),
            user_agent: clip_opt(&job.user_agent, 1024),
            referrer: clip_opt(&job.referrer, 2048),
            screen_width: job.screen_width,
            screen_height: job.screen_height,
            timezone: clip_opt(&job.timezone, 64),
            language: clip_opt(&job.language, 35),
            visitor_id: Some(clip(&job.visitor_id, 128)),
            ip_address: clip_opt(&job.ip, 45),
            utm_source: utm(&job.utm.source),
            utm_medium: utm(&job.utm.medium),
            utm_campaign: utm(&job.utm.campaign),
            utm_term: utm(&job.utm.term),
            utm_content: utm(&job.utm.content),
        }
    }
}

/// First `max` characters of `value`.
fn clip(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

fn clip_opt(value: &Option<String>, max: usize) -> Option<String> {
    value.as_deref().map(|v| clip(v, max))
}

/// Acknowledgement for an accepted click.
#[derive(Debug, Serialize, Deserialize)]
pub struct TrackClickResponse {
    pub accepted: bool,
    pub visitor_id: String,
}
