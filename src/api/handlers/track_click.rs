//! Server side of the primary click recording channel.

use axum::{Json, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use tracing::debug;
use validator::Validate;

use crate::api::dto::track_click::{TrackClickRequest, TrackClickResponse};
use crate::domain::click_job::ClickJob;
use crate::domain::entities::UtmParams;
use crate::domain::entities::click::UNKNOWN_COUNTRY;
use crate::error::AppError;
use crate::infrastructure::tracking::TRACKING_API_CHANNEL;
use crate::state::AppState;

/// Records one click reported by the redirect path.
///
/// # Endpoint
///
/// `POST /api/track-click`
///
/// # Request Body
///
/// ```json
/// {
///   "linkId": 42,
///   "shortCode": "abc123",
///   "destinationUrl": "https://example.com/b",
///   "userAgent": "Mozilla/5.0 ...",
///   "referrer": "https://news.example.com",
///   "ipAddress": "203.0.113.7",
///   "utmSource": "newsletter"
/// }
/// ```
///
/// Device, OS and browser are derived from `userAgent`; the country comes
/// from geolocating `ipAddress` (`"Unknown"` when that fails). A missing
/// `visitorId` is computed from user agent and IP.
///
/// # Errors
///
/// Returns 400 Bad Request if validation fails.
/// Returns 500 Internal Server Error if the event cannot be stored.
pub async fn track_click_handler(
    State(state): State<AppState>,
    Json(payload): Json<TrackClickRequest>,
) -> Result<(StatusCode, Json<TrackClickResponse>), AppError> {
    payload.validate()?;

    let now = Utc::now();
    let visitor_id = payload.visitor_id.clone().unwrap_or_else(|| {
        state.redirect_service.visitor_id(
            payload.user_agent.as_deref(),
            payload.ip_address.as_deref(),
            now,
        )
    });

    let country = geolocate(&state, payload.ip_address.as_deref()).await;
    let job = into_job(payload, visitor_id.clone(), now);

    state
        .click_repository
        .append(job.to_event(country, TRACKING_API_CHANNEL))
        .await?;

    debug!(link_id = job.link_id, "Tracked click");

    Ok((
        StatusCode::ACCEPTED,
        Json(TrackClickResponse {
            accepted: true,
            visitor_id,
        }),
    ))
}

async fn geolocate(state: &AppState, ip: Option<&str>) -> String {
    let Some(ip) = ip else {
        return UNKNOWN_COUNTRY.to_string();
    };

    match state
        .geo_retrier
        .execute(|| state.geo.country_for(ip))
        .await
    {
        Ok(Some(country)) => country,
        Ok(None) => UNKNOWN_COUNTRY.to_string(),
        Err(e) => {
            debug!(error = %e, "Geolocation failed, storing Unknown");
            UNKNOWN_COUNTRY.to_string()
        }
    }
}

fn into_job(payload: TrackClickRequest, visitor_id: String, now: DateTime<Utc>) -> ClickJob {
    let mut job = ClickJob::new(
        payload.link_id,
        payload.short_code.unwrap_or_default(),
        payload.destination_url.unwrap_or_default(),
        visitor_id,
        now,
    );
    job.user_agent = payload.user_agent;
    job.referrer = payload.referrer;
    job.ip = payload.ip_address;
    job.language = payload.language;
    job.screen_width = payload.screen_width;
    job.screen_height = payload.screen_height;
    job.timezone = payload.timezone;
    job.utm = UtmParams {
        source: payload.utm_source,
        medium: payload.utm_medium,
        campaign: payload.utm_campaign,
        term: payload.utm_term,
        content: payload.utm_content,
    };
    job
}
