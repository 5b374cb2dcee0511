//! Primary recording channel: the tracking API over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::api::dto::track_click::TrackClickRequest;
use crate::application::services::{ClickChannel, RecordingError};
use crate::domain::click_job::ClickJob;

/// Channel label, shared with the server side of the tracking API.
pub const TRACKING_API_CHANNEL: &str = "tracking_api";

/// Posts the click payload as JSON; any 2xx answer counts as recorded.
pub struct HttpTrackingChannel {
    client: Client,
    endpoint: String,
}

impl HttpTrackingChannel {
    /// Builds a channel with its own client whose timeout matches the channel budget.
    ///
    /// # Errors
    ///
    /// Returns [`reqwest::Error`] if the TLS backend cannot be initialised.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("link-resolver/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ClickChannel for HttpTrackingChannel {
    fn name(&self) -> &'static str {
        TRACKING_API_CHANNEL
    }

    async fn send(&self, job: &ClickJob) -> Result<(), RecordingError> {
        let payload = TrackClickRequest::from(job);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RecordingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RecordingError::Rejected(status.as_u16()));
        }

        debug!(link_id = job.link_id, %status, "Tracking API accepted click");
        Ok(())
    }
}
