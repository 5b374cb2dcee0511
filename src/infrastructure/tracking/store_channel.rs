//! Store-backed recording channels.

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::services::{ClickChannel, RecordingError};
use crate::domain::click_job::ClickJob;
use crate::domain::entities::click::UNKNOWN_COUNTRY;
use crate::domain::repositories::ClickRepository;

const STORE_CHANNEL: &str = "store";

/// Appends the full event directly, without geolocation.
pub struct StoreChannel {
    clicks: Arc<dyn ClickRepository>,
}

impl StoreChannel {
    pub fn new(clicks: Arc<dyn ClickRepository>) -> Self {
        Self { clicks }
    }
}

#[async_trait]
impl ClickChannel for StoreChannel {
    fn name(&self) -> &'static str {
        STORE_CHANNEL
    }

    async fn send(&self, job: &ClickJob) -> Result<(), RecordingError> {
        let event = job.to_event(UNKNOWN_COUNTRY.to_string(), STORE_CHANNEL);
        self.clicks
            .append(event)
            .await
            .map_err(|e| RecordingError::Store(e.to_string()))
    }
}

/// Appends only timestamp, device and OS.
pub struct MinimalStoreChannel {
    clicks: Arc<dyn ClickRepository>,
}

impl MinimalStoreChannel {
    pub fn new(clicks: Arc<dyn ClickRepository>) -> Self {
        Self { clicks }
    }
}

#[async_trait]
impl ClickChannel for MinimalStoreChannel {
    fn name(&self) -> &'static str {
        "minimal"
    }

    async fn send(&self, job: &ClickJob) -> Result<(), RecordingError> {
        self.clicks
            .append_minimal(job.to_minimal())
            .await
            .map_err(|e| RecordingError::Store(e.to_string()))
    }
}
