//! Durable click recording with a fallback chain.
//!
//! Each job walks the channels in order (tracking API, direct store append,
//! minimal append) and stops at the first success. Every channel gets one
//! attempt bounded by a timeout, so the whole chain finishes well before the
//! deep-link fallback fires on the client. Afterwards the link's click
//! counter is bumped whatever the chain outcome was; the two writes are not
//! transactional.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, warn};

use crate::domain::click_job::ClickJob;
use crate::domain::click_worker::ClickHandler;
use crate::domain::repositories::LinkRepository;

/// Failure of a single recording channel. Always absorbed by the recorder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordingError {
    #[error("channel timed out after {0:?}")]
    Timeout(Duration),
    #[error("tracking endpoint answered {0}")]
    Rejected(u16),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("store error: {0}")]
    Store(String),
}

/// One way of persisting a click.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickChannel: Send + Sync {
    /// Label used in logs and the `channel` metric label.
    fn name(&self) -> &'static str;

    async fn send(&self, job: &ClickJob) -> Result<(), RecordingError>;
}

/// Which link of the chain persisted the click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingOutcome {
    Primary,
    Secondary,
    Tertiary,
    Lost,
}

impl RecordingOutcome {
    fn from_position(position: usize) -> Self {
        match position {
            0 => Self::Primary,
            1 => Self::Secondary,
            _ => Self::Tertiary,
        }
    }
}

/// Walks the fallback chain for each job.
pub struct ClickRecorder {
    primary: Arc<dyn ClickChannel>,
    secondary: Arc<dyn ClickChannel>,
    tertiary: Arc<dyn ClickChannel>,
    link_repository: Arc<dyn LinkRepository>,
    channel_timeout: Duration,
}

impl ClickRecorder {
    pub fn new(
        primary: Arc<dyn ClickChannel>,
        secondary: Arc<dyn ClickChannel>,
        tertiary: Arc<dyn ClickChannel>,
        link_repository: Arc<dyn LinkRepository>,
        channel_timeout: Duration,
    ) -> Self {
        Self {
            primary,
            secondary,
            tertiary,
            link_repository,
            channel_timeout,
        }
    }

    /// Records one click. Never fails; the outcome is informational.
    pub async fn record(&self, job: &ClickJob) -> RecordingOutcome {
        let outcome = self.run_chain(job).await;

        match outcome {
            RecordingOutcome::Lost => {
                metrics::counter!("clicks_lost_total").increment(1);
                warn!(link_id = job.link_id, "Click lost: every recording channel failed");
            }
            _ => debug!(link_id = job.link_id, ?outcome, "Click recorded"),
        }

        if let Err(e) = self
            .link_repository
            .increment_clicks(job.link_id, job.occurred_at)
            .await
        {
            warn!(
                link_id = job.link_id,
                error = %e,
                "Click counter update failed; counter and event log may diverge"
            );
        }

        outcome
    }

    async fn run_chain(&self, job: &ClickJob) -> RecordingOutcome {
        let chain = [&self.primary, &self.secondary, &self.tertiary];

        for (position, channel) in chain.into_iter().enumerate() {
            let name = channel.name();
            let attempt = tokio::time::timeout(self.channel_timeout, channel.send(job)).await;
            let result = attempt.unwrap_or(Err(RecordingError::Timeout(self.channel_timeout)));

            match result {
                Ok(()) => {
                    metrics::counter!("clicks_recorded_total", "channel" => name).increment(1);
                    return RecordingOutcome::from_position(position);
                }
                Err(e) if position + 1 < chain.len() => {
                    warn!(link_id = job.link_id, channel = name, error = %e, "Recording channel failed, falling back");
                }
                Err(e) => {
                    debug!(link_id = job.link_id, channel = name, error = %e, "Last recording channel failed");
                }
            }
        }

        RecordingOutcome::Lost
    }
}

#[async_trait]
impl ClickHandler for ClickRecorder {
    async fn handle(&self, job: ClickJob) {
        self.record(&job).await;
    }
}

/// Non-blocking entry point of the recording queue.
///
/// Cloned into request handlers; dropping every clone closes the queue and
/// lets the worker drain and stop.
#[derive(Clone)]
pub struct ClickDispatcher {
    sender: mpsc::Sender<ClickJob>,
}

impl ClickDispatcher {
    /// Creates the dispatcher and the receiving end for the worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ClickJob>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Queues a job without waiting. Returns false if the job was dropped.
    pub fn dispatch(&self, job: ClickJob) -> bool {
        match self.sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                metrics::counter!("click_queue_dropped_total").increment(1);
                warn!(link_id = job.link_id, "Click queue full, dropping click");
                false
            }
            Err(TrySendError::Closed(job)) => {
                info!(link_id = job.link_id, "Click queue closed, dropping click");
                false
            }
        }
    }

    /// Jobs waiting for the worker.
    pub fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.sender.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
