//! Background worker draining the click queue.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::domain::click_job::ClickJob;

/// Consumer of queued click jobs.
///
/// Implementations must absorb their own failures; the worker only schedules.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClickHandler: Send + Sync {
    async fn handle(&self, job: ClickJob);
}

/// Processes jobs until every sender is dropped, then waits for in-flight
/// jobs to finish.
///
/// At most `concurrency` jobs run at the same time; a slow downstream
/// therefore backs up the queue instead of spawning unbounded tasks.
pub async fn run_click_worker(
    mut rx: mpsc::Receiver<ClickJob>,
    handler: Arc<dyn ClickHandler>,
    concurrency: usize,
) {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();
    let mut processed: u64 = 0;

    while let Some(job) = rx.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            warn!("Click worker semaphore closed, stopping");
            break;
        };

        let handler = handler.clone();
        tasks.spawn(async move {
            handler.handle(job).await;
            drop(permit);
        });
        processed += 1;

        // Reap finished tasks so the set does not grow with the queue.
        while let Some(res) = tasks.try_join_next() {
            if let Err(e) = res {
                warn!(error = %e, "Click task panicked");
            }
        }
    }

    debug!(pending = tasks.len(), "Click queue closed, draining");
    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            warn!(error = %e, "Click task panicked");
        }
    }

    info!(processed, "Click worker stopped");
}
