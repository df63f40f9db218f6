//! Single-file-at-a-time work queue.
//!
//! The watcher and the retroactive scan push paths through a [`QueueHandle`];
//! one worker pulls them off in arrival order. Each item runs in its own task
//! so a failure or panic is confined to that item. Once every handle is
//! dropped and the backlog is empty, [`ProcessingQueue::run`] returns.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info, warn};

use crate::{
    models::{ProcessOutcome, QueueSummary, SkipReason, WorkItem},
    organizer::ScreenshotOrganizer,
};

#[derive(Debug, Clone)]
pub struct QueueHandle {
    sender: UnboundedSender<WorkItem>,
}

impl QueueHandle {
    /// Returns false once the worker has stopped.
    pub fn enqueue(&self, item: WorkItem) -> bool {
        debug!(path = %item.path.display(), source = ?item.source, "Queued screenshot");
        match self.sender.send(item) {
            Ok(()) => true,
            Err(rejected) => {
                warn!(path = %rejected.0.path.display(), "Queue is closed, dropping item");
                false
            }
        }
    }
}

pub struct ProcessingQueue {
    receiver: UnboundedReceiver<WorkItem>,
    organizer: Arc<ScreenshotOrganizer>,
}

impl ProcessingQueue {
    pub fn new(organizer: ScreenshotOrganizer) -> (Self, QueueHandle) {
        let (sender, receiver) = unbounded_channel();
        let queue = Self {
            receiver,
            organizer: Arc::new(organizer),
        };
        (queue, QueueHandle { sender })
    }

    /// Drains the queue until every handle is dropped.
    pub async fn run(self) -> QueueSummary {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but also stops when `shutdown` resolves.
    /// An item already being processed is always finished first.
    pub async fn run_until<F>(mut self, shutdown: F) -> QueueSummary
    where
        F: Future<Output = ()>,
    {
        let mut summary = QueueSummary::default();
        tokio::pin!(shutdown);

        loop {
            let item = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested, leaving remaining items in place");
                    break;
                }
                item = self.receiver.recv() => match item {
                    Some(item) => item,
                    None => break,
                },
            };

            self.process_one(item, &mut summary).await;
        }

        info!(
            moved = summary.moved,
            skipped = summary.skipped,
            failed = summary.failed,
            "Processing queue finished"
        );
        summary
    }

    async fn process_one(&self, item: WorkItem, summary: &mut QueueSummary) {
        let path = item.path.clone();
        let organizer = Arc::clone(&self.organizer);
        let task = tokio::spawn(async move { organizer.process(&item).await });

        match task.await {
            Ok(Ok(ProcessOutcome::Moved(_))) => summary.moved += 1,
            Ok(Ok(ProcessOutcome::Skipped(reason))) => {
                summary.skipped += 1;
                if reason == SkipReason::Vanished {
                    debug!(path = %path.display(), %reason, "Skipped screenshot");
                } else {
                    warn!(path = %path.display(), %reason, "Skipped screenshot");
                }
            }
            Ok(Err(e)) => {
                summary.failed += 1;
                error!(path = %path.display(), error = %e, "Failed to process screenshot");
            }
            Err(e) => {
                summary.failed += 1;
                error!(path = %path.display(), error = %e, "Processing task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests;
