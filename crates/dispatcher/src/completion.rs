//! CompletionTracker - observes pending deliveries on a dedicated worker task

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tracing::{debug, error, info, instrument, warn};

use contracts::{CompletedDelivery, DeliveryOutcome, PendingDelivery};

use crate::metrics::DeliveryMetrics;

/// Handle to the completion worker
///
/// Every tracked delivery resolves on its own sub-task, so outcomes are
/// reported independently of each other and of submission order.
pub struct CompletionTracker {
    /// Channel to hand deliveries to the worker
    tx: mpsc::UnboundedSender<PendingDelivery>,
    /// Shared metrics
    metrics: Arc<DeliveryMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl CompletionTracker {
    /// Spawn the worker task
    pub fn spawn(metrics: Arc<DeliveryMetrics>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker_metrics = Arc::clone(&metrics);
        let worker_handle = tokio::spawn(completion_worker(rx, worker_metrics));

        Self {
            tx,
            metrics,
            worker_handle,
        }
    }

    /// Hand a delivery to the worker (non-blocking)
    pub fn track(&self, delivery: PendingDelivery) {
        if let Err(mpsc::error::SendError(delivery)) = self.tx.send(delivery) {
            self.metrics.inc_failed();
            error!(
                topic = %delivery.record().topic,
                "Completion worker closed unexpectedly"
            );
        }
    }

    /// Stop accepting deliveries and wait for the tracked ones
    ///
    /// With a `timeout`, deliveries still pending at the deadline are
    /// abandoned. Returns how many were abandoned.
    #[instrument(name = "completion_tracker_finish", skip(self))]
    pub async fn finish(self, timeout: Option<Duration>) -> usize {
        let Self {
            tx,
            metrics,
            mut worker_handle,
        } = self;
        // Dropping the sender lets the worker exit once everything resolved
        drop(tx);

        let joined = match timeout {
            None => Some((&mut worker_handle).await),
            Some(limit) => tokio::time::timeout(limit, &mut worker_handle).await.ok(),
        };

        match joined {
            Some(Ok(())) => {
                debug!("CompletionTracker finished");
                0
            }
            Some(Err(e)) => {
                error!(error = ?e, "Completion worker panicked");
                abandon(&metrics)
            }
            None => {
                worker_handle.abort();
                let _ = worker_handle.await;
                let abandoned = abandon(&metrics);
                warn!(
                    abandoned,
                    timeout_ms = timeout.map(|t| t.as_millis() as u64),
                    "Drain timeout elapsed, abandoning in-flight deliveries"
                );
                abandoned
            }
        }
    }
}

fn abandon(metrics: &DeliveryMetrics) -> usize {
    let abandoned = metrics.abandon_in_flight();
    observability::record_deliveries_abandoned(abandoned);
    observability::record_deliveries_in_flight(0);
    abandoned
}

/// Worker task that resolves deliveries and reports their outcomes
async fn completion_worker(
    mut rx: mpsc::UnboundedReceiver<PendingDelivery>,
    metrics: Arc<DeliveryMetrics>,
) {
    debug!("Completion worker started");
    let mut pending = JoinSet::new();

    loop {
        tokio::select! {
            delivery = rx.recv() => match delivery {
                Some(delivery) => {
                    pending.spawn(delivery.resolve());
                }
                None => break,
            },
            Some(joined) = pending.join_next(), if !pending.is_empty() => {
                report(joined, &metrics);
            }
        }
    }

    debug!(remaining = pending.len(), "Completion worker draining");
    while let Some(joined) = pending.join_next().await {
        report(joined, &metrics);
    }

    debug!("Completion worker stopped");
}

/// Log one outcome and update metrics
fn report(joined: Result<CompletedDelivery, JoinError>, metrics: &DeliveryMetrics) {
    let completed = match joined {
        Ok(completed) => completed,
        Err(e) => {
            metrics.inc_failed();
            error!(error = ?e, "Delivery task panicked");
            return;
        }
    };

    let CompletedDelivery {
        record,
        outcome,
        latency,
    } = completed;

    match outcome {
        DeliveryOutcome::Delivered(position) => {
            metrics.inc_delivered();
            info!(
                topic = %record.topic,
                partition = position.partition,
                offset = position.offset,
                payload = %record.payload,
                "Message delivered"
            );
            observability::record_delivery(&record.topic, true, latency);
        }
        DeliveryOutcome::Failed { cause } => {
            // Not retried and not escalated
            metrics.inc_failed();
            error!(
                topic = %record.topic,
                error = %cause,
                "Error producing message"
            );
            observability::record_delivery(&record.topic, false, latency);
        }
    }
    observability::record_deliveries_in_flight(metrics.in_flight());
}
