//! Asynchronous delivery acknowledgment
//!
//! A sink answers every submit with a [`PendingDelivery`]: a future that
//! resolves once the destination acknowledges or rejects the record.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use crate::OutboundRecord;

/// Destination-assigned position of a delivered record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordPosition {
    pub partition: i32,
    pub offset: i64,
}

impl fmt::Display for RecordPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.partition, self.offset)
    }
}

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Acknowledged by the destination
    Delivered(RecordPosition),
    /// Rejected, timed out, or never enqueued
    Failed { cause: String },
}

impl DeliveryOutcome {
    pub fn delivered(partition: i32, offset: i64) -> Self {
        Self::Delivered(RecordPosition { partition, offset })
    }

    pub fn failed(cause: impl Into<String>) -> Self {
        Self::Failed {
            cause: cause.into(),
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered(_))
    }
}

type OutcomeFuture = Pin<Box<dyn Future<Output = DeliveryOutcome> + Send + 'static>>;

/// A submitted record whose outcome is not known yet
pub struct PendingDelivery {
    record: OutboundRecord,
    submitted_at: Instant,
    outcome: OutcomeFuture,
}

impl PendingDelivery {
    /// Wrap a sink's acknowledgment future
    pub fn new<F>(record: OutboundRecord, outcome: F) -> Self
    where
        F: Future<Output = DeliveryOutcome> + Send + 'static,
    {
        Self {
            record,
            submitted_at: Instant::now(),
            outcome: Box::pin(outcome),
        }
    }

    /// Outcome already known at submit time
    pub fn ready(record: OutboundRecord, outcome: DeliveryOutcome) -> Self {
        Self::new(record, std::future::ready(outcome))
    }

    /// The record this delivery belongs to
    pub fn record(&self) -> &OutboundRecord {
        &self.record
    }

    /// Wait for the outcome
    pub async fn resolve(self) -> CompletedDelivery {
        let outcome = self.outcome.await;
        CompletedDelivery {
            record: self.record,
            outcome,
            latency: self.submitted_at.elapsed(),
        }
    }
}

impl fmt::Debug for PendingDelivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingDelivery")
            .field("record", &self.record)
            .field("submitted_at", &self.submitted_at)
            .finish_non_exhaustive()
    }
}

/// A delivery whose outcome is known
#[derive(Debug, Clone)]
pub struct CompletedDelivery {
    pub record: OutboundRecord,
    pub outcome: DeliveryOutcome,
    /// Time from submit to outcome
    pub latency: Duration,
}
