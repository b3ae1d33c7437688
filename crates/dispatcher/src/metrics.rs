//! Delivery metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Delivery counters for one dispatcher
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Records handed to the sink
    submitted: AtomicU64,
    /// Acknowledged deliveries
    delivered: AtomicU64,
    /// Failed deliveries
    failed: AtomicU64,
    /// Deliveries given up on at the drain deadline
    abandoned: AtomicU64,
    /// Submitted but not yet resolved
    in_flight: AtomicUsize,
}

impl DeliveryMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Get submitted count
    pub fn submitted(&self) -> u64 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Record a submit; the delivery is in flight until resolved
    pub fn inc_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Get delivered count
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Record an acknowledged delivery
    pub fn inc_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get failed count
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Record a failed delivery
    pub fn inc_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Get abandoned count
    pub fn abandoned(&self) -> u64 {
        self.abandoned.load(Ordering::Relaxed)
    }

    /// Move every in-flight delivery to abandoned, returning how many
    pub fn abandon_in_flight(&self) -> usize {
        let count = self.in_flight.swap(0, Ordering::Relaxed);
        self.abandoned.fetch_add(count as u64, Ordering::Relaxed);
        count
    }

    /// Get in-flight count
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> DeliverySnapshot {
        DeliverySnapshot {
            submitted: self.submitted(),
            delivered: self.delivered(),
            failed: self.failed(),
            abandoned: self.abandoned(),
            in_flight: self.in_flight(),
        }
    }
}

/// Snapshot of delivery metrics (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverySnapshot {
    pub submitted: u64,
    pub delivered: u64,
    pub failed: u64,
    pub abandoned: u64,
    pub in_flight: usize,
}
