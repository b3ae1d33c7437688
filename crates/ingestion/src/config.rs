//! Relay configuration and stream metrics

use std::sync::atomic::{AtomicU64, Ordering};

use contracts::{ContractError, Settings, DEFAULT_RELAY_CAPACITY};

/// Relay configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Maximum number of queued messages
    pub capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_RELAY_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Resolve from `relay.capacity`
    pub fn from_settings(settings: &Settings) -> Result<Self, ContractError> {
        Ok(Self {
            capacity: settings.relay_capacity()?,
        })
    }
}

/// Stream metrics
#[derive(Debug, Default)]
pub struct StreamMetrics {
    /// Lines read from the stream
    pub messages_received: AtomicU64,

    /// Lines accepted by the relay
    pub messages_relayed: AtomicU64,

    /// Read errors that ended the stream
    pub read_errors: AtomicU64,
}

impl StreamMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record line received
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record line accepted by the relay
    pub fn record_relayed(&self) {
        self.messages_relayed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record read error
    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> StreamMetricsSnapshot {
        StreamMetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_relayed: self.messages_relayed.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}

/// Stream metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamMetricsSnapshot {
    /// Lines read from the stream
    pub messages_received: u64,

    /// Lines accepted by the relay
    pub messages_relayed: u64,

    /// Read errors that ended the stream
    pub read_errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_config_from_settings() {
        let settings: Settings = [("relay.capacity".to_string(), "8".to_string())]
            .into_iter()
            .collect();
        assert_eq!(RelayConfig::from_settings(&settings).unwrap().capacity, 8);
        assert_eq!(
            RelayConfig::from_settings(&Settings::default()).unwrap(),
            RelayConfig::default()
        );
    }

    #[test]
    fn test_metrics_snapshot() {
        let metrics = StreamMetrics::new();
        metrics.record_received();
        metrics.record_received();
        metrics.record_relayed();
        metrics.record_read_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.messages_received, 2);
        assert_eq!(snapshot.messages_relayed, 1);
        assert_eq!(snapshot.read_errors, 1);
    }
}
