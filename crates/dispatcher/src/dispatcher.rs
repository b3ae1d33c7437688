//! Dispatcher - main loop from relay to sink

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, instrument, warn};

use contracts::{
    ContractError, MessageSink, OutboundRecord, RawMessage, Settings, DEFAULT_DRAIN_TIMEOUT,
    DEFAULT_TOPIC,
};
use ingestion::RelayConsumer;

use crate::completion::CompletionTracker;
use crate::error::DispatcherError;
use crate::metrics::{DeliveryMetrics, DeliverySnapshot};

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Destination topic for every record
    pub topic: String,
    /// Bound on waiting for in-flight deliveries at shutdown (None = unbounded)
    pub drain_timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            drain_timeout: Some(DEFAULT_DRAIN_TIMEOUT),
        }
    }
}

impl DispatcherConfig {
    /// Resolve topic and drain timeout once at startup
    pub fn from_settings(settings: &Settings) -> Result<Self, ContractError> {
        Ok(Self {
            topic: settings.topic().to_string(),
            drain_timeout: settings.drain_timeout()?,
        })
    }
}

/// Moves messages from the relay to the sink
///
/// One `take` then one submit per iteration. Outcomes are observed by a
/// separate `CompletionTracker`, so submitting never waits on the destination.
pub struct Dispatcher<S> {
    config: DispatcherConfig,
    sink: S,
    relay: RelayConsumer,
    tracker: CompletionTracker,
    metrics: Arc<DeliveryMetrics>,
}

impl<S: MessageSink> Dispatcher<S> {
    /// Create a dispatcher and spawn its completion worker
    pub fn new(config: DispatcherConfig, sink: S, relay: RelayConsumer) -> Self {
        let metrics = Arc::new(DeliveryMetrics::new());
        let tracker = CompletionTracker::spawn(Arc::clone(&metrics));
        Self {
            config,
            sink,
            relay,
            tracker,
            metrics,
        }
    }

    /// Destination topic
    pub fn topic(&self) -> &str {
        &self.config.topic
    }

    /// Get delivery metrics
    pub fn metrics(&self) -> Arc<DeliveryMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run the main loop while `is_active` holds
    ///
    /// `is_active` is polled once per iteration, before the `take`. Also
    /// returns if the relay closes. Returns the number of records submitted.
    #[instrument(name = "dispatcher_run", skip_all, fields(topic = %self.config.topic))]
    pub async fn run_while<F>(&self, mut is_active: F) -> u64
    where
        F: FnMut() -> bool,
    {
        info!(sink = self.sink.name(), "Dispatcher started");
        let mut count: u64 = 0;

        while is_active() {
            let Some(message) = self.relay.take().await else {
                debug!("relay closed");
                break;
            };
            self.dispatch(message);
            count += 1;

            if count.is_multiple_of(1000) {
                debug!(records = count, "Dispatcher progress");
            }
        }

        info!(records = count, "Dispatcher loop ended");
        count
    }

    /// Submit everything left in the relay until it closes
    ///
    /// The relay closes once its producer is dropped.
    #[instrument(name = "dispatcher_drain", skip_all)]
    pub async fn drain(&self) -> u64 {
        let mut count: u64 = 0;
        while let Some(message) = self.relay.take().await {
            self.dispatch(message);
            count += 1;
        }
        info!(records = count, "Relay drained");
        count
    }

    /// Convert and submit one message
    fn dispatch(&self, message: RawMessage) {
        let record = OutboundRecord::from_raw(self.config.topic.as_str(), message);
        let delivery = self.sink.submit(record);
        self.metrics.inc_submitted();
        observability::record_message_submitted(self.sink.name());
        self.tracker.track(delivery);
    }

    /// Wait for in-flight deliveries, then close the sink
    ///
    /// Deliveries still pending when the drain timeout elapses are abandoned.
    /// The sink gets whatever is left of the drain timeout for its own flush.
    #[instrument(name = "dispatcher_close", skip_all)]
    pub async fn close(mut self) -> Result<DeliverySnapshot, DispatcherError> {
        let drain_timeout = self.config.drain_timeout;
        let started = Instant::now();
        let abandoned = self.tracker.finish(drain_timeout).await;
        if abandoned > 0 {
            warn!(abandoned, "Closing sink with abandoned deliveries");
        }

        let remaining = drain_timeout.map(|t| t.saturating_sub(started.elapsed()));
        self.sink.close(remaining).await?;

        let snapshot = self.metrics.snapshot();
        info!(
            submitted = snapshot.submitted,
            delivered = snapshot.delivered,
            failed = snapshot.failed,
            abandoned = snapshot.abandoned,
            "Dispatcher shutdown complete"
        );
        Ok(snapshot)
    }
}
