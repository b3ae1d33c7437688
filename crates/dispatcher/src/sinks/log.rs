//! LogSink - logs records via tracing and acknowledges them at once

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use contracts::{ContractError, DeliveryOutcome, MessageSink, OutboundRecord, PendingDelivery};
use tracing::{debug, info, instrument};

/// Sink that logs records instead of sending them
///
/// Every record is acknowledged on partition 0 with the next offset.
pub struct LogSink {
    name: String,
    next_offset: AtomicI64,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_offset: AtomicI64::new(0),
        }
    }
}

impl MessageSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, record: OutboundRecord) -> PendingDelivery {
        let offset = self.next_offset.fetch_add(1, Ordering::Relaxed);
        debug!(
            sink = %self.name,
            topic = %record.topic,
            offset,
            payload = %record.payload,
            "Record logged"
        );
        PendingDelivery::ready(record, DeliveryOutcome::delivered(0, offset))
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self, _timeout: Option<Duration>) -> Result<(), ContractError> {
        info!(
            sink = %self.name,
            records = self.next_offset.load(Ordering::Relaxed),
            "LogSink closed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{RawMessage, RecordPosition};

    #[tokio::test]
    async fn test_log_sink_offsets() {
        let sink = LogSink::new("test_log");
        for expected in 0..3 {
            let record = OutboundRecord::from_raw("t", RawMessage::from("m"));
            let done = sink.submit(record).resolve().await;
            assert_eq!(
                done.outcome,
                DeliveryOutcome::Delivered(RecordPosition {
                    partition: 0,
                    offset: expected
                })
            );
        }
    }

    #[tokio::test]
    async fn test_log_sink_close() {
        let mut sink = LogSink::new("my_logger");
        assert_eq!(sink.name(), "my_logger");
        assert!(sink.close(None).await.is_ok());
    }
}
