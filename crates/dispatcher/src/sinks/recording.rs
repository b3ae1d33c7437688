//! RecordingSink - in-memory sink for tests
//!
//! Records every submission and resolution; outcome and latency can be
//! scripted per record.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use contracts::{ContractError, DeliveryOutcome, MessageSink, OutboundRecord, PendingDelivery};

type FailWhen = Arc<dyn Fn(&OutboundRecord) -> bool + Send + Sync>;
type DelayWhen = Arc<dyn Fn(&OutboundRecord) -> Option<Duration> + Send + Sync>;

#[derive(Debug, Default)]
struct Recorded {
    submitted: Vec<OutboundRecord>,
    resolved: Vec<(String, DeliveryOutcome)>,
    closed: bool,
    close_timeout: Option<Duration>,
}

/// Observation handle for a `RecordingSink`
#[derive(Debug, Clone, Default)]
pub struct SinkProbe {
    state: Arc<Mutex<Recorded>>,
}

impl SinkProbe {
    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Records in submission order
    pub fn submitted(&self) -> Vec<OutboundRecord> {
        self.lock().submitted.clone()
    }

    /// Payloads with their outcomes, in resolution order
    pub fn resolved(&self) -> Vec<(String, DeliveryOutcome)> {
        self.lock().resolved.clone()
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Timeout passed to `close`, `None` if unbounded or not closed yet
    pub fn close_timeout(&self) -> Option<Duration> {
        self.lock().close_timeout
    }
}

/// In-memory sink
pub struct RecordingSink {
    name: String,
    next_offset: AtomicI64,
    fail_when: Option<FailWhen>,
    delay_when: Option<DelayWhen>,
    probe: SinkProbe,
}

impl RecordingSink {
    /// Sink that acknowledges everything at once
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_offset: AtomicI64::new(0),
            fail_when: None,
            delay_when: None,
            probe: SinkProbe::default(),
        }
    }

    /// Fail records matching `predicate`
    pub fn failing_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&OutboundRecord) -> bool + Send + Sync + 'static,
    {
        self.fail_when = Some(Arc::new(predicate));
        self
    }

    /// Delay the outcome of records for which `delay` returns a duration
    pub fn delaying_when<F>(mut self, delay: F) -> Self
    where
        F: Fn(&OutboundRecord) -> Option<Duration> + Send + Sync + 'static,
    {
        self.delay_when = Some(Arc::new(delay));
        self
    }

    /// Observation handle
    pub fn probe(&self) -> SinkProbe {
        self.probe.clone()
    }
}

impl MessageSink for RecordingSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, record: OutboundRecord) -> PendingDelivery {
        self.probe.lock().submitted.push(record.clone());

        let fails = self.fail_when.as_ref().is_some_and(|f| f(&record));
        let delay = self.delay_when.as_ref().and_then(|f| f(&record));
        let outcome = if fails {
            DeliveryOutcome::failed(format!("scripted failure for '{}'", record.payload))
        } else {
            DeliveryOutcome::delivered(0, self.next_offset.fetch_add(1, Ordering::Relaxed))
        };

        let probe = self.probe.clone();
        let payload = record.payload.clone();
        PendingDelivery::new(record, async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            probe.lock().resolved.push((payload, outcome.clone()));
            outcome
        })
    }

    async fn close(&mut self, timeout: Option<Duration>) -> Result<(), ContractError> {
        let mut recorded = self.probe.lock();
        recorded.closed = true;
        recorded.close_timeout = timeout;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::RawMessage;

    #[tokio::test]
    async fn test_scripted_failure_and_delay() {
        let sink = RecordingSink::new("rec")
            .failing_when(|r| r.payload == "bad")
            .delaying_when(|r| (r.payload == "slow").then_some(Duration::from_millis(30)));
        let probe = sink.probe();

        let slow = sink.submit(OutboundRecord::from_raw("t", RawMessage::from("slow")));
        let bad = sink.submit(OutboundRecord::from_raw("t", RawMessage::from("bad")));

        let (slow, bad) = tokio::join!(slow.resolve(), bad.resolve());
        assert!(slow.outcome.is_delivered());
        assert!(!bad.outcome.is_delivered());

        let order: Vec<String> = probe.resolved().into_iter().map(|(p, _)| p).collect();
        assert_eq!(order, ["bad", "slow"]);
        assert_eq!(probe.submitted().len(), 2);
    }
}
