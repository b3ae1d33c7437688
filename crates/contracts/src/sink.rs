//! MessageSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for the messaging sink.

use std::time::Duration;

use crate::{ContractError, OutboundRecord, PendingDelivery};

/// Asynchronously acknowledged message sink
///
/// The sink owns its own transport, retries and partitioning; the bridge only
/// submits records and observes outcomes.
#[trait_variant::make(MessageSink: Send)]
pub trait LocalMessageSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Submit a record
    ///
    /// Must not wait for the destination: the returned delivery resolves later.
    /// Failures that are known immediately are reported through the delivery too.
    fn submit(&self, record: OutboundRecord) -> PendingDelivery;

    /// Close the sink, waiting for buffered records up to `timeout`
    ///
    /// `None` waits without bound.
    async fn close(&mut self, timeout: Option<Duration>) -> Result<(), ContractError>;
}
