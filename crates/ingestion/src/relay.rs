//! Bounded FIFO relay between the stream and the dispatcher

use async_channel::{bounded, Receiver, Sender};
use contracts::RawMessage;
use tracing::trace;

use crate::error::{IngestionError, Result};

/// Capacity-bounded relay
///
/// Split into a producer for the emission task and a consumer for the
/// dispatcher. Dropping the producer closes the relay once it is drained.
pub struct BoundedRelay;

impl BoundedRelay {
    /// Create a relay holding at most `capacity` messages
    pub fn new(capacity: usize) -> Result<(RelayProducer, RelayConsumer)> {
        if capacity == 0 {
            return Err(IngestionError::InvalidCapacity);
        }
        let (tx, rx) = bounded(capacity);
        Ok((RelayProducer { tx }, RelayConsumer { rx }))
    }
}

/// Producer half, owned by the emission task
#[derive(Debug)]
pub struct RelayProducer {
    tx: Sender<RawMessage>,
}

impl RelayProducer {
    /// Enqueue a message, waiting while the relay is full
    ///
    /// Fails only when the consumer is gone.
    pub async fn put(&self, message: RawMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| IngestionError::RelayClosed)?;
        let depth = self.tx.len();
        trace!(depth, "relay put");
        observability::record_relay_depth(depth);
        Ok(())
    }

    /// Messages currently queued
    pub fn len(&self) -> usize {
        self.tx.len()
    }

    /// Whether the relay is empty
    pub fn is_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Fixed capacity
    pub fn capacity(&self) -> usize {
        self.tx.capacity().unwrap_or(usize::MAX)
    }
}

/// Consumer half, owned by the dispatcher
#[derive(Debug)]
pub struct RelayConsumer {
    rx: Receiver<RawMessage>,
}

impl RelayConsumer {
    /// Dequeue the oldest message, waiting while the relay is empty
    ///
    /// `None` once the producer is dropped and every queued message is taken.
    pub async fn take(&self) -> Option<RawMessage> {
        let message = self.rx.recv().await.ok()?;
        observability::record_relay_depth(self.rx.len());
        Some(message)
    }

    /// Messages currently queued
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    /// Whether the relay is empty
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// Whether the producer is gone
    pub fn is_closed(&self) -> bool {
        self.rx.is_closed()
    }
}
