//! KafkaSink - delivers records through an rdkafka `FutureProducer`

use std::time::Duration;

use contracts::{
    ContractError, DeliveryOutcome, MessageSink, OutboundRecord, PendingDelivery, Settings,
};
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use rdkafka::ClientConfig;
use tracing::{debug, info, instrument, warn};

const SINK_NAME: &str = "kafka";

/// Result of handing a record to librdkafka's local queue
enum Enqueue<F> {
    Queued(F),
    QueueFull,
    Rejected(KafkaError),
}

/// Sink backed by a Kafka producer
///
/// Producer settings are taken verbatim from the pass-through settings
/// (`bootstrap.servers`, `acks`, ...). Records carry no key.
pub struct KafkaSink {
    producer: FutureProducer,
    queue_timeout: Duration,
}

// FutureProducer has no Debug impl
impl std::fmt::Debug for KafkaSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaSink")
            .field("queue_timeout", &self.queue_timeout)
            .finish_non_exhaustive()
    }
}

impl KafkaSink {
    /// Build the producer from settings
    ///
    /// # Errors
    /// `SinkCreation` if librdkafka rejects the configuration.
    #[instrument(name = "kafka_sink_create", skip(settings))]
    pub fn from_settings(settings: &Settings) -> Result<Self, ContractError> {
        let mut config = ClientConfig::new();
        for (key, value) in settings.passthrough() {
            config.set(key, value);
        }
        debug!(config = ?config, "creating kafka producer");

        let producer: FutureProducer = config
            .create()
            .map_err(|e| ContractError::sink_creation(SINK_NAME, e.to_string()))?;

        Ok(Self {
            producer,
            queue_timeout: settings.sink_queue_timeout()?,
        })
    }

    /// Enqueue without waiting; reports a full local queue separately
    fn try_enqueue(
        &self,
        record: &OutboundRecord,
    ) -> Enqueue<rdkafka::producer::DeliveryFuture> {
        let mut future_record: FutureRecord<'_, str, str> =
            FutureRecord::to(&record.topic).payload(&record.payload);
        if let Some(key) = record.key.as_deref() {
            future_record = future_record.key(key);
        }

        match self.producer.send_result(future_record) {
            Ok(delivery) => Enqueue::Queued(delivery),
            Err((KafkaError::MessageProduction(RDKafkaErrorCode::QueueFull), _)) => {
                Enqueue::QueueFull
            }
            Err((e, _)) => Enqueue::Rejected(e),
        }
    }
}

impl MessageSink for KafkaSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    fn submit(&self, record: OutboundRecord) -> PendingDelivery {
        match self.try_enqueue(&record) {
            Enqueue::Queued(delivery) => PendingDelivery::new(record, async move {
                match delivery.await {
                    Ok(Ok((partition, offset))) => DeliveryOutcome::delivered(partition, offset),
                    Ok(Err((e, _))) => DeliveryOutcome::failed(e.to_string()),
                    Err(_) => DeliveryOutcome::failed("producer dropped before delivery"),
                }
            }),
            Enqueue::QueueFull => {
                // Wait for queue space on the delivery's own task instead of
                // blocking the dispatcher loop.
                warn!(topic = %record.topic, "producer queue full, waiting for space");
                let producer = self.producer.clone();
                let queue_timeout = self.queue_timeout;
                let topic = record.topic.clone();
                let payload = record.payload.clone();
                let key = record.key.clone();
                PendingDelivery::new(record, async move {
                    let mut future_record: FutureRecord<'_, str, str> =
                        FutureRecord::to(&topic).payload(&payload);
                    if let Some(key) = key.as_deref() {
                        future_record = future_record.key(key);
                    }
                    match producer.send(future_record, queue_timeout).await {
                        Ok((partition, offset)) => DeliveryOutcome::delivered(partition, offset),
                        Err((e, _)) => DeliveryOutcome::failed(e.to_string()),
                    }
                })
            }
            Enqueue::Rejected(e) => PendingDelivery::ready(record, DeliveryOutcome::failed(e.to_string())),
        }
    }

    #[instrument(name = "kafka_sink_close", skip(self))]
    async fn close(&mut self, timeout: Option<Duration>) -> Result<(), ContractError> {
        let producer = self.producer.clone();
        let timeout = timeout.map_or(Timeout::Never, Timeout::After);

        // flush blocks the calling thread until librdkafka drains its queue
        tokio::task::spawn_blocking(move || producer.flush(timeout))
            .await
            .map_err(|e| ContractError::sink_close(SINK_NAME, e.to_string()))?
            .map_err(|e| ContractError::sink_close(SINK_NAME, e.to_string()))?;

        info!(sink = SINK_NAME, "KafkaSink flushed and closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reserved_keys_are_not_passed_to_producer() {
        let sink = KafkaSink::from_settings(&settings(&[
            ("bootstrap.servers", "127.0.0.1:1"),
            ("topic", "t1"),
            ("consumer.key", "ck"),
            ("stream.host", "127.0.0.1:7000"),
            ("sink.queue.timeout.ms", "250"),
        ]))
        .unwrap();
        assert_eq!(sink.queue_timeout, Duration::from_millis(250));
        assert_eq!(sink.name(), "kafka");
    }

    #[test]
    fn test_unknown_producer_property() {
        let err = KafkaSink::from_settings(&settings(&[("no.such.property", "1")])).unwrap_err();
        assert!(matches!(err, ContractError::SinkCreation { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_broker_fails_delivery() {
        let mut sink = KafkaSink::from_settings(&settings(&[
            ("bootstrap.servers", "127.0.0.1:1"),
            ("message.timeout.ms", "200"),
        ]))
        .unwrap();

        let record = OutboundRecord::from_raw("t1", contracts::RawMessage::from("hello"));
        let done = sink.submit(record).resolve().await;
        assert!(!done.outcome.is_delivered());

        sink.close(Some(Duration::from_secs(1))).await.unwrap();
    }
}
