//! Stream source: connects a client and runs the emission task

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use contracts::{RawMessage, Settings, StreamClient};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::config::StreamMetrics;
use crate::error::Result;
use crate::relay::RelayProducer;

/// Stream source
///
/// Owns the wire client until `connect` hands it to the emission task.
pub struct StreamSource<C> {
    client: C,
    metrics: Arc<StreamMetrics>,
}

impl<C> StreamSource<C>
where
    C: StreamClient + 'static,
{
    /// Create a source around `client`
    pub fn new(client: C) -> Self {
        Self {
            client,
            metrics: Arc::new(StreamMetrics::new()),
        }
    }

    /// Authenticate, subscribe and start emitting into `relay`
    ///
    /// Credentials are resolved before the client is touched, so a missing one
    /// fails without any network activity.
    ///
    /// # Errors
    /// - `Authentication` for a missing or rejected credential
    /// - `StreamConnection` if the handshake fails
    #[instrument(name = "ingestion_stream_connect", skip_all)]
    pub async fn connect(mut self, settings: &Settings, relay: RelayProducer) -> Result<StreamHandle> {
        let credentials = settings.credentials()?;
        let terms = settings.filter_terms();

        debug!(client = self.client.name(), "connecting stream client");
        self.client.connect(&credentials, &terms).await?;
        info!(
            client = self.client.name(),
            terms = %terms,
            "Connected to stream to track terms"
        );

        let closer = StreamCloser {
            active: Arc::new(AtomicBool::new(true)),
            stop: Arc::new(Notify::new()),
        };
        let task = tokio::spawn(emit(
            self.client,
            relay,
            closer.clone(),
            self.metrics.clone(),
        ));

        Ok(StreamHandle {
            closer,
            task: Some(task),
            metrics: self.metrics,
        })
    }
}

/// Emission loop
///
/// Reads lines until the stream ends, fails or is closed, pushing each into
/// the relay. The relay producer is dropped on exit.
async fn emit<C: StreamClient>(
    mut client: C,
    relay: RelayProducer,
    closer: StreamCloser,
    metrics: Arc<StreamMetrics>,
) {
    debug!(client = client.name(), "emission task started");

    loop {
        let line = tokio::select! {
            biased;
            _ = closer.stop.notified() => {
                debug!(client = client.name(), "stream closed deliberately");
                break;
            }
            line = client.next_line() => line,
        };

        match line {
            Ok(Some(line)) => {
                metrics.record_received();
                observability::record_message_received();

                // Blocks while the relay is full.
                if relay.put(RawMessage::new(line)).await.is_err() {
                    warn!(client = client.name(), "relay consumer gone, stopping emission");
                    break;
                }
                metrics.record_relayed();
            }
            Ok(None) => {
                info!(client = client.name(), "stream ended by remote");
                break;
            }
            Err(e) => {
                metrics.record_read_error();
                observability::record_stream_error(client.name());
                error!(client = client.name(), error = %e, "stream read failed");
                break;
            }
        }
    }

    closer.active.store(false, Ordering::SeqCst);
    client.close().await;
    debug!(
        relayed = metrics.snapshot().messages_relayed,
        "emission task finished"
    );
}

/// Cloneable stop signal for a connected stream
#[derive(Debug, Clone)]
pub struct StreamCloser {
    active: Arc<AtomicBool>,
    stop: Arc<Notify>,
}

impl StreamCloser {
    /// Deliberately close the stream
    ///
    /// Flips the liveness flag at once; the emission task exits at its next
    /// wait point. Idempotent.
    pub fn close(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("closing stream");
        }
        self.stop.notify_one();
    }

    /// Whether the stream is still live
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Handle to a connected stream
#[derive(Debug)]
pub struct StreamHandle {
    closer: StreamCloser,
    task: Option<JoinHandle<()>>,
    metrics: Arc<StreamMetrics>,
}

impl StreamHandle {
    /// False once the stream was closed or ended by the remote
    pub fn is_active(&self) -> bool {
        self.closer.is_active()
    }

    /// Stop signal usable from other tasks
    pub fn closer(&self) -> StreamCloser {
        self.closer.clone()
    }

    /// Deliberately close the stream
    pub fn close(&self) {
        self.closer.close();
    }

    /// Close the stream and wait for the emission task to exit
    ///
    /// The emission task may be blocked on a full relay, so the relay must be
    /// drained concurrently for this to complete.
    #[instrument(name = "ingestion_stream_release", skip(self))]
    pub async fn release(&mut self) {
        self.closer.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "emission task did not finish cleanly");
            }
        }
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<StreamMetrics> {
        self.metrics.clone()
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.closer.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedStreamClient;
    use crate::relay::BoundedRelay;
    use crate::IngestionError;
    use std::time::Duration;

    fn settings(extra: &[(&str, &str)]) -> Settings {
        let mut pairs = vec![
            ("consumer.key", "ck"),
            ("consumer.secret", "cs"),
            ("token", "t"),
            ("token.secret", "ts"),
        ];
        pairs.extend_from_slice(extra);
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_connect() {
        for missing in contracts::CREDENTIAL_KEYS {
            let client = ScriptedStreamClient::new(["never"]);
            let probe = client.probe();
            let settings: Settings = settings(&[])
                .iter()
                .filter(|(k, _)| *k != missing)
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let (producer, _consumer) = BoundedRelay::new(4).unwrap();

            let err = StreamSource::new(client)
                .connect(&settings, producer)
                .await
                .unwrap_err();
            assert!(err.is_authentication(), "got: {err}");
            assert_eq!(probe.connect_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let client = ScriptedStreamClient::failing_connect("handshake refused");
        let (producer, _consumer) = BoundedRelay::new(4).unwrap();
        let err = StreamSource::new(client)
            .connect(&settings(&[]), producer)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestionError::Contract(_)));
        assert!(err.to_string().contains("handshake refused"));
    }

    #[tokio::test]
    async fn test_subscribes_to_configured_terms() {
        let client = ScriptedStreamClient::new(Vec::<String>::new());
        let probe = client.probe();
        let (producer, _consumer) = BoundedRelay::new(4).unwrap();

        let _handle = StreamSource::new(client)
            .connect(&settings(&[("terms", "a, b,a")]), producer)
            .await
            .unwrap();

        let terms = probe.subscribed_terms().unwrap();
        assert_eq!(terms.terms(), &["a", "b", "a"]);
    }

    #[tokio::test]
    async fn test_lines_are_relayed_in_order_then_stream_ends() {
        let client = ScriptedStreamClient::new(["hello ", "world"]);
        let probe = client.probe();
        let (producer, consumer) = BoundedRelay::new(4).unwrap();

        let mut handle = StreamSource::new(client)
            .connect(&settings(&[]), producer)
            .await
            .unwrap();

        assert_eq!(consumer.take().await.unwrap().as_str(), "hello ");
        assert_eq!(consumer.take().await.unwrap().as_str(), "world");
        assert!(consumer.take().await.is_none());
        assert!(!handle.is_active());

        handle.release().await;
        assert!(probe.is_closed());
        assert_eq!(handle.metrics().snapshot().messages_relayed, 2);
    }

    #[tokio::test]
    async fn test_close_stops_held_stream() {
        let client = ScriptedStreamClient::new(["only"]).hold_open();
        let (producer, consumer) = BoundedRelay::new(4).unwrap();

        let mut handle = StreamSource::new(client)
            .connect(&settings(&[]), producer)
            .await
            .unwrap();
        assert_eq!(consumer.take().await.unwrap().as_str(), "only");
        assert!(handle.is_active());

        handle.closer().close();
        assert!(!handle.is_active());
        tokio::time::timeout(Duration::from_secs(1), handle.release())
            .await
            .unwrap();
        assert!(consumer.take().await.is_none());
    }

    #[tokio::test]
    async fn test_release_completes_while_relay_full() {
        let lines: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        let client = ScriptedStreamClient::new(lines).hold_open();
        let probe = client.probe();
        let (producer, consumer) = BoundedRelay::new(1).unwrap();

        let mut handle = StreamSource::new(client)
            .connect(&settings(&[]), producer)
            .await
            .unwrap();

        // One line queued, the second held by a blocked put
        tokio::time::timeout(Duration::from_secs(1), async {
            while probe.lines_served() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(consumer.len(), 1);
        assert!(handle.is_active());

        let drain = async {
            let mut taken = Vec::new();
            while let Some(message) = consumer.take().await {
                taken.push(message.into_payload());
            }
            taken
        };
        let (taken, ()) = tokio::join!(drain, handle.release());

        // The blocked put completes once the relay is drained
        assert!(taken.len() >= 2);
        assert!(taken.iter().zip(0..).all(|(line, i)| line == &i.to_string()));
    }

    #[tokio::test]
    async fn test_read_error_ends_stream() {
        let client = ScriptedStreamClient::new(["first"]).then_fail("connection reset");
        let (producer, consumer) = BoundedRelay::new(4).unwrap();

        let handle = StreamSource::new(client)
            .connect(&settings(&[]), producer)
            .await
            .unwrap();

        assert_eq!(consumer.take().await.unwrap().as_str(), "first");
        assert!(consumer.take().await.is_none());
        assert!(!handle.is_active());
        assert_eq!(handle.metrics().snapshot().read_errors, 1);
    }
}
