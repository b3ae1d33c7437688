//! Pipeline orchestrator - coordinates all components.
//!
//! Drives the lifecycle `Idle -> Connecting -> Running -> Draining -> Stopped`:
//! connect the stream, run the dispatcher while the stream is live, then drain
//! the relay and wait for in-flight deliveries before closing the sink.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use contracts::{Lifecycle, LifecycleState, MessageSink, Settings, StreamClient};
use dispatcher::{Dispatcher, DispatcherConfig};
use ingestion::{BoundedRelay, RelayConfig, StreamCloser, StreamHandle, StreamSource};
use tracing::{error, info, instrument, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Bound on closing the sink after an aborted startup
const ABORT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Apply a transition, logging and recording it
fn advance(lifecycle: &mut Lifecycle, next: LifecycleState) -> Result<()> {
    let previous = lifecycle.transition(next)?;
    observability::record_lifecycle_state(next);
    info!(from = %previous, to = %next, "Lifecycle transition");
    Ok(())
}

/// Pipeline before the stream is connected
pub struct Pipeline<C, S> {
    settings: Settings,
    client: C,
    sink: S,
    lifecycle: Lifecycle,
}

impl<C, S> Pipeline<C, S>
where
    C: StreamClient + 'static,
    S: MessageSink,
{
    /// Create a new pipeline; the sink is already built, the client not yet connected
    pub fn new(settings: Settings, client: C, sink: S) -> Self {
        Self {
            settings,
            client,
            sink,
            lifecycle: Lifecycle::new(),
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Connect the stream and start the dispatcher
    ///
    /// Any failure here is fatal: the sink is closed and the lifecycle ends
    /// in `Stopped`.
    #[instrument(name = "pipeline_start", skip(self))]
    pub async fn start(self) -> Result<RunningPipeline<S>> {
        let Self {
            settings,
            client,
            mut sink,
            mut lifecycle,
        } = self;

        advance(&mut lifecycle, LifecycleState::Connecting)?;

        match Self::connect(&settings, client).await {
            Ok((handle, consumer, config)) => {
                advance(&mut lifecycle, LifecycleState::Running)?;
                let dispatcher = Dispatcher::new(config, sink, consumer);
                Ok(RunningPipeline {
                    lifecycle,
                    dispatcher,
                    handle,
                    started: Instant::now(),
                })
            }
            Err(e) => {
                error!(error = %e, "Startup failed");
                if let Err(close_err) = sink.close(Some(ABORT_CLOSE_TIMEOUT)).await {
                    warn!(error = %close_err, "Failed to close sink after aborted startup");
                }
                advance(&mut lifecycle, LifecycleState::Stopped)?;
                Err(e)
            }
        }
    }

    async fn connect(
        settings: &Settings,
        client: C,
    ) -> Result<(StreamHandle, ingestion::RelayConsumer, DispatcherConfig)> {
        let config = DispatcherConfig::from_settings(settings).context("Invalid dispatcher settings")?;
        let relay = RelayConfig::from_settings(settings).context("Invalid relay settings")?;
        let (producer, consumer) = BoundedRelay::new(relay.capacity)?;

        info!(
            topic = %config.topic,
            relay_capacity = relay.capacity,
            client = client.name(),
            "Connecting to stream..."
        );
        let handle = StreamSource::new(client)
            .connect(settings, producer)
            .await
            .context("Failed to connect to stream")?;

        Ok((handle, consumer, config))
    }
}

/// Pipeline with a live stream and a running dispatcher
pub struct RunningPipeline<S> {
    lifecycle: Lifecycle,
    dispatcher: Dispatcher<S>,
    handle: StreamHandle,
    started: Instant,
}

impl<S: MessageSink> RunningPipeline<S> {
    /// Current lifecycle state
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Stop signal for signal handlers
    pub fn closer(&self) -> StreamCloser {
        self.handle.closer()
    }

    /// Run until the stream ends, then drain and stop
    #[instrument(name = "pipeline_run", skip(self))]
    pub async fn run(self) -> Result<PipelineStats> {
        let Self {
            mut lifecycle,
            dispatcher,
            mut handle,
            started,
        } = self;

        let submitted_running = dispatcher.run_while(|| handle.is_active()).await;

        advance(&mut lifecycle, LifecycleState::Draining)?;
        info!("Stream inactive, draining relay");

        // The emission task may be blocked on a full relay: drain while releasing.
        let (submitted_draining, ()) = tokio::join!(dispatcher.drain(), handle.release());

        let stream = handle.metrics().snapshot();
        let closed = dispatcher.close().await;

        advance(&mut lifecycle, LifecycleState::Stopped)?;

        let deliveries =
            closed.map_err(|e| CliError::shutdown(format!("failed to close sink: {e}")))?;

        Ok(PipelineStats {
            stream,
            deliveries,
            submitted_running,
            submitted_draining,
            duration: started.elapsed(),
            final_state: lifecycle.state(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatcher::RecordingSink;
    use ingestion::ScriptedStreamClient;

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
    async fn test_run_to_stopped() {
        let sink = RecordingSink::new("rec");
        let probe = sink.probe();
        let pipeline = Pipeline::new(
            settings(&[("topic", "t1"), ("terms", "a,b")]),
            ScriptedStreamClient::new(["hello ", "world"]),
            sink,
        );
        assert_eq!(pipeline.state(), LifecycleState::Idle);

        let stats = pipeline.start().await.unwrap().run().await.unwrap();
        assert_eq!(stats.final_state, LifecycleState::Stopped);
        assert_eq!(stats.deliveries.delivered, 2);
        assert_eq!(stats.stream.messages_received, 2);

        let payloads: Vec<_> = probe.submitted().into_iter().map(|r| r.payload).collect();
        assert_eq!(payloads, ["hello", "world"]);
        assert!(probe.is_closed());
    }

    #[tokio::test]
    async fn test_connect_failure_closes_sink() {
        let sink = RecordingSink::new("rec");
        let probe = sink.probe();
        let pipeline = Pipeline::new(
            settings(&[]),
            ScriptedStreamClient::failing_connect("unreachable"),
            sink,
        );

        let err = pipeline.start().await.err().unwrap();
        assert!(format!("{err:#}").contains("unreachable"));
        assert!(probe.is_closed());
        assert!(probe.submitted().is_empty());
    }

    #[tokio::test]
    async fn test_missing_credential_never_connects() {
        let client = ScriptedStreamClient::new(["x"]);
        let client_probe = client.probe();
        let all = settings(&[]);
        let partial: Settings = all
            .iter()
            .filter(|(k, _)| *k != "token.secret")
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let result = Pipeline::new(partial, client, RecordingSink::new("rec"))
            .start()
            .await;
        assert!(result.is_err());
        assert_eq!(client_probe.connect_calls(), 0);
    }

    #[tokio::test]
    async fn test_close_drains_queued_messages() {
        let sink = RecordingSink::new("rec");
        let probe = sink.probe();
        let client = ScriptedStreamClient::new(["1", "2", "3"]).hold_open();
        let client_probe = client.probe();

        let running = Pipeline::new(settings(&[]), client, sink)
            .start()
            .await
            .unwrap();
        assert_eq!(running.state(), LifecycleState::Running);

        // Let the emission task queue everything before closing.
        while client_probe.lines_served() < 3 {
            tokio::task::yield_now().await;
        }
        running.closer().close();

        let stats = running.run().await.unwrap();
        assert_eq!(stats.final_state, LifecycleState::Stopped);
        assert_eq!(stats.deliveries.submitted, 3);
        assert_eq!(probe.submitted().len(), 3);
        assert!(client_probe.is_closed());
    }
}
