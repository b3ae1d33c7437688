//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 跨 crate 的合约检查
//! - 脚本化 e2e 测试（无需流端点或 broker）

#[cfg(test)]
mod contract_tests {
    use contracts::{FilterTermSet, LifecycleState, Settings, CREDENTIAL_KEYS};

    #[test]
    fn test_default_terms() {
        let terms = Settings::default().filter_terms();
        assert_eq!(terms, FilterTermSet::default());
        assert_eq!(terms.terms(), &["kafka", "summer"]);
    }

    #[test]
    fn test_every_credential_is_mandatory() {
        for missing in CREDENTIAL_KEYS {
            let settings: Settings = CREDENTIAL_KEYS
                .iter()
                .filter(|k| **k != missing)
                .map(|k| (k.to_string(), "x".to_string()))
                .collect();
            let err = settings.credentials().unwrap_err();
            assert!(err.is_authentication());
            assert!(err.to_string().contains(missing));
        }
    }

    #[test]
    fn test_lifecycle_order() {
        use LifecycleState::*;
        let ordinals: Vec<u8> = [Idle, Connecting, Running, Draining, Stopped]
            .iter()
            .map(|s| s.ordinal())
            .collect();
        assert!(ordinals.windows(2).all(|w| w[0] < w[1]));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::Settings;
    use dispatcher::{DeliverySnapshot, Dispatcher, DispatcherConfig, RecordingSink};
    use ingestion::{BoundedRelay, ScriptProbe, ScriptedStreamClient, StreamHandle, StreamSource};

    const CREDENTIALS: &str = "consumer.key=ck\n\
                               consumer.secret=cs\n\
                               token=t\n\
                               token.secret=ts\n\
                               stream.host=127.0.0.1:7000\n";

    fn settings(extra: &str) -> Settings {
        ConfigLoader::load_from_str(&format!("{CREDENTIALS}{extra}"), ConfigFormat::Properties)
            .unwrap()
    }

    /// Wire ScriptedStreamClient -> StreamSource -> BoundedRelay -> Dispatcher
    async fn connect(
        settings: &Settings,
        client: ScriptedStreamClient,
        sink: RecordingSink,
    ) -> (Dispatcher<RecordingSink>, StreamHandle) {
        let (producer, consumer) = BoundedRelay::new(settings.relay_capacity().unwrap()).unwrap();
        let handle = StreamSource::new(client)
            .connect(settings, producer)
            .await
            .unwrap();
        let config = DispatcherConfig::from_settings(settings).unwrap();
        (Dispatcher::new(config, sink, consumer), handle)
    }

    /// 运行、排空、关闭，与二进制程序的顺序一致
    async fn run_to_stop(
        dispatcher: Dispatcher<RecordingSink>,
        mut handle: StreamHandle,
    ) -> DeliverySnapshot {
        dispatcher.run_while(|| handle.is_active()).await;
        tokio::join!(dispatcher.drain(), handle.release());
        dispatcher.close().await.unwrap()
    }

    async fn wait_for_served(probe: &ScriptProbe, count: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while probe.lines_served() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("stream lines were not served in time");
    }

    /// End-to-end test: config file -> stream -> relay -> dispatcher -> sink
    #[tokio::test]
    async fn test_e2e_from_config_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".properties")
            .tempfile()
            .unwrap();
        write!(file, "{CREDENTIALS}topic=t1\nterms=a,b\n").unwrap();
        let settings = ConfigLoader::load_from_path(file.path()).unwrap();

        let client = ScriptedStreamClient::new(["hello ", "world"]);
        let client_probe = client.probe();
        let sink = RecordingSink::new("rec");
        let sink_probe = sink.probe();

        let (dispatcher, handle) = connect(&settings, client, sink).await;
        let snapshot = run_to_stop(dispatcher, handle).await;

        assert_eq!(snapshot.submitted, 2);
        assert_eq!(snapshot.delivered, 2);
        assert_eq!(
            client_probe.subscribed_terms().unwrap().terms(),
            &["a", "b"]
        );

        let records = sink_probe.submitted();
        assert!(records.iter().all(|r| r.topic == "t1" && r.key.is_none()));
        let payloads: Vec<_> = records.into_iter().map(|r| r.payload).collect();
        assert_eq!(payloads, ["hello", "world"]);
        assert!(sink_probe.is_closed());
    }

    #[tokio::test]
    async fn test_default_topic() {
        let sink = RecordingSink::new("rec");
        let probe = sink.probe();
        let (dispatcher, handle) =
            connect(&settings(""), ScriptedStreamClient::new(["m"]), sink).await;
        assert_eq!(dispatcher.topic(), "feed_raw");

        run_to_stop(dispatcher, handle).await;
        assert_eq!(probe.submitted()[0].topic, "feed_raw");
    }

    #[tokio::test]
    async fn test_shutdown_submits_queued_messages() {
        let client = ScriptedStreamClient::new(["1", "2", "3"]).hold_open();
        let client_probe = client.probe();
        let sink = RecordingSink::new("rec");
        let sink_probe = sink.probe();

        let (dispatcher, mut handle) = connect(&settings(""), client, sink).await;
        wait_for_served(&client_probe, 3).await;

        // 流已停止，三条消息仍在队列中
        handle.close();
        assert_eq!(dispatcher.run_while(|| handle.is_active()).await, 0);

        let (drained, ()) = tokio::join!(dispatcher.drain(), handle.release());
        assert_eq!(drained, 3);

        let snapshot = dispatcher.close().await.unwrap();
        assert_eq!(snapshot.submitted, 3);
        assert_eq!(snapshot.delivered, 3);
        assert_eq!(sink_probe.submitted().len(), 3);
    }

    #[tokio::test]
    async fn test_backpressure_blocks_emission() {
        let lines: Vec<String> = (0..5).map(|i| format!("m{i}")).collect();
        let client = ScriptedStreamClient::new(lines).hold_open();
        let client_probe = client.probe();
        let (producer, consumer) = BoundedRelay::new(2).unwrap();

        let mut handle = StreamSource::new(client)
            .connect(&settings(""), producer)
            .await
            .unwrap();

        // Two queued, the third held by the emission task
        wait_for_served(&client_probe, 3).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(consumer.len(), 2);
        assert_eq!(client_probe.lines_served(), 3);

        assert_eq!(consumer.take().await.unwrap().as_str(), "m0");
        wait_for_served(&client_probe, 4).await;
        assert_eq!(handle.metrics().snapshot().messages_relayed, 3);

        let drain = async {
            let mut rest = Vec::new();
            while let Some(message) = consumer.take().await {
                rest.push(message.into_payload());
            }
            rest
        };
        let (rest, ()) = tokio::join!(drain, handle.release());
        assert_eq!(rest.first().map(String::as_str), Some("m1"));
        assert!(rest.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_fifo_through_pipeline() {
        let lines: Vec<String> = (0..200).map(|i| format!("{i:04}")).collect();
        let sink = RecordingSink::new("rec");
        let probe = sink.probe();

        let (dispatcher, handle) = connect(
            &settings("relay.capacity=8\n"),
            ScriptedStreamClient::new(lines.clone()),
            sink,
        )
        .await;
        run_to_stop(dispatcher, handle).await;

        let payloads: Vec<_> = probe.submitted().into_iter().map(|r| r.payload).collect();
        assert_eq!(payloads, lines);
    }

    #[tokio::test]
    async fn test_failure_does_not_affect_neighbours() {
        let sink = RecordingSink::new("rec")
            .failing_when(|r| r.payload == "bad")
            .delaying_when(|r| (r.payload == "bad").then_some(Duration::from_millis(50)));
        let probe = sink.probe();

        let (dispatcher, handle) = connect(
            &settings(""),
            ScriptedStreamClient::new(["before", "bad", "after"]),
            sink,
        )
        .await;
        let snapshot = run_to_stop(dispatcher, handle).await;

        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.delivered, 2);

        // "after" resolves without waiting for the slow failure
        let order: Vec<_> = probe.resolved().into_iter().map(|(p, _)| p).collect();
        assert_eq!(order, ["before", "after", "bad"]);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_before_connecting() {
        for missing in contracts::CREDENTIAL_KEYS {
            let settings: Settings = settings("")
                .iter()
                .filter(|(k, _)| *k != missing)
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            let client = ScriptedStreamClient::new(["x"]);
            let probe = client.probe();
            let (producer, _consumer) = BoundedRelay::new(4).unwrap();

            let err = StreamSource::new(client)
                .connect(&settings, producer)
                .await
                .unwrap_err();
            assert!(err.is_authentication());
            assert_eq!(probe.connect_calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_drain_timeout_abandons_and_stops() {
        let sink = RecordingSink::new("rec")
            .delaying_when(|r| (r.payload == "stuck").then_some(Duration::from_secs(60)));
        let probe = sink.probe();

        let (dispatcher, handle) = connect(
            &settings("drain.timeout.ms=100\n"),
            ScriptedStreamClient::new(["ok", "stuck"]),
            sink,
        )
        .await;
        let snapshot = tokio::time::timeout(Duration::from_secs(5), run_to_stop(dispatcher, handle))
            .await
            .unwrap();

        assert_eq!(snapshot.delivered, 1);
        assert_eq!(snapshot.abandoned, 1);
        assert!(probe.is_closed());
    }
}
