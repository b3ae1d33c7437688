//! Sink implementations
//!
//! Contains KafkaSink, LogSink, and RecordingSink.

#[cfg(feature = "kafka")]
mod kafka;
mod log;
mod recording;

#[cfg(feature = "kafka")]
pub use self::kafka::KafkaSink;
pub use self::log::LogSink;
pub use self::recording::{RecordingSink, SinkProbe};

use contracts::Settings;
use tracing::instrument;

use crate::error::DispatcherError;

/// Sink used by the binary
#[cfg(feature = "kafka")]
pub type DefaultSink = KafkaSink;

/// Sink used by the binary
#[cfg(not(feature = "kafka"))]
pub type DefaultSink = LogSink;

/// Create the binary's sink from settings
#[cfg(feature = "kafka")]
#[instrument(name = "dispatcher_create_sink", skip(settings))]
pub fn create_default_sink(settings: &Settings) -> Result<DefaultSink, DispatcherError> {
    Ok(KafkaSink::from_settings(settings)?)
}

/// Create the binary's sink from settings
#[cfg(not(feature = "kafka"))]
#[instrument(name = "dispatcher_create_sink", skip(settings))]
pub fn create_default_sink(settings: &Settings) -> Result<DefaultSink, DispatcherError> {
    tracing::warn!(
        passthrough_keys = settings.passthrough().count(),
        "built without the kafka feature, records are only logged"
    );
    Ok(LogSink::new("log"))
}

#[cfg(all(test, feature = "kafka"))]
mod tests {
    use super::*;
    use contracts::ContractError;

    #[test]
    fn test_rejected_producer_config_keeps_cause() {
        let settings: Settings = [("no.such.property", "1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let err = create_default_sink(&settings).unwrap_err();
        assert!(matches!(
            err,
            DispatcherError::Contract(ContractError::SinkCreation { .. })
        ));
        let message = err.to_string();
        assert_eq!(message.matches("creation error").count(), 1, "got: {message}");
        assert!(message.contains("sink 'kafka'"), "got: {message}");
    }
}
