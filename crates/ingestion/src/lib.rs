//! # Ingestion
//!
//! Stream ingestion module.
//!
//! Responsibilities:
//! - Connect a `StreamClient` with the configured credentials and filter terms
//! - Run the emission task that pushes every received line into the relay
//! - Provide the bounded relay (backpressure, FIFO, never drops)
//! - Expose the liveness flag that ends the dispatcher's run loop
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{BoundedRelay, ConfiguredStreamClient, StreamSource};
//!
//! let (producer, consumer) = BoundedRelay::new(settings.relay_capacity()?)?;
//! let client = ConfiguredStreamClient::from_settings(&settings)?;
//! let handle = StreamSource::new(client).connect(&settings, producer).await?;
//!
//! while handle.is_active() {
//!     let Some(message) = consumer.take().await else { break };
//!     // Submit message
//! }
//! ```
//!
//! ## Scripted Testing
//!
//! ```ignore
//! use ingestion::ScriptedStreamClient;
//!
//! let client = ScriptedStreamClient::new(["hello ", "world"]);
//! let probe = client.probe();
//! ```

mod clients;
mod config;
mod error;
mod mock;
mod relay;
mod source;

// Re-exports
pub use clients::{ConfiguredStreamClient, ReplayStreamClient, TcpStreamClient};
pub use config::{RelayConfig, StreamMetrics, StreamMetricsSnapshot};
pub use contracts::RawMessage;
pub use error::{IngestionError, Result};
pub use mock::{ScriptProbe, ScriptedStreamClient};
pub use relay::{BoundedRelay, RelayConsumer, RelayProducer};
pub use source::{StreamCloser, StreamHandle, StreamSource};
