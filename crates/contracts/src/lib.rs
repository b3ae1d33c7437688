//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the bridge: settings,
//! message types, delivery outcomes, the stream client and sink traits, and
//! the lifecycle state machine.
//! Business crates depend on this crate only, never on each other's internals.
//!
//! ## Message flow
//! `StreamClient` line -> `RawMessage` -> relay -> `OutboundRecord` ->
//! `MessageSink::submit` -> `PendingDelivery` -> `DeliveryOutcome`

mod delivery;
mod error;
mod lifecycle;
mod message;
mod settings;
mod sink;
mod stream_client;

pub use delivery::*;
pub use error::*;
pub use lifecycle::*;
pub use message::*;
pub use settings::*;
pub use sink::*;
pub use stream_client::*;
