//! StreamClient trait - external stream abstraction
//!
//! The wire-level client that negotiates the push stream. Real network clients,
//! recorded replays and scripted test clients all sit behind this interface.

use crate::{ContractError, Credentials, FilterTermSet};

/// External push-stream client
#[trait_variant::make(StreamClient: Send)]
pub trait LocalStreamClient {
    /// Client name (used for logging)
    fn name(&self) -> &str;

    /// Authenticate and subscribe to `terms`
    ///
    /// # Errors
    /// `Authentication` if the remote rejects the credentials,
    /// `StreamConnection` if the handshake fails.
    async fn connect(
        &mut self,
        credentials: &Credentials,
        terms: &FilterTermSet,
    ) -> Result<(), ContractError>;

    /// Next line from the stream
    ///
    /// `Ok(None)` once the remote has ended the stream.
    async fn next_line(&mut self) -> Result<Option<String>, ContractError>;

    /// Release the connection
    async fn close(&mut self);
}
