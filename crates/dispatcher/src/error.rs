//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink or settings error (from contract)
    #[error("sink error: {0}")]
    Contract(#[from] contracts::ContractError),
}
