//! Layered error definitions
//!
//! Categorized by source: config / auth / stream / relay / sink / lifecycle

use thiserror::Error;

use crate::LifecycleState;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Stream Errors =====
    /// Missing or rejected credentials
    #[error("authentication error: {message}")]
    Authentication { message: String },

    /// Stream handshake failed
    #[error("stream connection error for '{endpoint}': {message}")]
    StreamConnection { endpoint: String, message: String },

    /// Stream read failed after connecting
    #[error("stream '{client}' read error: {message}")]
    StreamRead { client: String, message: String },

    // ===== Sink Errors =====
    /// Sink could not be built from settings
    #[error("sink '{sink_name}' creation error: {message}")]
    SinkCreation { sink_name: String, message: String },

    /// Sink close/flush error
    #[error("sink '{sink_name}' close error: {message}")]
    SinkClose { sink_name: String, message: String },

    // ===== Lifecycle Errors =====
    /// Rejected state transition
    #[error("invalid lifecycle transition {from} -> {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create authentication error for an absent credential key
    pub fn missing_credential(key: &str) -> Self {
        Self::Authentication {
            message: format!("missing credential '{key}'"),
        }
    }

    /// Create stream connection error
    pub fn stream_connection(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamConnection {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create stream read error
    pub fn stream_read(client: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StreamRead {
            client: client.into(),
            message: message.into(),
        }
    }

    /// Create sink creation error
    pub fn sink_creation(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink close error
    pub fn sink_close(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkClose {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the authentication category
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}
