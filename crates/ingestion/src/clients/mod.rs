//! Stream client implementations

mod replay;
mod tcp;

pub use replay::ReplayStreamClient;
pub use tcp::TcpStreamClient;

use contracts::{
    ContractError, Credentials, FilterTermSet, Settings, StreamClient, StreamSourceKind,
    STREAM_HOST_KEY, STREAM_REPLAY_PATH_KEY,
};

/// Client selected by `stream.source`
pub enum ConfiguredStreamClient {
    Tcp(TcpStreamClient),
    Replay(ReplayStreamClient),
}

impl ConfiguredStreamClient {
    /// Build the client named by `stream.source`
    pub fn from_settings(settings: &Settings) -> Result<Self, ContractError> {
        let required = |key: &str| {
            settings
                .get(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| {
                    ContractError::config_validation(key, "required by the selected stream.source")
                })
        };

        Ok(match settings.stream_source()? {
            StreamSourceKind::Tcp => Self::Tcp(
                TcpStreamClient::new(required(STREAM_HOST_KEY)?)
                    .with_connect_timeout(settings.stream_connect_timeout()?),
            ),
            StreamSourceKind::Replay => {
                Self::Replay(ReplayStreamClient::new(required(STREAM_REPLAY_PATH_KEY)?))
            }
        })
    }
}

impl StreamClient for ConfiguredStreamClient {
    fn name(&self) -> &str {
        match self {
            Self::Tcp(c) => c.name(),
            Self::Replay(c) => c.name(),
        }
    }

    async fn connect(
        &mut self,
        credentials: &Credentials,
        terms: &FilterTermSet,
    ) -> Result<(), ContractError> {
        match self {
            Self::Tcp(c) => c.connect(credentials, terms).await,
            Self::Replay(c) => c.connect(credentials, terms).await,
        }
    }

    async fn next_line(&mut self) -> Result<Option<String>, ContractError> {
        match self {
            Self::Tcp(c) => c.next_line().await,
            Self::Replay(c) => c.next_line().await,
        }
    }

    async fn close(&mut self) {
        match self {
            Self::Tcp(c) => c.close().await,
            Self::Replay(c) => c.close().await,
        }
    }
}
