//! Line-delimited stream over TCP
//!
//! Handshake: the client writes one JSON subscription line, the server answers
//! with one JSON status line, then pushes one event per line. Blank lines are
//! keep-alives.

use std::time::Duration;

use contracts::{
    ContractError, Credentials, FilterTermSet, StreamClient, DEFAULT_STREAM_CONNECT_TIMEOUT,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::{debug, instrument, trace};

const CLIENT_NAME: &str = "tcp";

#[derive(Debug, Serialize)]
struct Subscription<'a> {
    consumer_key: &'a str,
    token: &'a str,
    track: &'a [String],
}

#[derive(Debug, Deserialize)]
struct HandshakeStatus {
    status: u16,
    #[serde(default)]
    message: String,
}

/// TCP stream client
pub struct TcpStreamClient {
    host: String,
    connect_timeout: Duration,
    reader: Option<BufReader<OwnedReadHalf>>,
    writer: Option<OwnedWriteHalf>,
}

impl TcpStreamClient {
    /// Client for `host` (`addr:port`)
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            connect_timeout: DEFAULT_STREAM_CONNECT_TIMEOUT,
            reader: None,
            writer: None,
        }
    }

    /// Bound on connect plus handshake
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Target endpoint
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    fn connection_error(&self, message: impl Into<String>) -> ContractError {
        ContractError::stream_connection(&self.host, message)
    }

    async fn handshake(
        &self,
        credentials: &Credentials,
        terms: &FilterTermSet,
    ) -> Result<(BufReader<OwnedReadHalf>, OwnedWriteHalf), ContractError> {
        let stream = TcpStream::connect(&self.host)
            .await
            .map_err(|e| self.connection_error(e.to_string()))?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let subscription = Subscription {
            consumer_key: &credentials.consumer_key,
            token: &credentials.token,
            track: terms.terms(),
        };
        let mut line = serde_json::to_string(&subscription)
            .map_err(|e| self.connection_error(e.to_string()))?;
        line.push('\n');
        write_half
            .write_all(line.as_bytes())
            .await
            .map_err(|e| self.connection_error(e.to_string()))?;

        let mut reply = String::new();
        let read = reader
            .read_line(&mut reply)
            .await
            .map_err(|e| self.connection_error(e.to_string()))?;
        if read == 0 {
            return Err(self.connection_error("closed during handshake"));
        }

        let status: HandshakeStatus = serde_json::from_str(reply.trim())
            .map_err(|e| self.connection_error(format!("bad handshake reply: {e}")))?;
        match status.status {
            200 => Ok((reader, write_half)),
            401 | 403 => Err(ContractError::Authentication {
                message: format!("rejected by {}: {}", self.host, status.message),
            }),
            code => Err(self.connection_error(format!("status {code}: {}", status.message))),
        }
    }
}

impl StreamClient for TcpStreamClient {
    fn name(&self) -> &str {
        CLIENT_NAME
    }

    #[instrument(name = "tcp_stream_connect", skip_all, fields(host = %self.host))]
    async fn connect(
        &mut self,
        credentials: &Credentials,
        terms: &FilterTermSet,
    ) -> Result<(), ContractError> {
        let (reader, writer) =
            tokio::time::timeout(self.connect_timeout, self.handshake(credentials, terms))
                .await
                .map_err(|_| {
                    self.connection_error(format!(
                        "no handshake reply within {:?}",
                        self.connect_timeout
                    ))
                })??;

        debug!("handshake accepted");
        self.reader = Some(reader);
        self.writer = Some(writer);
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, ContractError> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut line = String::new();
        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .await
                .map_err(|e| ContractError::stream_read(CLIENT_NAME, e.to_string()))?;
            if read == 0 {
                return Ok(None);
            }
            if line.trim().is_empty() {
                trace!("keep-alive");
                continue;
            }
            let len = line.trim_end_matches(['\r', '\n']).len();
            line.truncate(len);
            return Ok(Some(line));
        }
    }

    async fn close(&mut self) {
        self.reader = None;
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        debug!(host = %self.host, "tcp stream closed");
    }
}
