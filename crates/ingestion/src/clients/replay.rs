//! 录制流回放
//!
//! 按顺序输出文件中的非空行，读到 EOF 时结束流。

use std::path::PathBuf;

use contracts::{ContractError, Credentials, FilterTermSet, StreamClient};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tracing::{debug, info};

const CLIENT_NAME: &str = "replay";

/// 回放流客户端
pub struct ReplayStreamClient {
    path: PathBuf,
    lines: Option<Lines<BufReader<File>>>,
}

impl ReplayStreamClient {
    /// 创建回放 `path` 的客户端
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: None,
        }
    }
}

impl StreamClient for ReplayStreamClient {
    fn name(&self) -> &str {
        CLIENT_NAME
    }

    async fn connect(
        &mut self,
        _credentials: &Credentials,
        terms: &FilterTermSet,
    ) -> Result<(), ContractError> {
        let file = File::open(&self.path).await.map_err(|e| {
            ContractError::stream_connection(self.path.display().to_string(), e.to_string())
        })?;
        self.lines = Some(BufReader::new(file).lines());
        info!(path = %self.path.display(), terms = %terms, "replaying recorded stream");
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, ContractError> {
        let Some(lines) = self.lines.as_mut() else {
            return Ok(None);
        };

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ContractError::stream_read(CLIENT_NAME, e.to_string()))?
        {
            if !line.trim().is_empty() {
                return Ok(Some(line));
            }
        }
        Ok(None)
    }

    async fn close(&mut self) {
        self.lines = None;
        debug!(path = %self.path.display(), "replay closed");
    }
}
