//! 脚本化流客户端
//!
//! 用于测试的内存客户端，不需要真实的流端点。

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{ContractError, Credentials, FilterTermSet, StreamClient};
use tracing::{debug, trace};

/// 客户端观察到的内容，与测试共享
#[derive(Debug, Default)]
struct ProbeState {
    connect_calls: usize,
    subscribed: Option<FilterTermSet>,
    credentials: Option<Credentials>,
    lines_served: usize,
    closed: bool,
}

/// `ScriptedStreamClient` 的观察句柄
#[derive(Debug, Clone, Default)]
pub struct ScriptProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl ScriptProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 连接尝试次数
    pub fn connect_calls(&self) -> usize {
        self.lock().connect_calls
    }

    /// 最近一次连接时的过滤词
    pub fn subscribed_terms(&self) -> Option<FilterTermSet> {
        self.lock().subscribed.clone()
    }

    /// 最近一次连接时的凭据
    pub fn credentials(&self) -> Option<Credentials> {
        self.lock().credentials.clone()
    }

    /// 已输出的行数
    pub fn lines_served(&self) -> usize {
        self.lock().lines_served
    }

    /// 是否已调用 `close`
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

/// 脚本行用完之后的行为
#[derive(Debug, Clone)]
enum Ending {
    /// 远端结束流
    Eof,
    /// 流保持打开直到被关闭
    HoldOpen,
    /// 读取失败，附带该错误信息
    Fail(String),
}

/// 脚本化流客户端
///
/// 依次输出固定的行，然后结束流。
pub struct ScriptedStreamClient {
    lines: VecDeque<String>,
    ending: Ending,
    connect_error: Option<String>,
    probe: ScriptProbe,
}

impl ScriptedStreamClient {
    /// 创建新的脚本客户端，按顺序输出 `lines`
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ending: Ending::Eof,
            connect_error: None,
            probe: ScriptProbe::default(),
        }
    }

    /// 握手以 `message` 失败的客户端
    pub fn failing_connect(message: impl Into<String>) -> Self {
        let mut client = Self::new(Vec::<String>::new());
        client.connect_error = Some(message.into());
        client
    }

    /// 最后一行之后保持流打开
    pub fn hold_open(mut self) -> Self {
        self.ending = Ending::HoldOpen;
        self
    }

    /// 最后一行之后读取失败
    pub fn then_fail(mut self, message: impl Into<String>) -> Self {
        self.ending = Ending::Fail(message.into());
        self
    }

    /// 观察句柄
    pub fn probe(&self) -> ScriptProbe {
        self.probe.clone()
    }
}

impl StreamClient for ScriptedStreamClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn connect(
        &mut self,
        credentials: &Credentials,
        terms: &FilterTermSet,
    ) -> Result<(), ContractError> {
        {
            let mut state = self.probe.lock();
            state.connect_calls += 1;
            state.subscribed = Some(terms.clone());
            state.credentials = Some(credentials.clone());
        }

        if let Some(message) = &self.connect_error {
            return Err(ContractError::stream_connection("scripted", message.clone()));
        }

        debug!(lines = self.lines.len(), terms = %terms, "scripted stream connected");
        Ok(())
    }

    async fn next_line(&mut self) -> Result<Option<String>, ContractError> {
        if let Some(line) = self.lines.pop_front() {
            self.probe.lock().lines_served += 1;
            trace!(line = %line, "scripted line");
            return Ok(Some(line));
        }

        match &self.ending {
            Ending::Eof => Ok(None),
            Ending::HoldOpen => std::future::pending().await,
            Ending::Fail(message) => Err(ContractError::stream_read("scripted", message.clone())),
        }
    }

    async fn close(&mut self) {
        self.probe.lock().closed = true;
    }
}
