//! 数据接入错误类型

use contracts::ContractError;
use thiserror::Error;

/// 接入错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 中继容量为 0
    #[error("relay capacity must be > 0")]
    InvalidCapacity,

    /// 中继的消费端已关闭
    #[error("relay closed")]
    RelayClosed,

    /// 配置、认证或连接失败
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl IngestionError {
    /// 是否为认证失败
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Contract(e) if e.is_authentication())
    }
}

/// 接入模块 Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
