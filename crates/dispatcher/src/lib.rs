//! # Dispatcher
//!
//! 数据分发模块。
//!
//! 负责：
//! - 从中继逐条消费 `RawMessage`
//! - 转换为目标 topic 的 `OutboundRecord`
//! - 提交给 sink，不等待目标确认
//! - 在独立的完成任务上观察投递结果

pub mod completion;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod sinks;

pub use completion::CompletionTracker;
pub use contracts::{MessageSink, OutboundRecord};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::DispatcherError;
pub use metrics::{DeliveryMetrics, DeliverySnapshot};
#[cfg(feature = "kafka")]
pub use sinks::KafkaSink;
pub use sinks::{create_default_sink, DefaultSink, LogSink, RecordingSink, SinkProbe};
