//! 桥接指标收集模块
//!
//! 对 `metrics` 门面的薄封装。未安装 recorder 时所有调用均为空操作。

use contracts::LifecycleState;
use metrics::{counter, gauge, histogram};
use std::time::Duration;

/// 记录从流读取的一行
pub fn record_message_received() {
    counter!("stream_bridge_messages_received_total").increment(1);
}

/// 记录流读取错误
pub fn record_stream_error(client: &str) {
    counter!(
        "stream_bridge_stream_errors_total",
        "client" => client.to_string()
    )
    .increment(1);
}

/// 记录 put/take 之后的中继深度
pub fn record_relay_depth(depth: usize) {
    gauge!("stream_bridge_relay_depth").set(depth as f64);
}

/// 记录提交给 sink 的消息
pub fn record_message_submitted(sink_name: &str) {
    counter!(
        "stream_bridge_messages_submitted_total",
        "sink" => sink_name.to_string()
    )
    .increment(1);
}

/// 记录已完成的投递及其延迟
pub fn record_delivery(topic: &str, success: bool, latency: Duration) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "stream_bridge_deliveries_total",
        "topic" => topic.to_string(),
        "status" => status
    )
    .increment(1);
    histogram!("stream_bridge_delivery_latency_ms").record(latency.as_secs_f64() * 1000.0);
}

/// 记录仍在等待确认的投递数
pub fn record_deliveries_in_flight(count: usize) {
    gauge!("stream_bridge_deliveries_in_flight").set(count as f64);
}

/// 记录排空超时后放弃的投递数
pub fn record_deliveries_abandoned(count: usize) {
    counter!("stream_bridge_deliveries_abandoned_total").increment(count as u64);
}

/// 以序号记录当前生命周期状态
pub fn record_lifecycle_state(state: LifecycleState) {
    gauge!("stream_bridge_lifecycle_state").set(state.ordinal() as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_message_received();
        record_stream_error("scripted");
        record_relay_depth(3);
        record_message_submitted("log");
        record_delivery("t1", true, Duration::from_millis(5));
        record_delivery("t1", false, Duration::from_millis(5));
        record_deliveries_in_flight(0);
        record_deliveries_abandoned(2);
        record_lifecycle_state(LifecycleState::Running);
    }
}
