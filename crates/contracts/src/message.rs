//! RawMessage / OutboundRecord - 桥接链路中的消息类型

/// 流中接收到的一行文本
///
/// 对桥接链路不透明，所有权依次移交 source -> relay -> dispatcher。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage(String);

impl RawMessage {
    pub fn new(line: impl Into<String>) -> Self {
        Self(line.into())
    }

    /// 原始行内容
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 去掉尾部空白后的内容
    pub fn into_payload(self) -> String {
        let mut line = self.0;
        let len = line.trim_end().len();
        line.truncate(len);
        line
    }
}

impl From<String> for RawMessage {
    fn from(line: String) -> Self {
        Self(line)
    }
}

impl From<&str> for RawMessage {
    fn from(line: &str) -> Self {
        Self(line.to_string())
    }
}

/// 提交给 sink 的记录，每条 `RawMessage` 对应一条
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    /// 目标 topic
    pub topic: String,
    /// 分区键，流消息始终为空
    pub key: Option<String>,
    /// 去空白后的行内容
    pub payload: String,
}

impl OutboundRecord {
    /// 由原始行构造发往 `topic` 的无键记录
    pub fn from_raw(topic: impl Into<String>, message: RawMessage) -> Self {
        Self {
            topic: topic.into(),
            key: None,
            payload: message.into_payload(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_payload_strips_trailing_only() {
        assert_eq!(RawMessage::from("  hello \r\n").into_payload(), "  hello");
        assert_eq!(RawMessage::from("world").into_payload(), "world");
        assert_eq!(RawMessage::from(" \t\n").into_payload(), "");
    }

    #[test]
    fn test_record_from_raw() {
        let record = OutboundRecord::from_raw("t1", RawMessage::from("{\"id\":1}\n"));
        assert_eq!(record.topic, "t1");
        assert_eq!(record.key, None);
        assert_eq!(record.payload, "{\"id\":1}");
    }
}
