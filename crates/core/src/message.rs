//! Broker message types
//!
//! This module defines the value the broker hands to the durability layer:
//! - [`Message`]: one produced message, as queued for delivery
//! - [`MessageStatus`]: delivery state of a message
//!
//! The durability layer treats a `Message` as an opaque serializable record.
//! Field names are serialized in camelCase so WAL lines stay readable by the
//! existing broker tooling.

use serde::{Deserialize, Serialize};

/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Current wall-clock time as a [`Timestamp`]
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

/// Delivery state of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    /// Accepted and waiting for a consumer
    #[default]
    Pending,
    /// Delivered and acknowledged
    Consumed,
    /// Delivery failed and will be retried
    Failed,
}

/// A message accepted by the broker
///
/// # Examples
///
/// ```
/// use kapokmq_core::message::{Message, MessageStatus};
///
/// let msg = Message::new("m-1", "orders", "{\"id\":7}");
/// assert_eq!(msg.topic, "orders");
/// assert_eq!(msg.status, MessageStatus::Pending);
/// assert!(msg.consumed_time.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Broker-assigned unique code
    pub message_code: String,
    /// Opaque payload supplied by the producer
    pub message_data: String,
    /// Topic the message was published to
    pub topic: String,
    /// Time the broker accepted the message
    pub create_time: Timestamp,
    /// Time the message was consumed, if it has been
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consumed_time: Option<Timestamp>,
    /// Delivery state
    #[serde(default)]
    pub status: MessageStatus,
    /// Delay before the message becomes deliverable, in milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_time: Option<i64>,
}

impl Message {
    /// Create a pending message stamped with the current time
    pub fn new(
        message_code: impl Into<String>,
        topic: impl Into<String>,
        message_data: impl Into<String>,
    ) -> Self {
        Self {
            message_code: message_code.into(),
            message_data: message_data.into(),
            topic: topic.into(),
            create_time: now_millis(),
            consumed_time: None,
            status: MessageStatus::Pending,
            delay_time: None,
        }
    }

    /// Set a delivery delay (builder pattern)
    pub fn with_delay(mut self, delay_ms: i64) -> Self {
        self.delay_time = Some(delay_ms);
        self
    }

    /// Mark the message consumed at the given time
    pub fn mark_consumed(&mut self, at: Timestamp) {
        self.consumed_time = Some(at);
        self.status = MessageStatus::Consumed;
    }

    /// Check if the message is still waiting for a consumer
    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }
}

impl std::fmt::Display for Message {
    /// Display as `topic/message_code`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.topic, self.message_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_message_is_pending() {
        let msg = Message::new("m-1", "orders", "hello");
        assert!(msg.is_pending());
        assert!(msg.create_time > 0);
        assert_eq!(msg.to_string(), "orders/m-1");
    }

    #[test]
    fn test_mark_consumed() {
        let mut msg = Message::new("m-1", "orders", "hello");
        msg.mark_consumed(42);
        assert_eq!(msg.status, MessageStatus::Consumed);
        assert_eq!(msg.consumed_time, Some(42));
        assert!(!msg.is_pending());
    }

    #[test]
    fn test_json_uses_camel_case_and_omits_absent_fields() {
        let mut msg = Message::new("m-1", "orders", "hello");
        msg.create_time = 1000;
        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("\"messageCode\":\"m-1\""));
        assert!(json.contains("\"createTime\":1000"));
        assert!(json.contains("\"status\":\"pending\""));
        assert!(!json.contains("consumedTime"));
        assert!(!json.contains("delayTime"));
    }

    #[test]
    fn test_json_roundtrip_with_optional_fields() {
        let mut msg = Message::new("m-2", "audit", "payload").with_delay(500);
        msg.mark_consumed(2000);
        let json = serde_json::to_string(&msg).unwrap();
        let decoded: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_missing_status_defaults_to_pending() {
        let json = r#"{"messageCode":"m","messageData":"d","topic":"t","createTime":1}"#;
        let decoded: Message = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.status, MessageStatus::Pending);
        assert_eq!(decoded.delay_time, None);
    }
}
