//! Bus event types — messages flowing between channels and the journal loop.

use crate::types::LogReport;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// An inbound chat message from a channel to the journal loop.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Channel name (e.g. "discord", "telegram", "cli").
    pub channel: String,
    /// Stable sender identifier within the channel. Used as the journal user id.
    pub sender_id: String,
    /// Chat/conversation identifier.
    pub chat_id: String,
    /// Text content of the message.
    pub content: String,
    /// When the message was created on the channel.
    pub timestamp: DateTime<Utc>,
    /// Channel-specific metadata (e.g. message_id, username, avatar_url).
    pub metadata: HashMap<String, String>,
}

impl InboundMessage {
    /// Create a new inbound message stamped with the current time.
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        InboundMessage {
            channel: channel.into(),
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Override the creation timestamp (channels pass the platform's own time).
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Conversation key combining channel and chat_id (e.g. "discord:123456").
    pub fn conversation_key(&self) -> String {
        format!("{}:{}", self.channel, self.chat_id)
    }

    /// Best display name for the sender: username metadata, else the raw id.
    pub fn display_name(&self) -> &str {
        self.metadata
            .get("username")
            .filter(|name| !name.is_empty())
            .map(|name| name.as_str())
            .unwrap_or(&self.sender_id)
    }

    /// Platform message id, if the channel supplied one.
    pub fn message_id(&self) -> Option<&str> {
        self.metadata.get("message_id").map(|s| s.as_str())
    }
}

/// An outbound reply from the journal loop to a channel.
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    /// Target channel name.
    pub channel: String,
    /// Target chat/conversation identifier.
    pub chat_id: String,
    /// Plain-text content. Always set, also when a report is attached.
    pub content: String,
    /// Optional platform message ID to reply to.
    pub reply_to: Option<String>,
    /// Structured log report for channels that render rich output.
    pub report: Option<LogReport>,
    /// Channel-specific metadata.
    pub metadata: HashMap<String, String>,
}

impl OutboundMessage {
    /// Create a new outbound message.
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        OutboundMessage {
            channel: channel.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            reply_to: None,
            report: None,
            metadata: HashMap::new(),
        }
    }

    /// Build a reply addressed to the chat (and message) an inbound message came from.
    pub fn reply(to: &InboundMessage, content: impl Into<String>) -> Self {
        let mut msg = Self::new(&to.channel, &to.chat_id, content);
        msg.reply_to = to.message_id().map(str::to_string);
        msg
    }

    /// Attach a structured log report.
    pub fn with_report(mut self, report: LogReport) -> Self {
        self.report = Some(report);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_inbound_message_creation() {
        let msg = InboundMessage::new("discord", "user_42", "chan_99", "$logday");

        assert_eq!(msg.channel, "discord");
        assert_eq!(msg.sender_id, "user_42");
        assert_eq!(msg.chat_id, "chan_99");
        assert_eq!(msg.content, "$logday");
        assert!(msg.metadata.is_empty());
    }

    #[test]
    fn test_conversation_key() {
        let msg = InboundMessage::new("discord", "user_1", "channel_abc", "test");
        assert_eq!(msg.conversation_key(), "discord:channel_abc");
    }

    #[test]
    fn test_with_timestamp() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 5, 23, 59, 0).unwrap();
        let msg = InboundMessage::new("cli", "local", "default", "hi").with_timestamp(ts);
        assert_eq!(msg.timestamp, ts);
    }

    #[test]
    fn test_display_name_prefers_username() {
        let mut msg = InboundMessage::new("telegram", "1234", "chat_1", "hi");
        assert_eq!(msg.display_name(), "1234");

        msg.metadata.insert("username".into(), String::new());
        assert_eq!(msg.display_name(), "1234");

        msg.metadata.insert("username".into(), "torrefacto".into());
        assert_eq!(msg.display_name(), "torrefacto");
    }

    #[test]
    fn test_outbound_message_creation() {
        let msg = OutboundMessage::new("telegram", "chat_99", "Saved!");

        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.chat_id, "chat_99");
        assert_eq!(msg.content, "Saved!");
        assert!(msg.reply_to.is_none());
        assert!(msg.report.is_none());
    }

    #[test]
    fn test_reply_targets_origin_message() {
        let mut inbound = InboundMessage::new("discord", "user_1", "chan_1", "$getlogs");
        inbound.metadata.insert("message_id".into(), "msg_77".into());

        let reply = OutboundMessage::reply(&inbound, "ok");
        assert_eq!(reply.channel, "discord");
        assert_eq!(reply.chat_id, "chan_1");
        assert_eq!(reply.reply_to.as_deref(), Some("msg_77"));
    }

    #[test]
    fn test_reply_without_message_id() {
        let inbound = InboundMessage::new("cli", "local", "default", "$logday");
        let reply = OutboundMessage::reply(&inbound, "ok");
        assert!(reply.reply_to.is_none());
    }
}
