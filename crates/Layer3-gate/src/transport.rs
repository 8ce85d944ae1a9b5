//! Transport boundary - 메시징 채널 추상화
//!
//! 구현체(채팅 네트워크, 콘솔 등)는 send/edit/delete 세 가지만 제공한다.
//! 각 호출은 일시적 실패(`Timeout`)나 `BadRequest`를 반환할 수 있다.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from transport operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Transient timeout, safe to retry
    #[error("Transport timed out: {0}")]
    Timeout(String),

    /// Request rejected (e.g. the target message no longer exists)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Transport shut down
    #[error("Transport closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Check if this error should be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Reference to a delivered message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    pub chat_id: String,
    pub message_id: String,
}

impl MessageHandle {
    pub fn new(chat_id: impl Into<String>, message_id: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            message_id: message_id.into(),
        }
    }
}

/// Outbound side of a messaging backend
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a new message to a chat
    async fn send(&self, chat_id: &str, text: &str) -> Result<MessageHandle, TransportError>;

    /// Replace the text of a delivered message
    async fn edit(&self, handle: &MessageHandle, text: &str) -> Result<(), TransportError>;

    /// Delete a delivered message
    async fn delete(&self, handle: &MessageHandle) -> Result<(), TransportError>;
}

/// Inbound message from a principal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: String,
    pub sender_name: String,
    pub chat_id: String,
    pub text: String,
}

impl InboundMessage {
    pub fn new(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        chat_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            chat_id: chat_id.into(),
            text: text.into(),
        }
    }

    /// Direct message (chat id equals sender id)
    pub fn private(
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let sender_id = sender_id.into();
        Self::new(sender_id.clone(), sender_name, sender_id, text)
    }

    pub fn is_private(&self) -> bool {
        self.chat_id == self.sender_id
    }

    /// Split `/name arg...` into the command name and arguments
    pub fn command(&self) -> Option<(String, Vec<String>)> {
        let text = self.text.trim();
        let rest = text.strip_prefix('/')?;
        let mut parts = rest.split_whitespace();
        let name = parts.next()?;
        // `/cmd@botname` 형식
        let name = name.split('@').next().unwrap_or(name).to_lowercase();
        Some((name, parts.map(str::to_string).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        let msg = InboundMessage::private("1", "alice", "/Threshold@warden_bot cpu 50");
        let (name, args) = msg.command().unwrap();
        assert_eq!(name, "threshold");
        assert_eq!(args, vec!["cpu", "50"]);

        assert!(InboundMessage::private("1", "alice", "ls -la").command().is_none());
        assert!(InboundMessage::private("1", "alice", "/").command().is_none());
    }

    #[test]
    fn test_private() {
        assert!(InboundMessage::private("1", "a", "x").is_private());
        assert!(!InboundMessage::new("1", "a", "-100", "x").is_private());
    }

    #[test]
    fn test_transient() {
        assert!(TransportError::Timeout("slow".into()).is_transient());
        assert!(!TransportError::BadRequest("gone".into()).is_transient());
        assert!(!TransportError::Closed.is_transient());
    }
}
