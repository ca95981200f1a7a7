//! Inbound chat message as listed by a chat driver; lives for one poll iteration.

/// A message visible in the chat window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender identity; also the recipient for replies.
    pub sender: String,
    /// Human-readable sender name, when the driver knows one.
    pub sender_name: Option<String>,
    pub content: String,
    /// True for messages this relay sent itself.
    pub is_self_sent: bool,
}

impl InboundMessage {
    pub fn from_peer(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            sender_name: None,
            content: content.into(),
            is_self_sent: false,
        }
    }

    pub fn from_self(recipient: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: recipient.into(),
            sender_name: None,
            content: content.into(),
            is_self_sent: true,
        }
    }

    /// Name shown to the operator: display name when known, else the sender id.
    pub fn display_sender(&self) -> &str {
        self.sender_name.as_deref().unwrap_or(&self.sender)
    }
}
