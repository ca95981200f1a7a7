//! Chat driver capability: list the current chat window and send text to a recipient.

use async_trait::async_trait;

/// Chat driver failure (transport or API).
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("channel api error: {0}")]
    Api(String),
    #[error("channel not configured: {0}")]
    NotConfigured(String),
}

/// External chat channel as seen by the relay.
#[async_trait]
pub trait ChatDriver: Send + Sync {
    /// Channel id (e.g. "telegram").
    fn id(&self) -> &str;

    /// Current messages, most recent last.
    async fn list_messages(&self) -> Result<Vec<super::InboundMessage>, ChannelError>;

    /// Send `text` to `recipient` (the sender id of an inbound message).
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), ChannelError>;
}
