//! Agent service capability and its error type.

use crate::agent::events::ChatEvent;
use crate::auth::{AccessToken, JwtOAuthApp};
use async_trait::async_trait;
use futures_util::stream::BoxStream;

/// Lazily decoded event stream of one chat exchange; consumed exactly once.
pub type ChatEventStream = BoxStream<'static, Result<ChatEvent, AgentError>>;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("agent api error: {0}")]
    Api(String),
    #[error("malformed agent event {kind}: {reason}")]
    Malformed { kind: String, reason: String },
    #[error("agent timed out: {0}")]
    Timeout(String),
    #[error("assertion: {0}")]
    Assertion(String),
}

/// Remote agent: credential exchange and streaming chat.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Exchange the OAuth app for a short-lived access token.
    async fn exchange_credential(&self, app: &JwtOAuthApp) -> Result<AccessToken, AgentError>;

    /// Start a streaming chat for `user_id` asking `question` of agent `bot_id`.
    async fn stream_chat(
        &self,
        token: &AccessToken,
        bot_id: &str,
        user_id: &str,
        question: &str,
    ) -> Result<ChatEventStream, AgentError>;
}
