//! Agent query: stream one answer and fold its deltas into a bounded draft reply.

use crate::agent::events::ChatEvent;
use crate::agent::service::{AgentError, AgentService};
use crate::auth::AccessCredential;
use crate::config::{RelaySettings, AGENT_BOT_ID};
use crate::draft::DraftReply;
use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Range of synthetic user ids; distinct senders may share one.
const USER_ID_BUCKETS: u64 = 1_000_000;

/// Stable per-sender user id for the agent service (`relay_<n>`).
pub fn synthetic_user_id(sender: &str) -> String {
    let digest = Sha256::digest(sender.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    format!("relay_{}", u64::from_be_bytes(prefix) % USER_ID_BUCKETS)
}

/// Issues streaming queries against a fixed agent and bounds the result.
#[derive(Debug, Clone)]
pub struct AgentQueryEngine {
    bot_id: String,
    max_chars: usize,
    empty_reply: String,
    open_timeout: Duration,
    idle_timeout: Duration,
}

impl AgentQueryEngine {
    pub fn new(bot_id: impl Into<String>, settings: &RelaySettings) -> Self {
        Self {
            bot_id: bot_id.into(),
            max_chars: settings.max_reply_chars,
            empty_reply: settings.empty_reply_text.clone(),
            open_timeout: settings.request_timeout,
            idle_timeout: settings.stream_idle_timeout,
        }
    }

    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self::new(AGENT_BOT_ID, settings)
    }

    /// Ask `question` on behalf of `user_id`. Stream errors propagate; nothing is retried here.
    ///
    /// Opening the stream is bounded by the request timeout and each later event by the idle
    /// timeout; either expiry is an [`AgentError::Timeout`].
    pub async fn query(
        &self,
        service: &dyn AgentService,
        credential: &AccessCredential,
        user_id: &str,
        question: &str,
    ) -> Result<DraftReply, AgentError> {
        let open = service.stream_chat(&credential.token, &self.bot_id, user_id, question);
        let mut events = tokio::time::timeout(self.open_timeout, open)
            .await
            .map_err(|_| {
                AgentError::Timeout(format!(
                    "chat stream not opened within {:?}",
                    self.open_timeout
                ))
            })??;
        let mut text = String::new();
        loop {
            let next = tokio::time::timeout(self.idle_timeout, events.next())
                .await
                .map_err(|_| {
                    AgentError::Timeout(format!(
                        "no stream event within {:?}",
                        self.idle_timeout
                    ))
                })?;
            let Some(event) = next else { break };
            match event? {
                ChatEvent::MessageDelta(delta) => text.push_str(&delta),
                ChatEvent::ChatFailed(reason) | ChatEvent::Error(reason) => {
                    log::warn!("agent stream reported failure: {}", reason);
                }
                ChatEvent::Unknown(kind) => log::debug!("agent stream: ignoring event {}", kind),
                _ => {}
            }
        }
        Ok(DraftReply::from_accumulated(
            &text,
            &self.empty_reply,
            self.max_chars,
        ))
    }
}
