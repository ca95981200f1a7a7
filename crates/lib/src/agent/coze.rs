//! Coze API client (https://api.coze.cn by default).
//! Exchanges JWT assertions for access tokens and streams chat (SSE) from `/v3/chat`.

use crate::agent::events::{ChatEvent, SseDecoder};
use crate::agent::service::{AgentError, AgentService, ChatEventStream};
use crate::auth::{AccessToken, JwtOAuthApp};
use crate::config::{RelaySettings, AGENT_API_BASE};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Requested access-token lifetime, in seconds.
const TOKEN_DURATION_SECS: u64 = 900;

/// Client for the Coze HTTP API.
#[derive(Clone)]
pub struct CozeClient {
    base_url: String,
    request_timeout: Duration,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    duration_seconds: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    bot_id: &'a str,
    user_id: &'a str,
    stream: bool,
    auto_save_history: bool,
    additional_messages: Vec<AdditionalMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AdditionalMessage<'a> {
    role: &'a str,
    content: &'a str,
    content_type: &'a str,
}

/// Error envelope returned as plain JSON instead of an event stream.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    msg: String,
}

impl CozeClient {
    /// `base_url` overrides [`AGENT_API_BASE`] for chat requests. Token requests go to the app's own API base.
    pub fn new(base_url: Option<String>, settings: &RelaySettings) -> Result<Self, AgentError> {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| AGENT_API_BASE.to_string());
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()?;
        Ok(Self {
            base_url,
            request_timeout: settings.request_timeout,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn map_timeout(e: reqwest::Error, what: &str) -> AgentError {
    if e.is_timeout() {
        AgentError::Timeout(what.to_string())
    } else {
        AgentError::Request(e)
    }
}

#[async_trait]
impl AgentService for CozeClient {
    /// POST /api/permission/oauth2/token with a signed JWT assertion.
    async fn exchange_credential(&self, app: &JwtOAuthApp) -> Result<AccessToken, AgentError> {
        let assertion = app
            .assertion_now()
            .map_err(|e| AgentError::Assertion(e.to_string()))?;
        let url = format!("{}/api/permission/oauth2/token", app.api_base());
        let res = self
            .client
            .post(&url)
            .bearer_auth(assertion)
            .timeout(self.request_timeout)
            .json(&TokenRequest {
                grant_type: JWT_BEARER_GRANT,
                duration_seconds: TOKEN_DURATION_SECS,
            })
            .send()
            .await
            .map_err(|e| map_timeout(e, "token exchange"))?;
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| map_timeout(e, "token exchange"))?;
        let data: TokenResponse = serde_json::from_str(&body)
            .map_err(|_| AgentError::Api(format!("token exchange: {} {}", status, body)))?;
        if !status.is_success() {
            return Err(AgentError::Api(format!(
                "token exchange: {} {} {}",
                status,
                data.error.unwrap_or_default(),
                data.error_message.unwrap_or_default()
            )));
        }
        data.access_token
            .filter(|t| !t.is_empty())
            .map(AccessToken::new)
            .ok_or_else(|| AgentError::Api("token exchange: response without access_token".to_string()))
    }

    /// POST /v3/chat with stream: true; decodes the SSE body lazily.
    async fn stream_chat(
        &self,
        token: &AccessToken,
        bot_id: &str,
        user_id: &str,
        question: &str,
    ) -> Result<ChatEventStream, AgentError> {
        let url = format!("{}/v3/chat", self.base_url);
        let body = ChatRequest {
            bot_id,
            user_id,
            stream: true,
            auto_save_history: true,
            additional_messages: vec![AdditionalMessage {
                role: "user",
                content: question,
                content_type: "text",
            }],
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(token.secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| map_timeout(e, "chat request"))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(AgentError::Api(format!("{} {}", status, body)));
        }
        let is_json = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if is_json {
            let envelope: ApiEnvelope = res.json().await?;
            return Err(AgentError::Api(format!("{} {}", envelope.code, envelope.msg)));
        }

        let bytes = res.bytes_stream().boxed();
        let events = futures_util::stream::unfold(
            Some((bytes, SseDecoder::default())),
            |state| async move {
                let Some((mut bytes, mut decoder)) = state else {
                    return None;
                };
                loop {
                    if let Some(frame) = decoder.next_frame() {
                        return Some((ChatEvent::from_frame(&frame), Some((bytes, decoder))));
                    }
                    match bytes.next().await {
                        Some(Ok(chunk)) => decoder.push(&chunk),
                        Some(Err(e)) => return Some((Err(AgentError::Request(e)), None)),
                        None => {
                            return decoder
                                .finish()
                                .map(|frame| (ChatEvent::from_frame(&frame), None));
                        }
                    }
                }
            },
        );
        Ok(events.boxed())
    }
}
