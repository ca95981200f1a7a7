//! Telegram channel: short-poll getUpdates into a bounded chat window and sendMessage via Bot API.

use crate::channels::driver::{ChannelError, ChatDriver};
use crate::channels::inbound::InboundMessage;
use crate::config::RelaySettings;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Messages kept in the window returned by `list_messages`.
const WINDOW_CAPACITY: usize = 100;

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<TelegramUpdate>,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram update payload (getUpdates result item).
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub chat: TelegramChat,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct TelegramUser {
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl TelegramUpdate {
    /// Text message from a human, as an inbound message keyed by chat id.
    pub fn to_inbound(&self) -> Option<InboundMessage> {
        let msg = self.message.as_ref()?;
        let text = msg.text.as_ref()?;
        if msg.from.as_ref().is_some_and(|u| u.is_bot) {
            return None;
        }
        let sender_name = msg
            .from
            .as_ref()
            .and_then(|u| u.username.clone().or_else(|| u.first_name.clone()));
        Some(InboundMessage {
            sender: msg.chat.id.to_string(),
            sender_name,
            content: text.clone(),
            is_self_sent: false,
        })
    }
}

/// Telegram chat driver. Keeps the most recent messages of all chats, oldest first.
pub struct TelegramChannel {
    id: String,
    token: Option<String>,
    api_base: String,
    client: reqwest::Client,
    offset: Mutex<Option<i64>>,
    window: Mutex<VecDeque<InboundMessage>>,
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl TelegramChannel {
    pub fn new(token: Option<String>, settings: &RelaySettings) -> Result<Self, ChannelError> {
        Self::with_api_base(token, TELEGRAM_API_BASE, settings)
    }

    /// Use a custom Bot API base (local test servers, proxies).
    /// Every Bot API call is bounded by the connect and request timeouts in `settings`.
    pub fn with_api_base(
        token: Option<String>,
        api_base: &str,
        settings: &RelaySettings,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            id: "telegram".to_string(),
            token,
            api_base: api_base.trim_end_matches('/').to_string(),
            client,
            offset: Mutex::new(None),
            window: Mutex::new(VecDeque::with_capacity(WINDOW_CAPACITY)),
        })
    }

    fn token(&self) -> Result<&str, ChannelError> {
        self.token
            .as_deref()
            .ok_or_else(|| ChannelError::NotConfigured("telegram bot token".to_string()))
    }

    /// Call getUpdates without long-polling (the relay paces itself). Returns (updates, next_offset).
    async fn get_updates(
        &self,
        offset: Option<i64>,
    ) -> Result<(Vec<TelegramUpdate>, Option<i64>), ChannelError> {
        let token = self.token()?;
        let mut url = format!("{}/bot{}/getUpdates?timeout=0", self.api_base, token);
        if let Some(off) = offset {
            url = format!("{}&offset={}", url, off);
        }
        let res = self.client.get(&url).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("getUpdates failed: {} {}", status, body)));
        }
        let data: GetUpdatesResponse = res.json().await?;
        if !data.ok {
            return Err(ChannelError::Api(format!(
                "getUpdates returned ok: false ({})",
                data.description.unwrap_or_default()
            )));
        }
        let next_offset = data
            .result
            .iter()
            .map(|u| u.update_id)
            .max()
            .map(|id| id + 1);
        Ok((data.result, next_offset))
    }

    fn push_window(&self, msg: InboundMessage) {
        let mut window = locked(&self.window);
        window.push_back(msg);
        while window.len() > WINDOW_CAPACITY {
            window.pop_front();
        }
    }

    /// Send a text message to a chat via sendMessage API.
    pub async fn send_text(&self, chat_id: &str, text: &str) -> Result<(), ChannelError> {
        let token = self.token()?;
        let url = format!("{}/bot{}/sendMessage", self.api_base, token);
        let body = serde_json::json!({ "chat_id": chat_id, "text": text });
        let res = self.client.post(&url).json(&body).send().await?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(ChannelError::Api(format!("sendMessage failed: {} {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl ChatDriver for TelegramChannel {
    fn id(&self) -> &str {
        &self.id
    }

    async fn list_messages(&self) -> Result<Vec<InboundMessage>, ChannelError> {
        let offset = *locked(&self.offset);
        let (updates, next) = self.get_updates(offset).await?;
        if next.is_some() {
            *locked(&self.offset) = next;
        }
        for update in &updates {
            if let Some(inbound) = update.to_inbound() {
                log::debug!("telegram: message from chat {}", inbound.sender);
                self.push_window(inbound);
            }
        }
        Ok(locked(&self.window).iter().cloned().collect())
    }

    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        self.send_text(recipient, text).await?;
        self.push_window(InboundMessage::from_self(recipient, text));
        Ok(())
    }
}
