//! Server-sent event framing and the typed chat events carried by the agent stream.

use crate::agent::service::AgentError;
use serde::Deserialize;

/// One SSE frame: optional `event:` name and joined `data:` lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE decoder: push raw bytes, pull complete frames.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend(chunk.iter().copied().filter(|&b| b != b'\r'));
    }

    /// Next complete frame (terminated by a blank line), skipping frames with no fields.
    pub fn next_frame(&mut self) -> Option<SseFrame> {
        while let Some(pos) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..pos).collect();
            self.buffer.drain(..2);
            if let Some(frame) = parse_frame(&String::from_utf8_lossy(&raw)) {
                return Some(frame);
            }
        }
        None
    }

    /// Frame left in the buffer when the body ended without a trailing blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let raw = std::mem::take(&mut self.buffer);
        parse_frame(&String::from_utf8_lossy(&raw))
    }
}

fn parse_frame(raw: &str) -> Option<SseFrame> {
    let mut event = None;
    let mut data: Vec<&str> = Vec::new();
    for line in raw.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = Some(value.trim().to_string()),
            "data" => data.push(value),
            _ => {}
        }
    }
    if event.is_none() && data.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data.join("\n"),
    })
}

/// Chat stream event, tagged by the `event:` name of its frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    ChatCreated,
    ChatInProgress,
    /// Incremental text of the answer.
    MessageDelta(String),
    MessageCompleted,
    ChatCompleted,
    ChatFailed(String),
    ChatRequiresAction,
    /// Error reported in-band by the service.
    Error(String),
    Done,
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatPayload {
    #[serde(default)]
    last_error: Option<ErrorPayload>,
}

fn describe(err: Option<ErrorPayload>) -> String {
    match err {
        Some(ErrorPayload { code, msg }) => format!(
            "{} {}",
            code.map(|c| c.to_string()).unwrap_or_default(),
            msg.unwrap_or_default()
        )
        .trim()
        .to_string(),
        None => "unknown error".to_string(),
    }
}

impl ChatEvent {
    /// Decode a frame. Delta frames must carry valid JSON; other kinds are lenient.
    pub fn from_frame(frame: &SseFrame) -> Result<Self, AgentError> {
        let kind = frame.event.as_deref().unwrap_or("");
        let event = match kind {
            "conversation.chat.created" => ChatEvent::ChatCreated,
            "conversation.chat.in_progress" => ChatEvent::ChatInProgress,
            "conversation.message.delta" => {
                let payload: MessagePayload =
                    serde_json::from_str(&frame.data).map_err(|e| AgentError::Malformed {
                        kind: kind.to_string(),
                        reason: e.to_string(),
                    })?;
                ChatEvent::MessageDelta(payload.content.unwrap_or_default())
            }
            "conversation.message.completed" => ChatEvent::MessageCompleted,
            "conversation.chat.completed" => ChatEvent::ChatCompleted,
            "conversation.chat.failed" => {
                let payload: Option<ChatPayload> = serde_json::from_str(&frame.data).ok();
                ChatEvent::ChatFailed(describe(payload.and_then(|p| p.last_error)))
            }
            "conversation.chat.requires_action" => ChatEvent::ChatRequiresAction,
            "error" => ChatEvent::Error(describe(serde_json::from_str(&frame.data).ok())),
            "done" => ChatEvent::Done,
            other => ChatEvent::Unknown(other.to_string()),
        };
        Ok(event)
    }
}
