//! Configuration constants and relay tunables.
//!
//! Identifiers (OAuth config path, bot id, API base) are fixed constants. Everything that is
//! configuration rather than logic (pacing, bounds, keyword list, fallback texts) lives in
//! [`RelaySettings`] so tests can construct independent instances.

use std::path::PathBuf;
use std::time::Duration;

/// OAuth application file, resolved against the working directory.
pub const OAUTH_CONFIG_PATH: &str = "coze_oauth_config.json";

/// Agent (bot) the relay forwards questions to.
pub const AGENT_BOT_ID: &str = "git";

/// Base URL of the agent service API.
pub const AGENT_API_BASE: &str = "https://api.coze.cn";

/// Keywords that mark a chat entry as a platform/system notification.
pub const DEFAULT_SYSTEM_KEYWORDS: &[&str] = &[
    "系统通知",
    "安全提示",
    "账号安全性",
    "风险提示",
    "异常行为",
    "微信团队",
    "官方提醒",
    "功能升级",
    "服务调整",
];

/// Substituted when the agent stream produced no text.
pub const DEFAULT_EMPTY_REPLY: &str =
    "Hello, I'm unable to answer this question right now. Please try again later.";

/// Sent from the recovery menu's "send" option when no draft is available.
pub const DEFAULT_SERVICE_UNAVAILABLE: &str =
    "Hello, the assistant service is temporarily unavailable. Please try again later.";

/// Sent automatically once the recovery budget is exhausted.
pub const DEFAULT_FINAL_APOLOGY: &str =
    "Sorry, something went wrong on our side. Please try again later.";

/// Relay tunables.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Pause between polls when idle and after handling a message.
    pub poll_interval: Duration,
    /// Pause after the chat driver fails to list messages.
    pub read_backoff: Duration,
    /// Pause after a failed recovery attempt.
    pub recovery_pause: Duration,
    /// Number of recovery attempts before the automatic apology is sent.
    pub recovery_attempts: usize,
    /// Maximum characters of any outbound reply.
    pub max_reply_chars: usize,
    /// Minimum characters (after trim) for a message to be actionable.
    pub min_content_chars: usize,
    /// Handled-set size that triggers pruning.
    pub dedup_high_water: usize,
    /// Handled-set size kept after pruning (most recent entries).
    pub dedup_retain: usize,
    /// Case-sensitive substrings that mark a system notification.
    pub system_keywords: Vec<String>,
    pub empty_reply_text: String,
    pub service_unavailable_text: String,
    pub final_apology_text: String,
    /// Whole-request timeout for the token exchange.
    pub request_timeout: Duration,
    /// Connect timeout for every agent request.
    pub connect_timeout: Duration,
    /// Maximum wait between two events of an agent stream.
    pub stream_idle_timeout: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            read_backoff: Duration::from_secs(2),
            recovery_pause: Duration::from_secs(2),
            recovery_attempts: 3,
            max_reply_chars: 800,
            min_content_chars: 2,
            dedup_high_water: 300,
            dedup_retain: 200,
            system_keywords: DEFAULT_SYSTEM_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            empty_reply_text: DEFAULT_EMPTY_REPLY.to_string(),
            service_unavailable_text: DEFAULT_SERVICE_UNAVAILABLE.to_string(),
            final_apology_text: DEFAULT_FINAL_APOLOGY.to_string(),
            request_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            stream_idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Resolve the OAuth config path: explicit override, otherwise [`OAUTH_CONFIG_PATH`].
pub fn oauth_config_path(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| PathBuf::from(OAUTH_CONFIG_PATH))
}

/// Resolve the Telegram bot token from `TELEGRAM_BOT_TOKEN`; blank values count as unset.
pub fn resolve_telegram_token() -> Option<String> {
    std::env::var("TELEGRAM_BOT_TOKEN")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
