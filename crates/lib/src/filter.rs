//! Classify inbound messages as actionable or silently ignorable.

use crate::channels::InboundMessage;
use crate::config::RelaySettings;

/// Why a message was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    SelfSent,
    Empty,
    TooShort,
    SystemNotice,
}

/// Rejects self-sent, empty, too-short and system-notification messages.
#[derive(Debug, Clone)]
pub struct MessageFilter {
    min_chars: usize,
    keywords: Vec<String>,
}

impl MessageFilter {
    pub fn new(min_chars: usize, keywords: Vec<String>) -> Self {
        Self {
            min_chars,
            keywords,
        }
    }

    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self::new(settings.min_content_chars, settings.system_keywords.clone())
    }

    /// `None` when the message should reach the operator; otherwise the first matching rejection.
    pub fn classify(&self, msg: &InboundMessage) -> Option<Rejection> {
        if msg.is_self_sent {
            return Some(Rejection::SelfSent);
        }
        let trimmed = msg.content.trim();
        if trimmed.is_empty() {
            return Some(Rejection::Empty);
        }
        if trimmed.chars().count() < self.min_chars {
            return Some(Rejection::TooShort);
        }
        if self.keywords.iter().any(|k| msg.content.contains(k.as_str())) {
            return Some(Rejection::SystemNotice);
        }
        None
    }

    pub fn is_actionable(&self, msg: &InboundMessage) -> bool {
        self.classify(msg).is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> MessageFilter {
        MessageFilter::from_settings(&RelaySettings::default())
    }

    #[test]
    fn short_or_blank_content_is_rejected_for_any_sender() {
        let f = filter();
        for sender in ["A", "B", "12345"] {
            assert_eq!(f.classify(&InboundMessage::from_peer(sender, "")), Some(Rejection::Empty));
            assert_eq!(
                f.classify(&InboundMessage::from_peer(sender, "   \n")),
                Some(Rejection::Empty)
            );
            assert_eq!(
                f.classify(&InboundMessage::from_peer(sender, " k ")),
                Some(Rejection::TooShort)
            );
            assert_eq!(
                f.classify(&InboundMessage::from_peer(sender, "好")),
                Some(Rejection::TooShort)
            );
        }
        assert!(f.is_actionable(&InboundMessage::from_peer("A", "ok")));
        assert!(f.is_actionable(&InboundMessage::from_peer("A", "你好")));
    }

    #[test]
    fn system_keywords_match_as_case_sensitive_substrings() {
        let f = MessageFilter::new(2, vec!["Security Notice".to_string()]);
        assert_eq!(
            f.classify(&InboundMessage::from_peer("A", "[Security Notice] new login")),
            Some(Rejection::SystemNotice)
        );
        assert!(f.is_actionable(&InboundMessage::from_peer("A", "security notice?")));
        let default = filter();
        assert!(!default.is_actionable(&InboundMessage::from_peer("A", "【系统通知】版本更新")));
    }

    #[test]
    fn self_sent_is_rejected_regardless_of_content() {
        let f = filter();
        let msg = InboundMessage::from_self("A", "a perfectly normal reply");
        assert_eq!(f.classify(&msg), Some(Rejection::SelfSent));
    }
}
