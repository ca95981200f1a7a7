//! Operator approval of a draft reply.
//!
//! The operator is shown the draft and picks send, edit-then-send, discard or terminate. Invalid
//! input and cancelled edits return to the menu without limit. A chosen send issues exactly one
//! outbound message, capped in length; a failed send is reported and not retried.

use crate::channels::ChatDriver;
use crate::config::RelaySettings;
use crate::draft::{truncate_chars, DraftReply};
use crate::operator::{Menu, MenuAction, Operator, OperatorError};

/// Operator's resolution of one menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorDecision {
    Send,
    SendEdited(String),
    Discard,
    Terminate,
}

/// Terminal state of an approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Sent,
    SentEdited,
    Discarded,
    Terminated,
}

pub(crate) const EDIT_PROMPT: &str = "Enter a custom reply (leave empty to cancel)";

/// Read an edit; `None` when the operator left it blank.
pub(crate) async fn prompt_edit(
    operator: &mut dyn Operator,
) -> Result<Option<String>, OperatorError> {
    let text = operator.prompt_free_text(EDIT_PROMPT).await?;
    let text = text.trim();
    if text.is_empty() {
        operator.notify("Edit cancelled, nothing sent.");
        return Ok(None);
    }
    Ok(Some(text.to_string()))
}

#[derive(Debug, Clone)]
pub struct ApprovalController {
    menu: Menu,
    max_chars: usize,
}

impl ApprovalController {
    pub fn new(max_chars: usize) -> Self {
        Self {
            menu: Menu::approval(),
            max_chars,
        }
    }

    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self::new(settings.max_reply_chars)
    }

    /// Prompt until the operator reaches a decision.
    pub async fn decide(
        &self,
        operator: &mut dyn Operator,
    ) -> Result<OperatorDecision, OperatorError> {
        loop {
            let input = operator.prompt_choice(&self.menu).await?;
            match self.menu.resolve(&input) {
                Some(MenuAction::Send) => return Ok(OperatorDecision::Send),
                Some(MenuAction::Edit) => {
                    if let Some(text) = prompt_edit(operator).await? {
                        return Ok(OperatorDecision::SendEdited(text));
                    }
                }
                Some(MenuAction::Discard) => return Ok(OperatorDecision::Discard),
                Some(MenuAction::Terminate) => return Ok(OperatorDecision::Terminate),
                None => operator.notify(&format!("Invalid option {:?}, please try again.", input)),
            }
        }
    }

    /// Show `draft`, collect a decision and carry it out against `recipient`.
    pub async fn resolve(
        &self,
        driver: &dyn ChatDriver,
        operator: &mut dyn Operator,
        recipient: &str,
        draft: &DraftReply,
    ) -> Result<ApprovalOutcome, OperatorError> {
        operator.notify("");
        operator.notify(&format!("[Suggested reply]\n{}", draft));
        let decision = self.decide(operator).await?;
        let outcome = match decision {
            OperatorDecision::Send => {
                deliver(driver, operator, recipient, draft.as_str()).await;
                ApprovalOutcome::Sent
            }
            OperatorDecision::SendEdited(text) => {
                deliver(driver, operator, recipient, truncate_chars(&text, self.max_chars)).await;
                ApprovalOutcome::SentEdited
            }
            OperatorDecision::Discard => {
                operator.notify("Message ignored.");
                ApprovalOutcome::Discarded
            }
            OperatorDecision::Terminate => {
                operator.notify("Quitting...");
                ApprovalOutcome::Terminated
            }
        };
        Ok(outcome)
    }
}

/// Send once; failures are reported and the decision still counts as carried out.
async fn deliver(driver: &dyn ChatDriver, operator: &mut dyn Operator, recipient: &str, text: &str) {
    match driver.send_message(recipient, text).await {
        Ok(()) => operator.notify(&format!("[Sent] {}: {}", recipient, text)),
        Err(e) => {
            log::warn!("approval: send to {} failed: {}", recipient, e);
            operator.notify(&format!("Sending to {} failed: {}", recipient, e));
        }
    }
}
