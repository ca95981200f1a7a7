//! Operator-driven recovery after a credential or agent failure.
//!
//! No draft exists, so the menu's send option delivers a fixed service-unavailable notice. Invalid
//! input and cancelled edits re-prompt for free, as in approval. Only attempts that fail count
//! against the budget, and each failure pauses before the next prompt. Once the budget runs out a
//! fixed apology is sent once; if that fails too the message is dropped. Closed operator input
//! ends recovery with an error.

use crate::approval::prompt_edit;
use crate::channels::{ChannelError, ChatDriver};
use crate::config::RelaySettings;
use crate::draft::truncate_chars;
use crate::operator::{Menu, MenuAction, Operator, OperatorError};
use std::time::Duration;

/// Terminal state of a recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Sent,
    SentEdited,
    Discarded,
    Terminated,
    /// Budget exhausted; the automatic apology went out.
    FallbackSent,
    /// Budget exhausted and the apology could not be sent.
    FallbackFailed,
}

#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Operator(#[from] OperatorError),
    #[error("send failed: {0}")]
    Send(#[from] ChannelError),
}

#[derive(Debug, Clone)]
pub struct ErrorRecoveryController {
    menu: Menu,
    attempts: usize,
    pause: Duration,
    max_chars: usize,
    unavailable_text: String,
    apology_text: String,
}

impl ErrorRecoveryController {
    pub fn from_settings(settings: &RelaySettings) -> Self {
        Self {
            menu: Menu::recovery(),
            attempts: settings.recovery_attempts,
            pause: settings.recovery_pause,
            max_chars: settings.max_reply_chars,
            unavailable_text: settings.service_unavailable_text.clone(),
            apology_text: settings.final_apology_text.clone(),
        }
    }

    /// Handle a failed message for `recipient`. Only closed operator input escapes as an error.
    pub async fn recover(
        &self,
        driver: &dyn ChatDriver,
        operator: &mut dyn Operator,
        recipient: &str,
    ) -> Result<RecoveryOutcome, OperatorError> {
        let mut failures = 0;
        while failures < self.attempts {
            match self.attempt(driver, operator, recipient).await {
                Ok(Some(outcome)) => return Ok(outcome),
                Ok(None) => {}
                Err(AttemptError::Operator(OperatorError::Closed)) => {
                    return Err(OperatorError::Closed)
                }
                Err(e) => {
                    failures += 1;
                    log::warn!("recovery attempt {}/{} failed: {}", failures, self.attempts, e);
                    operator.notify(&format!("Error while handling the failure: {}", e));
                    tokio::time::sleep(self.pause).await;
                }
            }
        }

        let outcome = match driver.send_message(recipient, &self.apology_text).await {
            Ok(()) => {
                operator.notify("Recovery attempts exhausted; sent the automatic apology.");
                RecoveryOutcome::FallbackSent
            }
            Err(e) => {
                log::warn!("recovery: fallback send to {} failed: {}", recipient, e);
                operator.notify(&format!("Automatic apology could not be sent: {}", e));
                RecoveryOutcome::FallbackFailed
            }
        };
        Ok(outcome)
    }

    /// One prompt. `Ok(None)` means re-prompt without charging the budget.
    async fn attempt(
        &self,
        driver: &dyn ChatDriver,
        operator: &mut dyn Operator,
        recipient: &str,
    ) -> Result<Option<RecoveryOutcome>, AttemptError> {
        let input = operator.prompt_choice(&self.menu).await?;
        let outcome = match self.menu.resolve(&input) {
            Some(MenuAction::Send) => {
                driver.send_message(recipient, &self.unavailable_text).await?;
                operator.notify("[Sent] service-unavailable notice");
                RecoveryOutcome::Sent
            }
            Some(MenuAction::Edit) => {
                let Some(text) = prompt_edit(operator).await? else {
                    return Ok(None);
                };
                let text = truncate_chars(&text, self.max_chars);
                driver.send_message(recipient, text).await?;
                operator.notify(&format!("[Sent] {}: {}", recipient, text));
                RecoveryOutcome::SentEdited
            }
            Some(MenuAction::Discard) => {
                operator.notify("Message ignored.");
                RecoveryOutcome::Discarded
            }
            Some(MenuAction::Terminate) => {
                operator.notify("Quitting...");
                RecoveryOutcome::Terminated
            }
            None => {
                operator.notify(&format!("Invalid option {:?}, please try again.", input));
                return Ok(None);
            }
        };
        Ok(Some(outcome))
    }
}
