//! Poll loop: read the chat window, pick the newest actionable message, draft a reply with the
//! agent and let the operator decide.
//!
//! One message is in flight at a time. The loop owns the handled set and the credential manager;
//! every network call and operator prompt blocks the next poll.

use crate::agent::{synthetic_user_id, AgentError, AgentQueryEngine, AgentService};
use crate::approval::{ApprovalController, ApprovalOutcome};
use crate::auth::{AuthError, CredentialError, CredentialManager};
use crate::channels::{ChatDriver, InboundMessage};
use crate::config::RelaySettings;
use crate::dedup::{Deduplicator, MessageKey};
use crate::draft::DraftReply;
use crate::filter::{MessageFilter, Rejection};
use crate::operator::{Operator, OperatorError};
use crate::recovery::{ErrorRecoveryController, RecoveryOutcome};
use std::sync::Arc;

const SEPARATOR_WIDTH: usize = 80;

/// Conditions that stop the loop with an error.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("oauth configuration: {0}")]
    Config(#[from] AuthError),
    #[error("operator input closed")]
    OperatorClosed,
}

/// Why the newest message was not handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Filtered(Rejection),
    Duplicate,
}

/// Result of one poll iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Chat window empty.
    Idle,
    /// Listing messages failed; back off before the next poll.
    ReadFailed,
    Skipped(SkipReason),
    Handled,
    /// Operator asked to quit.
    Terminated,
}

#[derive(Debug, thiserror::Error)]
enum DraftError {
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error(transparent)]
    Query(#[from] AgentError),
}

pub struct Relay {
    driver: Arc<dyn ChatDriver>,
    agent: Arc<dyn AgentService>,
    operator: Box<dyn Operator>,
    credentials: CredentialManager,
    handled: Deduplicator,
    filter: MessageFilter,
    engine: AgentQueryEngine,
    approval: ApprovalController,
    recovery: ErrorRecoveryController,
    settings: RelaySettings,
}

impl Relay {
    pub fn new(
        driver: Arc<dyn ChatDriver>,
        agent: Arc<dyn AgentService>,
        operator: Box<dyn Operator>,
        credentials: CredentialManager,
        settings: RelaySettings,
    ) -> Self {
        Self {
            driver,
            agent,
            operator,
            credentials,
            handled: Deduplicator::new(settings.dedup_high_water, settings.dedup_retain),
            filter: MessageFilter::from_settings(&settings),
            engine: AgentQueryEngine::from_settings(&settings),
            approval: ApprovalController::from_settings(&settings),
            recovery: ErrorRecoveryController::from_settings(&settings),
            settings,
        }
    }

    pub fn handled(&self) -> &Deduplicator {
        &self.handled
    }

    /// Poll until the operator terminates or a fatal error occurs.
    pub async fn run(&mut self) -> Result<(), RelayError> {
        log::info!("relay: polling {} channel", self.driver.id());
        loop {
            let pause = match self.tick().await? {
                Tick::Terminated => return Ok(()),
                Tick::ReadFailed => self.settings.read_backoff,
                Tick::Idle | Tick::Skipped(_) | Tick::Handled => self.settings.poll_interval,
            };
            tokio::time::sleep(pause).await;
        }
    }

    /// One iteration: examine the newest message and handle it if actionable.
    pub async fn tick(&mut self) -> Result<Tick, RelayError> {
        let messages = match self.driver.list_messages().await {
            Ok(messages) => messages,
            Err(e) => {
                log::warn!("relay: listing messages failed: {}", e);
                self.operator
                    .notify(&format!("Unable to read chat messages: {}", e));
                return Ok(Tick::ReadFailed);
            }
        };
        let Some(last) = messages.last() else {
            return Ok(Tick::Idle);
        };
        if let Some(rejection) = self.filter.classify(last) {
            log::debug!("relay: skipping message from {}: {:?}", last.sender, rejection);
            return Ok(Tick::Skipped(SkipReason::Filtered(rejection)));
        }
        let key = MessageKey::of(last);
        if !self.handled.should_process(&key) {
            return Ok(Tick::Skipped(SkipReason::Duplicate));
        }
        self.handled.mark_handled(key);

        let msg = last.clone();
        let terminated = self.handle(&msg).await?;

        self.operator.notify(&"-".repeat(SEPARATOR_WIDTH));
        if terminated {
            return Ok(Tick::Terminated);
        }
        self.operator.notify("Listening for new messages...");
        Ok(Tick::Handled)
    }

    /// Returns true when the operator chose to terminate.
    async fn handle(&mut self, msg: &InboundMessage) -> Result<bool, RelayError> {
        let question = msg.content.trim();
        let banner = "=".repeat(SEPARATOR_WIDTH);
        self.operator.notify("");
        self.operator.notify(&banner);
        self.operator.notify(&format!(
            "[Message] from {}: {}",
            msg.display_sender(),
            question
        ));
        self.operator.notify(&banner);

        let user_id = synthetic_user_id(&msg.sender);
        let draft = match self.draft(&user_id, question).await {
            Ok(draft) => draft,
            Err(DraftError::Credential(CredentialError::Config(e))) => {
                self.operator
                    .notify(&format!("Failed to load the OAuth configuration: {}", e));
                return Err(RelayError::Config(e));
            }
            Err(e) => {
                log::warn!("relay: drafting reply for {} failed: {}", msg.sender, e);
                self.operator.notify(&format!("Agent call failed: {}", e));
                return self.recover(&msg.sender).await;
            }
        };

        let outcome = self
            .approval
            .resolve(
                self.driver.as_ref(),
                self.operator.as_mut(),
                &msg.sender,
                &draft,
            )
            .await;
        match outcome {
            Ok(outcome) => Ok(outcome == ApprovalOutcome::Terminated),
            Err(OperatorError::Closed) => Err(RelayError::OperatorClosed),
            Err(e) => {
                log::warn!("relay: operator prompt failed: {}", e);
                self.operator.notify(&format!("Operator prompt failed: {}", e));
                self.recover(&msg.sender).await
            }
        }
    }

    async fn draft(&mut self, user_id: &str, question: &str) -> Result<DraftReply, DraftError> {
        let credential = self
            .credentials
            .ensure_valid_token(self.agent.as_ref())
            .await?;
        self.operator
            .notify("Asking the agent for a suggested reply...");
        let draft = self
            .engine
            .query(self.agent.as_ref(), credential, user_id, question)
            .await?;
        Ok(draft)
    }

    async fn recover(&mut self, recipient: &str) -> Result<bool, RelayError> {
        let outcome = self
            .recovery
            .recover(self.driver.as_ref(), self.operator.as_mut(), recipient)
            .await
            .map_err(|_| RelayError::OperatorClosed)?;
        Ok(outcome == RecoveryOutcome::Terminated)
    }
}
