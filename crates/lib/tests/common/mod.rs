//! Scripted fakes for the chat driver, agent service and operator.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::StreamExt;
use lib::agent::{AgentError, AgentService, ChatEvent, ChatEventStream};
use lib::auth::{AccessToken, JwtOAuthApp, OAuthAppConfig};
use lib::channels::{ChannelError, ChatDriver, InboundMessage};
use lib::config::RelaySettings;
use lib::operator::{Menu, Operator, OperatorError};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn settings() -> RelaySettings {
    RelaySettings {
        recovery_pause: Duration::ZERO,
        ..RelaySettings::default()
    }
}

pub fn private_key_pem() -> String {
    let mut rng = rsa::rand_core::OsRng;
    let key = rsa::RsaPrivateKey::new(&mut rng, 1024).expect("generate rsa key");
    key.to_pkcs8_pem(LineEnding::LF)
        .expect("encode pem")
        .to_string()
}

pub fn oauth_config(api_base: Option<String>) -> OAuthAppConfig {
    OAuthAppConfig {
        client_type: "jwt".to_string(),
        client_id: "1180000001".to_string(),
        public_key_id: "kid-test".to_string(),
        private_key: private_key_pem(),
        coze_api_base: api_base,
        coze_www_base: None,
    }
}

pub fn oauth_app() -> JwtOAuthApp {
    JwtOAuthApp::from_config(&oauth_config(None)).expect("oauth app")
}

pub fn peer(sender: &str, content: &str) -> InboundMessage {
    InboundMessage::from_peer(sender, content)
}

/// Chat driver replaying scripted windows; the last window repeats once the script runs out.
#[derive(Default)]
pub struct FakeDriver {
    windows: Mutex<VecDeque<Result<Vec<InboundMessage>, String>>>,
    current: Mutex<Vec<InboundMessage>>,
    failing_sends: Mutex<usize>,
    send_attempts: Mutex<usize>,
    sent: Mutex<Vec<(String, String)>>,
}

impl FakeDriver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_window(&self, window: Vec<InboundMessage>) {
        self.windows.lock().unwrap().push_back(Ok(window));
    }

    pub fn push_read_error(&self, reason: &str) {
        self.windows.lock().unwrap().push_back(Err(reason.to_string()));
    }

    /// Make the next `n` sends fail.
    pub fn fail_sends(&self, n: usize) {
        *self.failing_sends.lock().unwrap() = n;
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn send_attempts(&self) -> usize {
        *self.send_attempts.lock().unwrap()
    }
}

#[async_trait]
impl ChatDriver for FakeDriver {
    fn id(&self) -> &str {
        "fake"
    }

    async fn list_messages(&self) -> Result<Vec<InboundMessage>, ChannelError> {
        match self.windows.lock().unwrap().pop_front() {
            Some(Ok(window)) => {
                *self.current.lock().unwrap() = window.clone();
                Ok(window)
            }
            Some(Err(reason)) => Err(ChannelError::Api(reason)),
            None => Ok(self.current.lock().unwrap().clone()),
        }
    }

    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), ChannelError> {
        *self.send_attempts.lock().unwrap() += 1;
        let mut failing = self.failing_sends.lock().unwrap();
        if *failing > 0 {
            *failing -= 1;
            return Err(ChannelError::Api("send rejected".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), text.to_string()));
        Ok(())
    }
}

/// One recorded chat request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCall {
    pub bot_id: String,
    pub user_id: String,
    pub question: String,
}

/// Agent that answers every question with fixed deltas unless told to fail.
#[derive(Default)]
pub struct FakeAgent {
    reply: Mutex<Vec<String>>,
    fail_exchange: Mutex<bool>,
    fail_stream: Mutex<bool>,
    exchanges: Mutex<usize>,
    chats: Mutex<Vec<ChatCall>>,
}

impl FakeAgent {
    pub fn answering(deltas: &[&str]) -> Arc<Self> {
        let agent = Self::default();
        *agent.reply.lock().unwrap() = deltas.iter().map(|d| d.to_string()).collect();
        Arc::new(agent)
    }

    pub fn fail_exchange(&self, fail: bool) {
        *self.fail_exchange.lock().unwrap() = fail;
    }

    pub fn fail_stream(&self, fail: bool) {
        *self.fail_stream.lock().unwrap() = fail;
    }

    pub fn exchanges(&self) -> usize {
        *self.exchanges.lock().unwrap()
    }

    pub fn chats(&self) -> Vec<ChatCall> {
        self.chats.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentService for FakeAgent {
    async fn exchange_credential(&self, _app: &JwtOAuthApp) -> Result<AccessToken, AgentError> {
        *self.exchanges.lock().unwrap() += 1;
        if *self.fail_exchange.lock().unwrap() {
            return Err(AgentError::Api("401 invalid assertion".to_string()));
        }
        Ok(AccessToken::new(format!("token-{}", self.exchanges())))
    }

    async fn stream_chat(
        &self,
        _token: &AccessToken,
        bot_id: &str,
        user_id: &str,
        question: &str,
    ) -> Result<ChatEventStream, AgentError> {
        self.chats.lock().unwrap().push(ChatCall {
            bot_id: bot_id.to_string(),
            user_id: user_id.to_string(),
            question: question.to_string(),
        });
        let mut events: Vec<Result<ChatEvent, AgentError>> = vec![Ok(ChatEvent::ChatCreated)];
        events.extend(
            self.reply
                .lock()
                .unwrap()
                .iter()
                .map(|d| Ok(ChatEvent::MessageDelta(d.clone()))),
        );
        if *self.fail_stream.lock().unwrap() {
            events.push(Err(AgentError::Api("stream reset".to_string())));
        }
        events.push(Ok(ChatEvent::ChatCompleted));
        Ok(futures_util::stream::iter(events).boxed())
    }
}

/// Operator answering prompts from a script; an exhausted script reads as closed input.
#[derive(Clone, Default)]
pub struct ScriptedOperator {
    answers: Arc<Mutex<VecDeque<Result<String, OperatorError>>>>,
    choice_prompts: Arc<Mutex<usize>>,
    text_prompts: Arc<Mutex<usize>>,
    notes: Arc<Mutex<Vec<String>>>,
}

impl ScriptedOperator {
    pub fn new(answers: &[&str]) -> Self {
        let op = Self::default();
        op.answers
            .lock()
            .unwrap()
            .extend(answers.iter().map(|a| Ok(a.to_string())));
        op
    }

    pub fn push_io_error(&self) {
        self.answers.lock().unwrap().push_back(Err(OperatorError::Io(
            std::io::Error::new(std::io::ErrorKind::Other, "terminal gone"),
        )));
    }

    pub fn choice_prompts(&self) -> usize {
        *self.choice_prompts.lock().unwrap()
    }

    pub fn text_prompts(&self) -> usize {
        *self.text_prompts.lock().unwrap()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    pub fn notes(&self) -> Vec<String> {
        self.notes.lock().unwrap().clone()
    }

    fn next(&self) -> Result<String, OperatorError> {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(OperatorError::Closed))
    }
}

#[async_trait]
impl Operator for ScriptedOperator {
    async fn prompt_choice(&mut self, _menu: &Menu) -> Result<String, OperatorError> {
        *self.choice_prompts.lock().unwrap() += 1;
        self.next()
    }

    async fn prompt_free_text(&mut self, _label: &str) -> Result<String, OperatorError> {
        *self.text_prompts.lock().unwrap() += 1;
        self.next()
    }

    fn notify(&mut self, line: &str) {
        self.notes.lock().unwrap().push(line.to_string());
    }
}
