//! Poll loop scenarios against scripted fakes: no network, no terminal.

mod common;

use common::{oauth_app, peer, settings, FakeAgent, FakeDriver, ScriptedOperator};
use lib::agent::synthetic_user_id;
use lib::auth::{AuthError, CredentialManager};
use lib::channels::InboundMessage;
use lib::config::AGENT_BOT_ID;
use lib::filter::Rejection;
use lib::relay::{Relay, RelayError, SkipReason, Tick};
use std::sync::Arc;

fn relay(driver: &Arc<FakeDriver>, agent: &Arc<FakeAgent>, op: &ScriptedOperator) -> Relay {
    Relay::new(
        driver.clone(),
        agent.clone(),
        Box::new(op.clone()),
        CredentialManager::with_app(oauth_app()),
        settings(),
    )
}

#[tokio::test]
async fn repeated_message_is_answered_once() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["Hi! ", "How can I help?"]);
    let op = ScriptedOperator::new(&["1"]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_window(vec![peer("alice", "hello there")]);
    assert_eq!(relay.tick().await.unwrap(), Tick::Handled);

    driver.push_window(vec![peer("alice", "hello there"), peer("alice", "hello there")]);
    assert_eq!(
        relay.tick().await.unwrap(),
        Tick::Skipped(SkipReason::Duplicate)
    );

    assert_eq!(agent.exchanges(), 1);
    assert_eq!(agent.chats().len(), 1);
    assert_eq!(
        driver.sent(),
        vec![("alice".to_string(), "Hi! How can I help?".to_string())]
    );
    assert_eq!(relay.handled().len(), 1);
}

#[tokio::test]
async fn only_the_newest_message_is_examined() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["noted"]);
    let op = ScriptedOperator::new(&["3"]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_window(vec![peer("alice", "first question"), peer("bob", "  second question ")]);
    assert_eq!(relay.tick().await.unwrap(), Tick::Handled);

    let chats = agent.chats();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].bot_id, AGENT_BOT_ID);
    assert_eq!(chats[0].user_id, synthetic_user_id("bob"));
    assert_eq!(chats[0].question, "second question");
    assert!(driver.sent().is_empty());
}

#[tokio::test]
async fn filtered_messages_are_not_marked() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["unused"]);
    let op = ScriptedOperator::new(&[]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_window(vec![
        peer("alice", "question?"),
        InboundMessage::from_self("alice", "answer"),
    ]);
    assert_eq!(
        relay.tick().await.unwrap(),
        Tick::Skipped(SkipReason::Filtered(Rejection::SelfSent))
    );

    driver.push_window(vec![peer("alice", "k")]);
    assert_eq!(
        relay.tick().await.unwrap(),
        Tick::Skipped(SkipReason::Filtered(Rejection::TooShort))
    );

    driver.push_window(vec![peer("system", "【安全提示】请勿泄露验证码")]);
    assert_eq!(
        relay.tick().await.unwrap(),
        Tick::Skipped(SkipReason::Filtered(Rejection::SystemNotice))
    );

    assert!(relay.handled().is_empty());
    assert!(agent.chats().is_empty());
    assert_eq!(op.choice_prompts(), 0);
}

#[tokio::test]
async fn empty_window_is_idle() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&[]);
    let op = ScriptedOperator::new(&[]);
    let mut relay = relay(&driver, &agent, &op);
    assert_eq!(relay.tick().await.unwrap(), Tick::Idle);
}

#[tokio::test]
async fn read_failure_is_reported_and_polling_continues() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["ok"]);
    let op = ScriptedOperator::new(&["1"]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_read_error("window not found");
    driver.push_window(vec![peer("alice", "are you there?")]);
    assert_eq!(relay.tick().await.unwrap(), Tick::ReadFailed);
    assert!(op
        .notes()
        .iter()
        .any(|n| n.starts_with("Unable to read chat messages")));
    assert_eq!(relay.tick().await.unwrap(), Tick::Handled);
    assert_eq!(driver.sent().len(), 1);
}

#[tokio::test]
async fn exchange_failure_goes_to_recovery() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["unused"]);
    agent.fail_exchange(true);
    let op = ScriptedOperator::new(&["3"]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_window(vec![peer("alice", "hello there")]);
    assert_eq!(relay.tick().await.unwrap(), Tick::Handled);
    assert!(agent.chats().is_empty());
    assert!(driver.sent().is_empty());
    assert!(op.notes().iter().any(|n| n.starts_with("Agent call failed")));

    // Same message again: already handled, never re-asked.
    assert_eq!(
        relay.tick().await.unwrap(),
        Tick::Skipped(SkipReason::Duplicate)
    );
    assert_eq!(agent.exchanges(), 1);
}

#[tokio::test]
async fn stream_failure_sends_notice_on_request() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["partial"]);
    agent.fail_stream(true);
    let op = ScriptedOperator::new(&["1"]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_window(vec![peer("carol", "what time is it?")]);
    assert_eq!(relay.tick().await.unwrap(), Tick::Handled);
    assert_eq!(
        driver.sent(),
        vec![("carol".to_string(), settings().service_unavailable_text)]
    );
}

#[tokio::test]
async fn each_message_exchanges_a_fresh_token() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["ok"]);
    let op = ScriptedOperator::new(&["3", "3"]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_window(vec![peer("alice", "first one")]);
    relay.tick().await.unwrap();
    driver.push_window(vec![peer("alice", "second one")]);
    relay.tick().await.unwrap();
    assert_eq!(agent.exchanges(), 2);
}

#[tokio::test]
async fn terminate_stops_the_loop() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["bye"]);
    let op = ScriptedOperator::new(&["4"]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_window(vec![peer("alice", "anyone home?")]);
    assert_eq!(relay.tick().await.unwrap(), Tick::Terminated);
    assert!(driver.sent().is_empty());
}

#[tokio::test]
async fn missing_oauth_config_is_fatal() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["unused"]);
    let op = ScriptedOperator::new(&[]);
    let path = std::env::temp_dir().join(format!("relay-missing-{}.json", uuid::Uuid::new_v4()));
    let mut relay = Relay::new(
        driver.clone(),
        agent.clone(),
        Box::new(op.clone()),
        CredentialManager::new(path),
        settings(),
    );

    driver.push_window(vec![peer("alice", "hello there")]);
    let err = relay.tick().await.unwrap_err();
    assert!(matches!(err, RelayError::Config(AuthError::Read { .. })));
    assert_eq!(agent.exchanges(), 0);
    assert_eq!(op.choice_prompts(), 0);
}

#[tokio::test]
async fn closed_operator_input_is_fatal() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["ok"]);
    let op = ScriptedOperator::new(&[]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_window(vec![peer("alice", "hello there")]);
    let err = relay.tick().await.unwrap_err();
    assert!(matches!(err, RelayError::OperatorClosed));
}

#[tokio::test]
async fn closed_input_during_recovery_is_fatal() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["unused"]);
    agent.fail_exchange(true);
    let op = ScriptedOperator::new(&[]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_window(vec![peer("alice", "hello there")]);
    let err = relay.tick().await.unwrap_err();
    assert!(matches!(err, RelayError::OperatorClosed));
    assert_eq!(driver.send_attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn run_backs_off_and_returns_on_terminate() {
    let driver = FakeDriver::new();
    let agent = FakeAgent::answering(&["ok"]);
    let op = ScriptedOperator::new(&["3", "4"]);
    let mut relay = relay(&driver, &agent, &op);

    driver.push_read_error("chat client closed");
    driver.push_window(vec![peer("alice", "one")]);
    driver.push_window(vec![peer("alice", "one")]);
    driver.push_window(vec![peer("alice", "one"), peer("bob", "two")]);

    let started = tokio::time::Instant::now();
    relay.run().await.unwrap();
    // 2s read backoff, then 1s after the handled and duplicate ticks.
    assert_eq!(started.elapsed(), std::time::Duration::from_secs(4));
    assert_eq!(agent.chats().len(), 2);
    assert_eq!(relay.handled().len(), 2);
}
