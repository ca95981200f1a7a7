//! Remote conversational agent: service capability, Coze client, and the draft-producing query engine.
//!
//! The service streams chat completions as server-sent events; [`ChatEvent`] is the typed view of
//! each frame and [`AgentQueryEngine`] folds the message deltas into a [`crate::draft::DraftReply`].

mod coze;
mod events;
mod query;
mod service;

pub use coze::CozeClient;
pub use events::{ChatEvent, SseDecoder, SseFrame};
pub use query::{synthetic_user_id, AgentQueryEngine};
pub use service::{AgentError, AgentService, ChatEventStream};
