//! Relay core library: chat intake, dedup, agent drafts, operator approval and error recovery,
//! used by the relay CLI.

pub mod agent;
pub mod approval;
pub mod auth;
pub mod channels;
pub mod config;
pub mod dedup;
pub mod draft;
pub mod filter;
pub mod operator;
pub mod recovery;
pub mod relay;
