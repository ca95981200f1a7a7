//! Chat channels.
//!
//! The relay only needs two capabilities from a channel: list the messages currently in view
//! and send text back to a sender. [`ChatDriver`] captures both; [`TelegramChannel`] is the
//! bundled implementation.

mod driver;
mod inbound;
mod telegram;

pub use driver::{ChannelError, ChatDriver};
pub use inbound::InboundMessage;
pub use telegram::{TelegramChannel, TelegramUpdate};
