//! Event handling for slack-agent.
//!
//! This module decides what the bot does with an inbound event:
//! - Suppressing redelivered events
//! - Detecting whether the bot is addressed
//! - Dispatching addressed messages to the agent and posting the reply

pub mod dedup;
pub mod dispatcher;
pub mod mention;
