//! Service integrations for external systems.
//!
//! This module contains the two services the bot talks to:
//! - Chat services (e.g., Slack)
//! - Agent services (e.g., an external agent script)
//!
//! Each service module defines both a generic trait and a concrete implementation,
//! allowing for extensibility and easy testing.

pub mod agent;
pub mod chat;
