//! Core components, types, and utilities for the slack-agent.
//!
//! This module contains fundamental building blocks used throughout the application:
//! - Configuration handling and environment variables.
//! - Built-in system prompt and fixed replies.
//! - Common types, result handling, and the generation error taxonomy.

pub mod config;
pub mod error;
pub mod prompts;
pub mod types;
