//! Library root for `slack-agent`.
//!
//! Slack-agent is a Slack bot that hands conversations to an external AI agent:
//! - Listens to Slack over Socket Mode
//! - Responds when mentioned, or to any message in a direct conversation
//! - Suppresses duplicate deliveries of the same message
//! - Runs the agent as a subprocess and posts its answer in the thread
//!
//! The architecture is built around extensible traits that allow for different
//! implementations of the chat transport and of the agent.

pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use anyhow::anyhow;
use base::{config::Config, types::Void};
use rustls::crypto;
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the slack-agent runtime:
/// - Initializes the crypto provider
/// - Creates the runtime context with the chat and agent clients
/// - Starts the main event loop for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting slack-agent ...");

    // Start the crypto provider.
    crypto::ring::default_provider().install_default().map_err(|_| anyhow!("Failed to install the rustls crypto provider"))?;

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
