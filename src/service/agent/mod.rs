//! Response generation through an external AI agent.
//!
//! The agent is a black box: it is handed a prompt plus the routing context of the
//! conversation, and either returns the reply text or fails.  The `GenericAgentClient`
//! trait keeps the dispatcher independent of how the agent is actually run.

pub mod script;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::{error::AgentError, types::AgentContext};

// Traits.

/// Generic agent trait that clients must implement.
#[async_trait]
pub trait GenericAgentClient: Send + Sync + 'static {
    /// Generate a reply to `prompt`.
    ///
    /// An `Ok` with an empty string means the agent delivered the reply itself, so the
    /// caller has nothing to post.
    async fn generate(&self, prompt: &str, context: &AgentContext) -> Result<String, AgentError>;
}

// Structs.

/// Agent client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct AgentClient {
    inner: Arc<dyn GenericAgentClient>,
}

impl Deref for AgentClient {
    type Target = dyn GenericAgentClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl AgentClient {
    pub fn new(inner: Arc<dyn GenericAgentClient>) -> Self {
        Self { inner }
    }
}
