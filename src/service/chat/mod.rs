pub mod slack;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::base::types::{InboundEnvelope, Void};

// Traits.

/// Generic "chat" trait that clients must implement.
///
/// This trait defines the two ends of the chat platform the bot touches: the inbound
/// real-time event stream and the outbound `postMessage` sink.
#[async_trait]
pub trait GenericChatClient: Send + Sync + 'static {
    /// Get the bot user ID.
    ///
    /// Returns the unique identifier for the bot in the chat platform,
    /// which is used to detect when the bot is mentioned.
    fn bot_user_id(&self) -> &str;

    /// Start the chat client listener.
    ///
    /// Every inbound event is forwarded to `events`.  The listener acknowledges an event
    /// to the platform once the receiving side acknowledges the envelope.  Returns when
    /// the listener shuts down.
    async fn start(&self, events: mpsc::Sender<InboundEnvelope>) -> Void;

    /// Send a message to a channel, threaded under `thread_ts` unless it is empty.
    async fn send_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void;
}

// Structs.

/// Chat client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct ChatClient {
    inner: Arc<dyn GenericChatClient>,
}

impl Deref for ChatClient {
    type Target = dyn GenericChatClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl ChatClient {
    pub fn new(inner: Arc<dyn GenericChatClient>) -> Self {
        Self { inner }
    }
}
