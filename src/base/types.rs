use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

pub type Err = anyhow::Error;
pub type Res<T> = Result<T, Err>;
pub type Void = Res<()>;

/// Identity of the bot on the chat platform, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub bot_user_id: String,
}

impl BotIdentity {
    pub fn new(bot_user_id: impl Into<String>) -> Self {
        Self { bot_user_id: bot_user_id.into() }
    }
}

/// A raw, kind-tagged event as delivered by the chat transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A plain channel, group, or direct message.
    Message(ChatEventBody),
    /// An explicit @-mention of the bot.
    AppMention(ChatEventBody),
    /// Any other event kind; always ignored.
    #[serde(other)]
    Unsupported,
}

/// Payload shared by the message-like event kinds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEventBody {
    /// Sending user, absent for system messages.
    pub user: Option<String>,
    /// Set when the message was posted by a bot integration.
    pub bot_id: Option<String>,
    /// Set for edits, deletions, joins, and other non-plain messages.
    pub subtype: Option<String>,
    pub channel: String,
    #[serde(default)]
    pub text: String,
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub ts: String,
}

/// What the transport hands to the dispatcher loop.
#[derive(Debug)]
pub enum InboundEnvelope {
    /// An event, with an optional channel used to acknowledge receipt back to the transport.
    Event { event: ChatEvent, ack: Option<oneshot::Sender<()>> },
    /// The transport lost its connection; it is expected to reconnect on its own.
    ConnectionError(String),
}

impl InboundEnvelope {
    /// Wrap an event and return the receiver that resolves once the dispatcher acknowledges it.
    pub fn with_ack(event: ChatEvent) -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self::Event { event, ack: Some(tx) }, rx)
    }
}

impl From<ChatEvent> for InboundEnvelope {
    fn from(event: ChatEvent) -> Self {
        Self::Event { event, ack: None }
    }
}

/// A normalized message the bot may respond to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub sender_id: String,
    pub channel_id: String,
    pub text: String,
    /// Thread to reply into; empty for top-level messages.
    pub thread_ts: String,
    /// Timestamp of the message itself.
    pub ts: String,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Key identifying logically identical deliveries of the same message.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}:{}:{}", self.sender_id, self.channel_id, self.thread_ts, self.text)
    }

    /// Key of the agent session directory for this conversation.
    pub fn session_key(&self) -> &str {
        if self.thread_ts.is_empty() { &self.ts } else { &self.thread_ts }
    }
}

/// Routing information passed to the agent alongside the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentContext {
    pub channel_id: String,
    pub thread_ts: String,
    pub session_key: String,
}

impl From<&InboundMessage> for AgentContext {
    fn from(message: &InboundMessage) -> Self {
        Self {
            channel_id: message.channel_id.clone(),
            thread_ts: message.thread_ts.clone(),
            session_key: message.session_key().to_string(),
        }
    }
}

// Tests.
