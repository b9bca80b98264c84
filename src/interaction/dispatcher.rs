//! Routing of inbound chat events to the agent and back.
//!
//! Every event is acknowledged first, then it goes through a fixed pipeline:
//! normalize, drop duplicates, check that the bot is addressed, and finally hand
//! the message to a detached task that generates and posts the reply.

use chrono::Utc;
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    base::types::{AgentContext, BotIdentity, ChatEvent, InboundEnvelope, InboundMessage, Void},
    interaction::{dedup::DedupGuard, mention},
    service::{agent::AgentClient, chat::ChatClient},
};

/// What happened to one inbound envelope.
#[derive(Debug)]
pub enum Intake {
    /// Not a message the bot responds to: another event kind, a bot, a system message, or itself.
    Ignored,
    /// The same message was processed within the suppression window.
    Duplicate,
    /// Neither a mention of the bot nor a direct message.
    NotAddressed,
    /// The transport reported a connection problem.
    Disconnected,
    /// A reply is being produced by the returned task.
    Dispatched(JoinHandle<Void>),
}

/// Routes events to the agent and posts its replies.
///
/// This is trivially cloneable; each dispatched reply task holds its own clone.
#[derive(Clone)]
pub struct Dispatcher {
    identity: BotIdentity,
    dedup: DedupGuard,
    agent: AgentClient,
    chat: ChatClient,
    degraded_message: String,
}

impl Dispatcher {
    pub fn new(identity: BotIdentity, dedup: DedupGuard, agent: AgentClient, chat: ChatClient, degraded_message: impl Into<String>) -> Self {
        Self {
            identity,
            dedup,
            agent,
            chat,
            degraded_message: degraded_message.into(),
        }
    }

    /// Process one envelope from the transport.
    ///
    /// Never blocks on generation: an addressed, non-duplicate message is handed to a
    /// spawned task and the handle is returned.
    #[instrument(name = "Dispatcher::handle", skip_all)]
    pub fn handle(&self, envelope: InboundEnvelope) -> Intake {
        let event = match envelope {
            InboundEnvelope::ConnectionError(reason) => {
                warn!("Chat connection error, waiting for the transport to reconnect: {}", reason);
                return Intake::Disconnected;
            }
            InboundEnvelope::Event { event, ack } => {
                // Acknowledge before any processing.
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }

                event
            }
        };

        let Some(message) = normalize(&event, &self.identity) else {
            debug!("Ignoring event: {:?}", event);
            return Intake::Ignored;
        };

        if !self.dedup.should_process(&message.fingerprint(), Instant::now()) {
            info!(channel = %message.channel_id, ts = %message.ts, "Dropping duplicate message.");
            return Intake::Duplicate;
        }

        if !mention::is_addressed(&self.identity.bot_user_id, &message.channel_id, &message.text) {
            debug!(channel = %message.channel_id, "Message is not addressed to the bot.");
            return Intake::NotAddressed;
        }

        info!(channel = %message.channel_id, thread = %message.thread_ts, sender = %message.sender_id, "Dispatching message.");

        let dispatcher = self.clone();
        let handle = tokio::spawn(
            async move {
                let result = dispatcher.respond(message).await;

                if let Err(err) = &result {
                    error!("Error while responding: {}", err);
                }

                result
            }
            .in_current_span(),
        );

        Intake::Dispatched(handle)
    }

    /// Generate a reply for `message` and post it into the message's thread.
    ///
    /// A failed generation posts the degraded message instead; the failure detail only
    /// goes to the log.  An empty reply means the agent already posted, so nothing is sent.
    /// Errors from the chat sink are returned and not retried.
    #[instrument(name = "Dispatcher::respond", skip_all, fields(channel = %message.channel_id, thread = %message.thread_ts))]
    pub async fn respond(&self, message: InboundMessage) -> Void {
        let prompt = mention::strip_mentions(&message.text);
        let context = AgentContext::from(&message);

        let reply = match self.agent.generate(&prompt, &context).await {
            Ok(text) if text.is_empty() => {
                debug!("Agent delivered its reply directly.");
                return Ok(());
            }
            Ok(text) => text,
            Err(err) => {
                error!(kind = err.kind(), "Agent failed to generate a reply: {}", err);
                self.degraded_message.clone()
            }
        };

        self.chat.send_message(&message.channel_id, &message.thread_ts, &reply).await
    }

    /// Consume envelopes until the stream closes or `shutdown` resolves.
    ///
    /// Reply tasks already dispatched are left to finish on their own.
    #[instrument(name = "Dispatcher::run", skip_all)]
    pub async fn run<S>(self, mut events: mpsc::Receiver<InboundEnvelope>, shutdown: S)
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, dispatcher stopping.");
                    break;
                }
                envelope = events.recv() => match envelope {
                    Some(envelope) => {
                        let _ = self.handle(envelope);
                    }
                    None => {
                        info!("Event stream closed, dispatcher stopping.");
                        break;
                    }
                },
            }
        }
    }
}

/// Message subtypes that still carry something a user wrote to the bot.
const USER_MESSAGE_SUBTYPES: &[&str] = &["file_share", "thread_broadcast", "me_message"];

/// Turn a raw event into a message the bot may respond to.
///
/// Returns `None` for other event kinds, messages from bot integrations, system subtypes
/// (edits, deletions, joins), messages without a sender, and the bot's own messages.
pub fn normalize(event: &ChatEvent, identity: &BotIdentity) -> Option<InboundMessage> {
    let body = match event {
        ChatEvent::Message(body) | ChatEvent::AppMention(body) => body,
        ChatEvent::Unsupported => return None,
    };

    if body.bot_id.is_some() {
        return None;
    }

    if let Some(subtype) = body.subtype.as_deref()
        && !USER_MESSAGE_SUBTYPES.contains(&subtype)
    {
        return None;
    }

    let sender_id = body.user.as_deref().filter(|user| !user.is_empty())?;

    if sender_id == identity.bot_user_id {
        return None;
    }

    Some(InboundMessage {
        sender_id: sender_id.to_string(),
        channel_id: body.channel.clone(),
        text: body.text.clone(),
        thread_ts: body.thread_ts.clone().unwrap_or_default(),
        ts: body.ts.clone(),
        received_at: Utc::now(),
    })
}

// Tests.
