//! Slack Socket Mode implementation of the chat service.
//!
//! This module provides the Slack side of the bot:
//! - Receiving push events over Socket Mode and forwarding them to the dispatcher
//! - Posting replies with `chat.postMessage`
//! - Resolving the bot's own user ID via `auth.test`

use crate::base::{
    config::Config,
    prompts,
    types::{ChatEvent, ChatEventBody, InboundEnvelope, Res, Void},
};
use anyhow::anyhow;
use async_trait::async_trait;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use slack_morphism::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use std::{ops::Deref, sync::Arc};

use super::{ChatClient, GenericChatClient};

// Type aliases.

type FullClient = slack_morphism::SlackClient<SlackClientHyperConnector<HttpsConnector<HttpConnector>>>;

// Extra methods on `ChatClient` applied by the slack implementation.

impl ChatClient {
    /// Creates a new Slack chat client.
    pub async fn slack(config: &Config) -> Res<Self> {
        let client = SlackChatClient::new(config).await?;
        Ok(Self { inner: Arc::new(client) })
    }
}

// Structs.

/// User state for the slack socket client.
struct SlackUserState {
    events: mpsc::Sender<InboundEnvelope>,
}

/// Slack client implementation.
#[derive(Clone)]
struct SlackChatClient {
    app_token: SlackApiToken,
    bot_token: SlackApiToken,
    bot_user_id: String,
    client: Arc<FullClient>,
}

impl Deref for SlackChatClient {
    type Target = FullClient;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SlackChatClient {
    /// Create a new Slack chat client.
    #[instrument(name = "SlackChatClient::new", skip_all)]
    pub async fn new(config: &Config) -> Res<Self> {
        // Initialize tokens.

        let app_token = SlackApiToken::new(SlackApiTokenValue(config.slack_app_token.clone()));
        let bot_token = SlackApiToken::new(SlackApiTokenValue(config.slack_bot_token.clone()));

        // Initialize the Slack client.

        let https_connector = HttpsConnector::<HttpConnector>::builder().with_native_roots()?.https_only().enable_all_versions().build();
        let connector = SlackClientHyperConnector::with_connector(https_connector);
        let client = Arc::new(slack_morphism::SlackClient::new(connector));

        // Get the bot's user ID.

        let session = client.open_session(&bot_token);
        let bot_user = session.auth_test().await?;
        let bot_user_id = bot_user.user_id.0;

        info!("Slack bot user ID: {}", bot_user_id);

        Ok(Self {
            app_token,
            bot_token,
            bot_user_id,
            client,
        })
    }
}

#[async_trait]
impl GenericChatClient for SlackChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self, events: mpsc::Sender<InboundEnvelope>) -> Void {
        // Initialize the socket mode listener.

        let socket_mode_callbacks = SlackSocketModeListenerCallbacks::new()
            .with_command_events(handle_command_event)
            .with_interaction_events(handle_interaction_event)
            .with_push_events(handle_push_event);

        // Initialize the socket mode listener environment.

        let listener_environment = Arc::new(
            SlackClientEventsListenerEnvironment::new(self.client.clone())
                .with_error_handler(handle_listener_error)
                .with_user_state(SlackUserState { events }),
        );

        let socket_mode_listener = Arc::new(SlackClientSocketModeListener::new(
            &SlackClientSocketModeConfig::new(),
            listener_environment.clone(),
            socket_mode_callbacks,
        ));

        // Register an app token to listen for events,
        socket_mode_listener.listen_for(&self.app_token).await?;

        // Start WS connections calling Slack API to get WS url for the token,
        // and wait for Ctrl-C to shutdown.
        socket_mode_listener.serve().await;

        info!("Slack socket mode listener stopped.");

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void {
        let message = SlackMessageContent::new().with_text(text.to_string());

        let mut request = SlackApiChatPostMessageRequest::new(SlackChannelId(channel_id.to_string()), message).with_link_names(true);

        if !thread_ts.is_empty() {
            request = request.with_thread_ts(SlackTs(thread_ts.to_string()));
        }

        let session = self.client.open_session(&self.bot_token);

        let _ = session.chat_post_message(&request).await.map_err(|e| anyhow!("Failed to send message: {}", e))?;

        Ok(())
    }
}

// Conversions from Slack events.

/// Normalize a Slack push event into the transport-neutral event.
fn to_chat_event(event: SlackEventCallbackBody) -> ChatEvent {
    match event {
        SlackEventCallbackBody::Message(message) => ChatEvent::Message(ChatEventBody {
            user: message.sender.user.as_ref().map(|u| u.0.clone()),
            bot_id: message.sender.bot_id.as_ref().map(|b| b.0.clone()),
            subtype: message.subtype.as_ref().map(subtype_name),
            channel: message.origin.channel.as_ref().map(|c| c.0.clone()).unwrap_or_default(),
            text: message.content.as_ref().and_then(|c| c.text.clone()).unwrap_or_default(),
            thread_ts: message.origin.thread_ts.as_ref().map(|t| t.0.clone()),
            ts: message.origin.ts.0.clone(),
        }),
        SlackEventCallbackBody::AppMention(mention) => ChatEvent::AppMention(ChatEventBody {
            user: Some(mention.user.0.clone()),
            bot_id: None,
            subtype: None,
            channel: mention.channel.0.clone(),
            text: mention.content.text.clone().unwrap_or_default(),
            thread_ts: mention.origin.thread_ts.as_ref().map(|t| t.0.clone()),
            ts: mention.origin.ts.0.clone(),
        }),
        _ => ChatEvent::Unsupported,
    }
}

/// Wire name of a message subtype, e.g. `file_share`.
fn subtype_name(subtype: &SlackMessageEventType) -> String {
    match serde_json::to_value(subtype) {
        Ok(serde_json::Value::String(name)) => name,
        _ => format!("{subtype:?}"),
    }
}

// Socket mode listener callbacks for Slack.

/// Handles command events from Slack.
async fn handle_command_event(
    event: SlackCommandEvent,
    _client: Arc<SlackHyperClient>,
    _states: SlackClientEventsUserState,
) -> Result<SlackCommandEventResponse, Box<dyn std::error::Error + Send + Sync>> {
    warn!("[COMMAND] {:#?}", event);
    Ok(SlackCommandEventResponse::new(SlackMessageContent::new().with_text(prompts::UNSUPPORTED_COMMAND_MESSAGE.into())))
}

/// Handles interaction events from Slack.
async fn handle_interaction_event(event: SlackInteractionEvent, _client: Arc<SlackHyperClient>, _states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    warn!("[INTERACTION] {:#?}", event);
    Ok(())
}

/// Handles push events from Slack.
///
/// The event is handed to the dispatcher loop, and the callback returns (which lets the
/// listener acknowledge the envelope to Slack) as soon as the loop has taken it.
#[instrument(skip_all)]
async fn handle_push_event(event_callback: SlackPushEventCallback, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let events = {
        let states = states.read().await;
        let user_state = states.get_user_state::<SlackUserState>().ok_or(anyhow!("Failed to get user state"))?;
        user_state.events.clone()
    };

    let event = to_chat_event(event_callback.event);
    debug!("Received push event: {:?}", event);

    let (envelope, ack) = InboundEnvelope::with_ack(event);
    events.send(envelope).await.map_err(|_| anyhow!("Dispatcher is no longer receiving events"))?;

    // A dropped sender means the loop shut down; the event is still acknowledged.
    let _ = ack.await;

    Ok(())
}

/// Handles socket mode transport errors.  The listener reconnects on its own.
fn handle_listener_error(err: Box<dyn std::error::Error + Send + Sync>, _client: Arc<SlackHyperClient>, states: SlackClientEventsUserState) -> HttpStatusCode {
    warn!("Slack socket mode error: {}", err);

    if let Ok(guard) = states.try_read()
        && let Some(user_state) = guard.get_user_state::<SlackUserState>()
    {
        let _ = user_state.events.try_send(InboundEnvelope::ConnectionError(err.to_string()));
    }

    HttpStatusCode::OK
}
