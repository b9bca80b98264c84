//! Runtime services and shared state for the slack-agent.

use tokio::sync::mpsc;
use tracing::{info, instrument};

use crate::{
    base::{
        config::Config,
        types::{BotIdentity, Res, Void},
    },
    interaction::{dedup::DedupGuard, dispatcher::Dispatcher},
    service::{agent::AgentClient, chat::ChatClient},
};

/// Capacity of the channel between the transport and the dispatcher loop.
const EVENT_BUFFER: usize = 256;

/// Runtime service context that can be shared across the application.
///
/// This struct holds the chat client, agent client, dedup guard, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The chat client instance.
    pub chat: ChatClient,
    /// The agent client instance.
    pub agent: AgentClient,
    /// Shared record of recently processed messages.
    pub dedup: DedupGuard,
    /// Routes inbound events to the agent.
    pub dispatcher: Dispatcher,
}

impl Runtime {
    /// Create a new runtime instance connected to Slack.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the slack client.
        let chat = ChatClient::slack(&config).await?;

        // Initialize the agent client.
        let agent = AgentClient::script(&config);

        Ok(Self::with_clients(config, chat, agent))
    }

    /// Assemble a runtime from already constructed clients.
    pub fn with_clients(config: Config, chat: ChatClient, agent: AgentClient) -> Self {
        let identity = BotIdentity::new(chat.bot_user_id());
        let dedup = DedupGuard::new(config.dedup_suppression(), config.dedup_retention());
        let dispatcher = Dispatcher::new(identity, dedup.clone(), agent.clone(), chat.clone(), config.degraded_message.clone());

        Self {
            config,
            chat,
            agent,
            dedup,
            dispatcher,
        }
    }

    /// Run until the chat listener stops (on Ctrl-C).
    pub async fn start(&self) -> Void {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);

        let sweeper = self.dedup.spawn_sweeper(self.config.dedup_sweep_interval());

        let dispatcher = self.dispatcher.clone();
        let dispatch_loop = tokio::spawn(dispatcher.run(rx, async {
            let _ = tokio::signal::ctrl_c().await;
        }));

        let result = self.chat.start(tx).await;

        info!("Chat listener returned, stopping background tasks.");

        sweeper.abort();
        dispatch_loop.abort();

        result
    }
}
