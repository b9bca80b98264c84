//! Agent client that runs a local executable per request.

use std::{
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    sync::Arc,
};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use crate::base::{
    config::{Config, ResponseMode},
    error::AgentError,
    prompts::resolve_system_prompt,
    types::AgentContext,
};

use super::{AgentClient, GenericAgentClient};

// Extra methods on `AgentClient` applied by the script implementation.

impl AgentClient {
    pub fn script(config: &Config) -> Self {
        let client = ScriptAgentClient::from_config(config);
        Self { inner: Arc::new(client) }
    }
}

// Types.

/// One line of the agent's structured output.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum StreamChunk {
    Text {
        #[serde(default)]
        text: String,
    },
    Content {
        #[serde(default)]
        content: String,
    },
    #[serde(other)]
    Other,
}

/// Program that receives the agent's stdout and posts it to Slack itself.
#[derive(Debug, Clone)]
struct DirectPoster {
    program: PathBuf,
    bot_token: String,
}

// Specific implementations.

/// Runs the configured executable with the prompt as its last argument.
///
/// The process runs inside a per-thread session directory, with the system prompt and
/// the disallowed capabilities passed through the environment.
#[derive(Debug, Clone)]
pub struct ScriptAgentClient {
    script_path: PathBuf,
    sessions_dir: PathBuf,
    extra_args: Vec<String>,
    disallowed_tools: Vec<String>,
    system_prompt: String,
    poster: Option<DirectPoster>,
}

impl ScriptAgentClient {
    pub fn new(script_path: impl Into<PathBuf>, sessions_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_path: script_path.into(),
            sessions_dir: sessions_dir.into(),
            extra_args: Vec::new(),
            disallowed_tools: Vec::new(),
            system_prompt: String::new(),
            poster: None,
        }
    }

    #[instrument(name = "ScriptAgentClient::from_config", skip_all)]
    pub fn from_config(config: &Config) -> Self {
        let client = Self::new(&config.agent_script_path, &config.sessions_dir)
            .with_extra_args(config.extra_args())
            .with_disallowed_tools(config.disallowed_tools())
            .with_system_prompt(&config.system_prompt);

        match config.response_mode {
            ResponseMode::Return => client,
            ResponseMode::Direct => client.with_direct_posting(&config.agent_poster_path, &config.slack_bot_token),
        }
    }

    /// Arguments placed before the prompt.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    pub fn with_disallowed_tools(mut self, tools: Vec<String>) -> Self {
        self.disallowed_tools = tools;
        self
    }

    /// Literal prompt, or the path of a `.txt` file holding it.
    pub fn with_system_prompt(mut self, prompt: &str) -> Self {
        self.system_prompt = prompt.to_string();
        self
    }

    /// Pipe the agent's output into `program`, which posts to the thread on its own.
    pub fn with_direct_posting(mut self, program: impl Into<PathBuf>, bot_token: &str) -> Self {
        self.poster = Some(DirectPoster {
            program: program.into(),
            bot_token: bot_token.to_string(),
        });
        self
    }

    /// Create the session directory for a conversation if it does not exist yet.
    async fn ensure_session_dir(&self, session_key: &str) -> Result<PathBuf, AgentError> {
        let path = self.sessions_dir.join(sanitize_session_key(session_key));

        tokio::fs::create_dir_all(&path).await.map_err(|source| AgentError::SessionDirectory { path: path.clone(), source })?;

        Ok(path)
    }

    fn build_command(&self, prompt: &str, context: &AgentContext, session_dir: &Path) -> Command {
        // The working directory changes, so a relative program path must be pinned first.
        let program = std::path::absolute(&self.script_path).unwrap_or_else(|_| self.script_path.clone());

        let mut command = Command::new(program);

        command
            .args(&self.extra_args)
            .arg(prompt)
            .current_dir(session_dir)
            .env("SLACK_AGENT_PROMPT", prompt)
            .env("SLACK_CHANNEL_ID", &context.channel_id)
            .env("SLACK_THREAD_TS", &context.thread_ts)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let system_prompt = resolve_system_prompt(&self.system_prompt);
        if !system_prompt.is_empty() {
            debug!(length = system_prompt.len(), "Setting SYSTEM_PROMPT.");
            command.env("SYSTEM_PROMPT", system_prompt);
        }

        if !self.disallowed_tools.is_empty() {
            command.env("DISALLOWED_TOOLS", self.disallowed_tools.join(","));
        }

        command
    }

    /// Run the agent and turn its stdout into the reply.
    async fn run_and_collect(&self, mut command: Command) -> Result<String, AgentError> {
        let program = self.script_path.display().to_string();

        let output = command.output().await.map_err(|source| AgentError::Spawn { program: program.clone(), source })?;

        ensure_success(&program, output.status, &output.stderr)?;

        collect_response(&String::from_utf8_lossy(&output.stdout))
    }

    /// Run the agent with its stdout piped into the poster.  Nothing is returned to post.
    async fn run_and_forward(&self, mut command: Command, poster: &DirectPoster, context: &AgentContext, session_dir: &Path) -> Result<String, AgentError> {
        let program = self.script_path.display().to_string();
        let poster_program = poster.program.display().to_string();

        let mut agent = command.spawn().map_err(|source| AgentError::Spawn { program: program.clone(), source })?;

        let agent_stdout: Stdio = agent
            .stdout
            .take()
            .ok_or_else(|| AgentError::Io(std::io::Error::other("agent stdout was not captured")))?
            .try_into()?;

        info!(poster = %poster_program, bot_token = %mask_token(&poster.bot_token), channel_id = %context.channel_id, thread_ts = %context.thread_ts, "Forwarding agent output to poster.");

        let poster_child = Command::new(&poster.program)
            .arg(format!("--bot-token={}", poster.bot_token))
            .arg(format!("--channel-id={}", context.channel_id))
            .arg(format!("--thread-ts={}", context.thread_ts))
            .current_dir(session_dir)
            .stdin(agent_stdout)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AgentError::Spawn { program: poster_program.clone(), source })?;

        let (agent_output, poster_output) = tokio::join!(agent.wait_with_output(), poster_child.wait_with_output());
        let (agent_output, poster_output) = (agent_output?, poster_output?);

        ensure_success(&program, agent_output.status, &agent_output.stderr)?;
        ensure_success(&poster_program, poster_output.status, &poster_output.stderr)?;

        Ok(String::new())
    }
}

#[async_trait]
impl GenericAgentClient for ScriptAgentClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(&self, prompt: &str, context: &AgentContext) -> Result<String, AgentError> {
        if !tokio::fs::try_exists(&self.script_path).await.unwrap_or(false) {
            return Err(AgentError::ScriptNotFound(self.script_path.clone()));
        }

        if prompt.is_empty() {
            warn!("Prompt is empty after removing mentions.");
        }

        let session_dir = self.ensure_session_dir(&context.session_key).await?;
        let command = self.build_command(prompt, context, &session_dir);

        info!(script = %self.script_path.display(), session_dir = %session_dir.display(), direct = self.poster.is_some(), "Running agent.");

        match &self.poster {
            None => self.run_and_collect(command).await,
            Some(poster) => self.run_and_forward(command, poster, context, &session_dir).await,
        }
    }
}

// Helpers.

/// Map a non-zero exit into a `ProcessFailure`, keeping stderr for diagnostics.
fn ensure_success(program: &str, status: ExitStatus, stderr: &[u8]) -> Result<(), AgentError> {
    if status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(stderr).trim().to_string();
    warn!(program, %status, stderr = %stderr, "Agent process failed.");

    Err(AgentError::ProcessFailure {
        program: program.to_string(),
        status: status.to_string(),
        stderr,
    })
}

/// Assemble the reply from the agent's stdout.
///
/// Lines holding a JSON object are structured chunks: `text` and `content` chunks are
/// concatenated in order, anything else is skipped.  Every other line is plain text and
/// is kept as a line.  The result is trimmed; nothing left is an `EmptyResponse`.
pub fn collect_response(stdout: &str) -> Result<String, AgentError> {
    let mut response = String::new();

    for line in stdout.lines() {
        match serde_json::from_str::<Value>(line) {
            Ok(value @ Value::Object(_)) => match serde_json::from_value::<StreamChunk>(value) {
                Ok(StreamChunk::Text { text }) => response.push_str(&text),
                Ok(StreamChunk::Content { content }) => response.push_str(&content),
                Ok(StreamChunk::Other) | Err(_) => {}
            },
            _ => {
                response.push_str(line);
                response.push('\n');
            }
        }
    }

    let response = response.trim();

    if response.is_empty() {
        return Err(AgentError::EmptyResponse);
    }

    Ok(response.to_string())
}

/// Keep session keys (Slack timestamps) from escaping the sessions directory.
fn sanitize_session_key(key: &str) -> String {
    let sanitized: String = key.chars().map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' }).collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') { "default".to_string() } else { sanitized }
}

/// Mask a token for logging.
pub fn mask_token(token: &str) -> String {
    if token.len() <= 8 || !token.is_ascii() {
        return "***".to_string();
    }

    format!("{}...{}", &token[..4], &token[token.len() - 4..])
}

// Tests.
