//! Failure taxonomy for response generation.
//!
//! Everything else in the bot reports failures through `anyhow` (see [`crate::base::types`]);
//! generation failures are typed so the dispatcher and tests can tell them apart.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while asking the external agent for a reply.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The configured agent executable does not exist.  Nothing was spawned.
    #[error("Agent script not found: {}", .0.display())]
    ScriptNotFound(PathBuf),

    /// A process in the pipeline exited unsuccessfully.
    #[error("Agent process `{program}` failed ({status}): {stderr}")]
    ProcessFailure { program: String, status: String, stderr: String },

    /// The agent exited cleanly but produced no usable text.
    #[error("Empty response from agent")]
    EmptyResponse,

    /// The per-thread session directory could not be created.
    #[error("Failed to create session directory {}: {source}", path.display())]
    SessionDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The process could not be started at all.
    #[error("Failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or waiting on the process failed.
    #[error("Agent I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// Short, stable name of the failure category, used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::ScriptNotFound(_) => "script_not_found",
            AgentError::ProcessFailure { .. } => "process_failure",
            AgentError::EmptyResponse => "empty_response",
            AgentError::SessionDirectory { .. } => "session_directory",
            AgentError::Spawn { .. } => "spawn",
            AgentError::Io(_) => "io",
        }
    }
}

// Tests.
