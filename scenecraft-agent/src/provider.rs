//! # Proposal Provider Interface
//!
//! The single integration point with the language model: given the rendered
//! scene observation, the goal, and a trailing slice of accepted commands,
//! the provider returns one thought and one command. Everything past this
//! trait - HTTP, auth, response parsing - is a provider implementation
//! detail.

use scenecraft_error::Error;
use scenecraft_scene::CommandEnvelope;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Core Types
// ============================================================================

/// What the provider receives on each loop iteration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProposalRequest {
    /// Rendered observation text - the only scene information the model sees
    pub scene: String,
    pub goal: String,
    /// Trailing slice of accepted commands (bounded by the loop)
    pub history: Vec<CommandEnvelope>,
}

/// What the provider returns: one thought, one command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub thought: String,
    pub command: CommandEnvelope,
}

impl Proposal {
    /// Structural validation: a proposal without a thought or an action is
    /// malformed, a hard failure for the call.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.thought.trim().is_empty() {
            return Err(ProviderError::Malformed(
                "response missing 'thought'".to_string(),
            ));
        }
        if self.command.action.trim().is_empty() {
            return Err(ProviderError::Malformed(
                "response missing 'command.action'".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Error type for provider operations
#[derive(Debug)]
pub enum ProviderError {
    /// Network/connection error
    Network(String),
    /// API returned an error status
    Api { status: u16, message: String },
    /// Rate limited
    RateLimited { retry_after: Option<u64> },
    /// Authentication failed
    AuthenticationFailed,
    /// Unparseable or structurally incomplete response
    Malformed(String),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(e) => write!(f, "network error: {}", e),
            Self::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            Self::RateLimited { retry_after } => {
                write!(f, "rate limited")?;
                if let Some(secs) = retry_after {
                    write!(f, " (retry after {}s)", secs)?;
                }
                Ok(())
            }
            Self::AuthenticationFailed => write!(f, "authentication failed"),
            Self::Malformed(e) => write!(f, "malformed response: {}", e),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        let message = err.to_string();
        match err {
            ProviderError::Network(_) => {
                Error::new(scenecraft_error::ErrorKind::NetworkFailed, message)
            }
            ProviderError::Api { status, .. } => {
                Error::new(scenecraft_error::ErrorKind::ApiFailed, message)
                    .with_context("status", status.to_string())
            }
            ProviderError::RateLimited { .. } => {
                Error::new(scenecraft_error::ErrorKind::RateLimited, message)
            }
            ProviderError::AuthenticationFailed => {
                Error::new(scenecraft_error::ErrorKind::AuthenticationFailed, message)
            }
            ProviderError::Malformed(_) => Error::malformed_proposal(message),
        }
        .with_operation("provider::propose")
    }
}

/// The proposal endpoint abstraction
#[allow(async_fn_in_trait)]
pub trait ProposalProvider: Send + Sync {
    /// Provider name (e.g. "claude", "scripted")
    fn name(&self) -> &str;

    /// Ask for the next thought + command
    async fn propose(&self, request: ProposalRequest) -> Result<Proposal, ProviderError>;
}

// ============================================================================
// Scripted provider (tests, offline demos)
// ============================================================================

/// A provider that serves canned responses in order and records every
/// request it saw. Stands in for the HTTP endpoint in tests.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<Proposal, ProviderError>>>,
    requests: Mutex<Vec<ProposalRequest>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate endpoint latency before each response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Queue a successful proposal
    pub fn push(&self, thought: &str, command: CommandEnvelope) {
        self.responses.lock().unwrap().push_back(Ok(Proposal {
            thought: thought.to_string(),
            command,
        }));
    }

    /// Queue an error
    pub fn push_err(&self, err: ProviderError) {
        self.responses.lock().unwrap().push_back(Err(err));
    }

    /// Every request received, oldest first
    pub fn requests(&self) -> Vec<ProposalRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl ProposalProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn propose(&self, request: ProposalRequest) -> Result<Proposal, ProviderError> {
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Malformed("script exhausted".to_string())))
    }
}
