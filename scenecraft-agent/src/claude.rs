//! Claude proposal provider - Anthropic Messages API over HTTP

use crate::prompts;
use crate::provider::{Proposal, ProposalProvider, ProposalRequest, ProviderError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Configuration for the Claude provider
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.anthropic.com/v1".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            max_tokens: 1024,
            timeout_secs: 120,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Claude-backed proposal provider
pub struct ClaudeProvider {
    client: Client,
    config: ProviderConfig,
}

impl ClaudeProvider {
    pub fn new(config: ProviderConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }
}

impl ProposalProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    async fn propose(&self, request: ProposalRequest) -> Result<Proposal, ProviderError> {
        let api_request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: Some(prompts::system_prompt().to_string()),
            messages: vec![ApiMessage {
                role: "user",
                content: prompts::build_user_prompt(&request),
            }],
        };

        let response = self
            .client
            .post(format!("{}/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();

            if status == 429 {
                return Err(ProviderError::RateLimited { retry_after: None });
            } else if status == 401 {
                return Err(ProviderError::AuthenticationFailed);
            }

            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let text = api_response
            .content
            .iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::ToolUse { .. } => None,
            })
            .ok_or_else(|| ProviderError::Malformed("no text content in response".to_string()))?;

        parse_proposal(text)
    }
}

/// Parse a proposal from model output (handles markdown fences)
fn parse_proposal(content: &str) -> Result<Proposal, ProviderError> {
    let json_str = strip_code_fences(content);
    let proposal: Proposal = serde_json::from_str(json_str)
        .map_err(|e| ProviderError::Malformed(format!("invalid JSON response: {}", e)))?;
    proposal.validate()?;
    Ok(proposal)
}

/// Peel off ```json ... ``` wrappers the model sometimes emits
fn strip_code_fences(content: &str) -> &str {
    if content.contains("```json") {
        content
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(content)
    } else if content.contains("```") {
        content
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(content)
    } else {
        content.trim()
    }
}

// ============================================================================
// Anthropic API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "tool_use")]
    ToolUse {
        #[allow(dead_code)]
        id: String,
    },
}
