//! OpenAI-compatible chat-completions provider (Kimi, `OpenRouter`, `OpenAI`)

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::prompt::{SYSTEM_PROMPT, parse_response, user_prompt};
use super::{EnhancementRequest, EnhancementResponse, ReasoningProvider};
use crate::ProviderError;
use crate::config::ProviderConfig;

/// Maximum bytes of an error body kept in [`ProviderError::Status`]
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Provider speaking `POST {base_url}/chat/completions`
pub struct HttpReasoningProvider {
    name: String,
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env_var: String,
    timeout: Duration,
}

impl HttpReasoningProvider {
    /// Create a provider from its configuration. The key is read from the
    /// environment now; a missing key surfaces as an auth failure on use.
    pub fn from_config(config: &ProviderConfig, timeout: Duration) -> Result<Self, ProviderError> {
        let mut provider = Self::new(
            config.name.clone(),
            config.base_url(),
            config.model(),
            config.resolve_api_key(),
            timeout,
        )?;
        provider.api_key_env_var.clone_from(&config.api_key_env_var);
        Ok(provider)
    }

    /// Create a provider with explicit settings
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(format!("mcp-adapter/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        Ok(Self {
            name: name.into(),
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            api_key_env_var: "API key".to_string(),
            timeout,
        })
    }
}

#[async_trait]
impl ReasoningProvider for HttpReasoningProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn enhance(&self, request: &EnhancementRequest) -> Result<EnhancementResponse, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Auth(format!("{} is not set", self.api_key_env_var)))?;

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_prompt(request)?,
                },
            ],
            temperature: 0.2,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(provider = %self.name, url = %url, model = %self.model, batch = request.capabilities.len(), "Sending enhancement request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout)
                } else {
                    ProviderError::from(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(format!("provider rejected credentials (HTTP {status})")));
        }
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("response has no choices".to_string()))?;

        parse_response(&content)
    }
}
