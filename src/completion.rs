use anyhow::Result;
use async_trait::async_trait;

use crate::llm_config::ProviderConfig;
use crate::session::ChatTurn;
use crate::traits::CompletionService;

/// Chat completion client over the configured LLM provider.
///
/// Sends a system instruction plus the full role-tagged turn history and
/// returns the assistant text. Network, quota, and timeout failures surface
/// as errors; the chat agent degrades them to a plain-text reply.
pub struct CompletionClient {
    config: ProviderConfig,
    http_client: reqwest::Client,
    name: String,
}

impl CompletionClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;

        let name = format!("{}/{}", config.provider, config.model);
        tracing::info!("Completion service configured: {}", name);

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Ok(Self {
            config,
            http_client,
            name,
        })
    }

    fn turn_messages(turns: &[ChatTurn]) -> Vec<serde_json::Value> {
        turns
            .iter()
            .map(|turn| {
                serde_json::json!({
                    "role": turn.role.as_str(),
                    "content": turn.content,
                })
            })
            .collect()
    }

    async fn call_openai(&self, system_instruction: &str, turns: &[ChatTurn]) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("OpenAI API key not configured"))?;

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": system_instruction,
        })];
        messages.extend(Self::turn_messages(turns));

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
        });

        let response = self
            .http_client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_json: serde_json::Value = response.json().await?;

        if !status.is_success() {
            anyhow::bail!("OpenAI API error: {}", response_json);
        }

        if let Some(text) = response_json
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
        {
            Ok(text.to_string())
        } else {
            anyhow::bail!("No response from OpenAI")
        }
    }

    async fn call_anthropic(&self, system_instruction: &str, turns: &[ChatTurn]) -> Result<String> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Anthropic API key not configured"))?;

        let request_body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": 1024,
            "system": system_instruction,
            "messages": Self::turn_messages(turns),
        });

        let response = self
            .http_client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .header("Content-Type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_json: serde_json::Value = response.json().await?;

        if !status.is_success() {
            anyhow::bail!("Anthropic API error: {}", response_json);
        }

        if let Some(text) = response_json
            .get("content")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("text"))
            .and_then(|v| v.as_str())
        {
            Ok(text.to_string())
        } else {
            anyhow::bail!("No response from Anthropic")
        }
    }

    async fn call_ollama(&self, system_instruction: &str, turns: &[ChatTurn]) -> Result<String> {
        let endpoint = self
            .config
            .endpoint
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Ollama endpoint not configured"))?;

        let mut messages = vec![serde_json::json!({
            "role": "system",
            "content": system_instruction,
        })];
        messages.extend(Self::turn_messages(turns));

        let request_body = serde_json::json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false,
        });

        let response = self
            .http_client
            .post(format!("{}/api/chat", endpoint))
            .json(&request_body)
            .send()
            .await?;

        let response_json: serde_json::Value = response.json().await?;

        if let Some(text) = response_json
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
        {
            Ok(text.to_string())
        } else {
            anyhow::bail!("No response from Ollama")
        }
    }
}

#[async_trait]
impl CompletionService for CompletionClient {
    async fn complete(&self, system_instruction: &str, turns: &[ChatTurn]) -> Result<String> {
        match self.config.provider.as_str() {
            "openai" => self.call_openai(system_instruction, turns).await,
            "anthropic" => self.call_anthropic(system_instruction, turns).await,
            "ollama" => self.call_ollama(system_instruction, turns).await,
            other => anyhow::bail!("Unsupported provider: {}", other),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Canned responder for tests: returns a fixed reply, or fails every call.
pub struct StaticCompletion {
    reply: Option<String>,
}

impl StaticCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Some(reply.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { reply: None }
    }
}

#[async_trait]
impl CompletionService for StaticCompletion {
    async fn complete(&self, _system_instruction: &str, _turns: &[ChatTurn]) -> Result<String> {
        match &self.reply {
            Some(reply) => Ok(reply.clone()),
            None => anyhow::bail!("completion service unavailable"),
        }
    }

    fn name(&self) -> &str {
        "static"
    }
}
