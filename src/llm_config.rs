use serde::{Deserialize, Serialize};

/// Configuration for the chat completion provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider: String, // "openai", "ollama", "anthropic"
    pub model: String,
    pub api_key: Option<String>,
    pub endpoint: Option<String>, // For Ollama or custom endpoints
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            endpoint: None,
            timeout_secs: 60,
        }
    }
}

impl ProviderConfig {
    /// Load from environment variables
    pub fn from_env() -> Self {
        let provider = std::env::var("LLM_PROVIDER").unwrap_or_else(|_| "openai".to_string());

        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| {
            // Provide sensible defaults based on provider
            match provider.as_str() {
                "openai" => "gpt-4o".to_string(),
                "anthropic" => "claude-3-5-sonnet-20241022".to_string(),
                "ollama" => "llama3".to_string(),
                _ => "gpt-4o".to_string(),
            }
        });

        let api_key = std::env::var("LLM_API_KEY")
            .or_else(|_| std::env::var("OPENAI_API_KEY"))
            .ok();

        let endpoint = std::env::var("OLLAMA_ENDPOINT").ok();

        let timeout_secs = std::env::var("LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self {
            provider,
            model,
            api_key,
            endpoint,
            timeout_secs,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        match self.provider.as_str() {
            "openai" | "anthropic" => {
                if self.api_key.is_none() {
                    anyhow::bail!("{} provider requires an API key", self.provider);
                }
            }
            "ollama" => {
                if self.endpoint.is_none() {
                    anyhow::bail!("ollama provider requires OLLAMA_ENDPOINT");
                }
            }
            other => anyhow::bail!("Unsupported provider: {}", other),
        }

        if self.model.is_empty() {
            anyhow::bail!("Model name must not be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProviderConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_openai_requires_api_key() {
        let config = ProviderConfig {
            api_key: None,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ProviderConfig {
            api_key: Some("key".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_ollama_requires_endpoint() {
        let config = ProviderConfig {
            provider: "ollama".to_string(),
            model: "llama3".to_string(),
            api_key: None,
            endpoint: None,
            timeout_secs: 60,
        };
        assert!(config.validate().is_err());

        let config = ProviderConfig {
            endpoint: Some("http://localhost:11434".to_string()),
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let config = ProviderConfig {
            provider: "cohere".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
