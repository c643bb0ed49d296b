use std::env;

use crate::llm_config::ProviderConfig;

pub const DEFAULT_PORT: u16 = 8001;
pub const DEFAULT_MAX_SESSIONS: usize = 256;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:8080";

#[derive(Debug, Clone)]
pub struct Config {
    // Service configuration
    pub port: u16,
    pub allowed_origin: String,
    pub max_sessions: usize,

    // LLM configuration
    pub llm: ProviderConfig,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let port = match env::var("SERVICE_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| format!("SERVICE_PORT is not a valid port: {}", raw))?,
            Err(_) => DEFAULT_PORT,
        };

        let max_sessions = match env::var("MAX_SESSIONS") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| format!("MAX_SESSIONS is not a valid count: {}", raw))?,
            Err(_) => DEFAULT_MAX_SESSIONS,
        };

        Ok(Config {
            port,
            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| DEFAULT_ALLOWED_ORIGIN.to_string()),
            max_sessions,
            llm: ProviderConfig::from_env(),
        })
    }

    pub fn log_config(&self) {
        tracing::info!("Configuration:");
        tracing::info!("   Port: {}", self.port);
        tracing::info!("   Allowed origin: {}", self.allowed_origin);
        tracing::info!("   Max sessions: {}", self.max_sessions);
        tracing::info!("   LLM Provider: {}", self.llm.provider);
        tracing::info!("   LLM Model: {}", self.llm.model);
        if let Some(ref api_key) = self.llm.api_key {
            tracing::info!(
                "   LLM API Key: {}***",
                &api_key.chars().take(4).collect::<String>()
            );
        }
        if let Some(ref endpoint) = self.llm.endpoint {
            tracing::info!("   Ollama Endpoint: {}", endpoint);
        }
    }
}
