//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. Per-agent model parameters are built once at
//! startup and injected into the coordinator — never mutated afterwards.

use serde::Serialize;
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// Server configuration
    pub server: ServerConfig,
    /// Gemini API key (empty when unset; API calls will fail loudly)
    pub gemini_api_key: String,
    /// Fast model used by Discovery, Community, and Budget
    pub flash_model: String,
    /// Deeper model used by Cultural-Context and Plot-Builder
    pub pro_model: String,
    /// Per-agent call timeout in seconds
    pub agent_timeout_secs: u64,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

impl Settings {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                port: env::var("BACKEND_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8000),
                host: env::var("BACKEND_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            gemini_api_key: env::var("GEMINI_API_KEY").unwrap_or_default(),
            flash_model: env::var("SIDEQUEST_FLASH_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            // Pro tier may not be provisioned everywhere; fall back to flash
            pro_model: env::var("SIDEQUEST_PRO_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            agent_timeout_secs: env::var("AGENT_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Per-agent call timeout
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    /// Build the immutable per-agent model configuration set
    pub fn agent_models(&self) -> AgentModelConfigs {
        AgentModelConfigs {
            discovery: ModelConfig {
                model: self.flash_model.clone(),
                temperature: 0.3,
                max_output_tokens: 4096,
            },
            cultural_context: ModelConfig {
                model: self.pro_model.clone(),
                temperature: 0.4,
                max_output_tokens: 2048,
            },
            community: ModelConfig {
                model: self.flash_model.clone(),
                temperature: 0.2,
                max_output_tokens: 2048,
            },
            plot_builder: ModelConfig {
                model: self.pro_model.clone(),
                temperature: 0.7,
                max_output_tokens: 8192,
            },
            budget: ModelConfig {
                model: self.flash_model.clone(),
                temperature: 0.1,
                max_output_tokens: 2048,
            },
        }
    }
}

/// Generation parameters for a single agent's model calls
#[derive(Debug, Clone, Serialize)]
pub struct ModelConfig {
    /// Model name (e.g. "gemini-2.0-flash")
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Output size ceiling
    pub max_output_tokens: u32,
}

/// The full set of per-agent model configurations
///
/// Built once from `Settings` and injected into the coordinator at
/// construction time.
#[derive(Debug, Clone)]
pub struct AgentModelConfigs {
    /// Discovery agent parameters (flash tier, wide output for experience lists)
    pub discovery: ModelConfig,
    /// Cultural-context agent parameters (pro tier)
    pub cultural_context: ModelConfig,
    /// Community agent parameters (flash tier)
    pub community: ModelConfig,
    /// Plot-builder agent parameters (pro tier, creative temperature)
    pub plot_builder: ModelConfig,
    /// Budget agent parameters (flash tier, near-deterministic)
    pub budget: ModelConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_models_use_configured_tiers() {
        let settings = Settings {
            server: ServerConfig {
                port: 8000,
                host: "0.0.0.0".to_string(),
            },
            gemini_api_key: String::new(),
            flash_model: "flash-x".to_string(),
            pro_model: "pro-y".to_string(),
            agent_timeout_secs: 30,
        };
        let models = settings.agent_models();
        assert_eq!(models.discovery.model, "flash-x");
        assert_eq!(models.budget.model, "flash-x");
        assert_eq!(models.community.model, "flash-x");
        assert_eq!(models.cultural_context.model, "pro-y");
        assert_eq!(models.plot_builder.model, "pro-y");
    }

    #[test]
    fn test_plot_builder_is_most_creative() {
        let settings = Settings::from_env();
        let models = settings.agent_models();
        assert!(models.plot_builder.temperature > models.budget.temperature);
        assert!(models.plot_builder.max_output_tokens >= models.discovery.max_output_tokens);
    }
}
