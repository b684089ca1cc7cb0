use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TarotError};
use crate::gateway::DEFAULT_MODEL;

const PLACEHOLDER_API_KEY: &str = "PLACEHOLDER_OPENAI_API_KEY";

/// Main configuration structure for the tarot backend.
///
/// Every section and field may be omitted from the YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub openai: OpenAIConfig,
    pub rate_limiter: RateLimiterConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub name: String,
    pub version: String,
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub body_limit_bytes: usize,
    pub request_timeout_seconds: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "SeerAI Tarot Backend".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            body_limit_bytes: 10 * 1024 * 1024,
            request_timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub project_id: String,
    pub model: String,
    /// Base URL for OpenAI-compatible endpoints; `None` uses api.openai.com
    pub api_base: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: PLACEHOLDER_API_KEY.to_string(),
            project_id: String::new(),
            model: DEFAULT_MODEL.to_string(),
            api_base: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    pub max_requests: u32,
    pub window_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_seconds: 15 * 60,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Used when RUST_LOG is not set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            filter: "seer_tarot=info".to_string(),
        }
    }
}

impl Config {
    /// Load `.env`, the YAML file and environment overrides.
    ///
    /// A missing config file means defaults; an unreadable or invalid one is
    /// an error. Call [`Config::validate`] before serving.
    pub fn load() -> Result<Self> {
        for path in [".env", "../.env"] {
            if dotenvy::from_path(path).is_ok() {
                break;
            }
        }
        Self::load_with(|key| env::var(key).ok())
    }

    /// Same as [`Config::load`] without `.env`, reading variables through `var`.
    pub fn load_with<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = var("TAROT_CONFIG_PATH").unwrap_or_else(|| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            Self::from_file(&config_path).map_err(|e| {
                TarotError::Config(format!("Failed to load config file {config_path}: {e}"))
            })?
        } else {
            Self::default()
        };

        config.apply_overrides(&var);
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    /// Apply overrides from any key/value source (the process environment in production).
    pub fn apply_overrides<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = var("HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("PORT") {
            match port.parse() {
                Ok(port_num) => self.server.port = port_num,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(origins) = var("ALLOWED_ORIGINS") {
            self.server.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(timeout) = var("TAROT_REQUEST_TIMEOUT_SECONDS") {
            if let Ok(secs) = timeout.parse() {
                self.server.request_timeout_seconds = secs;
            }
        }

        // OpenAI overrides
        if let Some(api_key) = var("OPENAI_API_KEY") {
            self.openai.api_key = api_key;
        }
        if let Some(project_id) = var("PROJECT_ID") {
            self.openai.project_id = project_id;
        }
        if let Some(model) = var("OPENAI_MODEL") {
            self.openai.model = model;
        }
        if let Some(api_base) = var("OPENAI_API_BASE") {
            self.openai.api_base = Some(api_base);
        }

        // Rate limiter overrides
        if let Some(max_requests) = var("TAROT_RATE_LIMIT_MAX_REQUESTS") {
            if let Ok(max) = max_requests.parse() {
                self.rate_limiter.max_requests = max;
            }
        }
        if let Some(window) = var("TAROT_RATE_LIMIT_WINDOW_SECONDS") {
            if let Ok(window_secs) = window.parse() {
                self.rate_limiter.window_seconds = window_secs;
            }
        }

        // Logging overrides
        if let Some(format) = var("LOG_FORMAT") {
            match format.to_lowercase().as_str() {
                "json" => self.logging.format = LogFormat::Json,
                "pretty" => self.logging.format = LogFormat::Pretty,
                other => tracing::warn!("Unknown LOG_FORMAT: {}. Keeping {:?}", other, self.logging.format),
            }
        }
    }

    /// Check that the service can start. Missing provider credentials are fatal.
    pub fn validate(&self) -> Result<()> {
        if self.openai.api_key.trim().is_empty() || self.openai.api_key == PLACEHOLDER_API_KEY {
            return Err(TarotError::Config(
                "OPENAI_API_KEY environment variable is required".to_string(),
            ));
        }
        if self.openai.project_id.trim().is_empty() {
            return Err(TarotError::Config(
                "PROJECT_ID environment variable is required".to_string(),
            ));
        }
        if self.openai.model.trim().is_empty() {
            return Err(TarotError::Config("OpenAI model cannot be empty".to_string()));
        }

        if self.rate_limiter.max_requests == 0 {
            return Err(TarotError::Config(
                "Rate limiter max_requests cannot be 0".to_string(),
            ));
        }
        if self.rate_limiter.window_seconds == 0 {
            return Err(TarotError::Config(
                "Rate limiter window_seconds cannot be 0".to_string(),
            ));
        }
        if self.server.request_timeout_seconds == 0 {
            return Err(TarotError::Config(
                "Request timeout cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limiter.window_seconds)
    }
}
