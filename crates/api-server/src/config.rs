use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use narrative_client::{NarrativeConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use thiserror::Error;

const DEFAULT_DATABASE_URL: &str = "sqlite:calibration.db";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8000";
const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Server configuration, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// `None` disables every AI-backed endpoint
    pub narrative: Option<NarrativeConfig>,
    pub narrative_timeout: Duration,
    pub cors_allowed_origins: Vec<String>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());
        if !database_url.starts_with("sqlite:") {
            return Err(ConfigError::Invalid {
                name: "DATABASE_URL",
                reason: "only sqlite: URLs are supported".to_string(),
            });
        }

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let timeout_secs = match var("NARRATIVE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                name: "NARRATIVE_TIMEOUT_SECS",
                reason: e.to_string(),
            })?,
            None => DEFAULT_NARRATIVE_TIMEOUT_SECS,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "NARRATIVE_TIMEOUT_SECS",
                reason: "must be at least 1".to_string(),
            });
        }
        let narrative_timeout = Duration::from_secs(timeout_secs);

        let narrative = var("GEMINI_API_KEY").map(|key| {
            let mut config = NarrativeConfig::new(key.trim()).with_timeout(narrative_timeout);
            config.model = var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
            config.base_url = var("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string();
            config
        });

        let cors_allowed_origins = var("CORS_ALLOWED_ORIGINS")
            .map(|raw| {
                raw.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            bind_addr,
            narrative,
            narrative_timeout,
            cors_allowed_origins,
        })
    }
}
