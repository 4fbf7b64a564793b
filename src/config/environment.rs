// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Service endpoints, credentials, timeouts and storage locations

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::constants::{endpoints, limits, models, service};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SQLite URL for the primary store; local JSON only when unset
    pub database_url: Option<String>,
    /// Directory holding the local JSON fallback collections
    pub data_dir: PathBuf,
    pub oura: OuraConfig,
    pub openai: OpenAiConfig,
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    /// Days of biometric data fetched per run
    pub biometric_lookback_days: i64,
    /// Days of readiness history used for trend analysis
    pub history_days: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OuraConfig {
    pub api_token: Option<String>,
    pub api_base: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub chat_model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub request_timeout_secs: u64,
    pub storage_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            data_dir: default_data_dir(),
            oura: OuraConfig::default(),
            openai: OpenAiConfig::default(),
            timeouts: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            biometric_lookback_days: limits::DEFAULT_BIOMETRIC_LOOKBACK_DAYS,
            history_days: limits::DEFAULT_HISTORY_DAYS,
        }
    }
}

impl Default for OuraConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_base: endpoints::OURA_API_BASE.to_string(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: endpoints::OPENAI_API_BASE.to_string(),
            embedding_model: models::DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_dimension: models::DEFAULT_EMBEDDING_DIMENSION,
            chat_model: models::DEFAULT_CHAT_MODEL.to_string(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: limits::DEFAULT_REQUEST_TIMEOUT_SECS,
            storage_timeout_secs: limits::DEFAULT_STORAGE_TIMEOUT_SECS,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: limits::DEFAULT_MAX_RETRIES,
            base_delay_ms: limits::DEFAULT_RETRY_BASE_DELAY_MS,
        }
    }
}

/// `<config dir>/personal-ai-trainer/data`, or `./data` without a config dir
pub fn default_data_dir() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join(service::CONFIG_DIR_NAME).join("data"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

impl ServiceConfig {
    /// Load configuration from environment variables (and `.env`)
    pub fn from_env() -> Result<Self> {
        if let Err(e) = dotenv::dotenv() {
            tracing::debug!("No .env file loaded: {}", e);
        }

        let defaults = Self::default();
        let config = ServiceConfig {
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            data_dir: env::var("TRAINER_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            oura: OuraConfig {
                api_token: env::var("OURA_API_TOKEN").ok(),
                api_base: env_var_or("OURA_API_BASE", endpoints::OURA_API_BASE),
            },
            openai: OpenAiConfig {
                api_key: env::var("OPENAI_API_KEY").ok(),
                api_base: env_var_or("OPENAI_API_BASE", endpoints::OPENAI_API_BASE),
                embedding_model: env_var_or(
                    "OPENAI_EMBEDDING_MODEL",
                    models::DEFAULT_EMBEDDING_MODEL,
                ),
                embedding_dimension: env_var_or(
                    "OPENAI_EMBEDDING_DIMENSION",
                    &models::DEFAULT_EMBEDDING_DIMENSION.to_string(),
                )
                .parse()
                .context("Invalid OPENAI_EMBEDDING_DIMENSION value")?,
                chat_model: env_var_or("OPENAI_CHAT_MODEL", models::DEFAULT_CHAT_MODEL),
            },
            timeouts: TimeoutConfig {
                request_timeout_secs: env_var_or(
                    "REQUEST_TIMEOUT_SECS",
                    &limits::DEFAULT_REQUEST_TIMEOUT_SECS.to_string(),
                )
                .parse()
                .context("Invalid REQUEST_TIMEOUT_SECS value")?,
                storage_timeout_secs: env_var_or(
                    "STORAGE_TIMEOUT_SECS",
                    &limits::DEFAULT_STORAGE_TIMEOUT_SECS.to_string(),
                )
                .parse()
                .context("Invalid STORAGE_TIMEOUT_SECS value")?,
            },
            retry: RetryConfig {
                max_retries: env_var_or("MAX_RETRIES", &limits::DEFAULT_MAX_RETRIES.to_string())
                    .parse()
                    .context("Invalid MAX_RETRIES value")?,
                base_delay_ms: env_var_or(
                    "RETRY_BASE_DELAY_MS",
                    &limits::DEFAULT_RETRY_BASE_DELAY_MS.to_string(),
                )
                .parse()
                .context("Invalid RETRY_BASE_DELAY_MS value")?,
            },
            biometric_lookback_days: defaults.biometric_lookback_days,
            history_days: defaults.history_days,
        };

        config.validate()?;
        info!("Service configuration loaded from environment");
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("sqlite:") {
                bail!("DATABASE_URL must be a sqlite: URL, got {url}");
            }
        }

        Url::parse(&self.oura.api_base).context("Invalid Oura API base URL")?;
        Url::parse(&self.openai.api_base).context("Invalid OpenAI API base URL")?;

        if self.timeouts.request_timeout_secs == 0 || self.timeouts.storage_timeout_secs == 0 {
            bail!("timeouts must be at least one second");
        }
        if self.openai.embedding_dimension == 0 {
            bail!("embedding dimension must be positive");
        }
        if self.biometric_lookback_days < 1 || self.history_days < 1 {
            bail!("lookback windows must be at least one day");
        }

        if self.oura.api_token.is_none() {
            warn!("OURA_API_TOKEN is not set; biometric fetches will fail");
        }
        if self.openai.api_key.is_none() {
            warn!("OPENAI_API_KEY is not set; embeddings and enrichment are unavailable");
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request_timeout_secs)
    }

    pub fn storage_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.storage_timeout_secs)
    }

    /// Summary for logging (without secrets)
    pub fn summary(&self) -> String {
        format!(
            "Personal AI Trainer configuration:\n\
             - Primary store: {}\n\
             - Local data dir: {}\n\
             - Oura: {}\n\
             - OpenAI: {} ({})\n\
             - Timeouts: request {}s, storage {}s",
            self.database_url.as_deref().unwrap_or("none (local only)"),
            self.data_dir.display(),
            if self.oura.api_token.is_some() { "configured" } else { "missing token" },
            if self.openai.api_key.is_some() { "configured" } else { "missing key" },
            self.openai.embedding_model,
            self.timeouts.request_timeout_secs,
            self.timeouts.storage_timeout_secs,
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.storage_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_non_sqlite_database_rejected() {
        let config = ServiceConfig {
            database_url: Some("postgres://localhost/trainer".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = ServiceConfig::default();
        config.timeouts.storage_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_summary_hides_secrets() {
        let mut config = ServiceConfig::default();
        config.oura.api_token = Some("secret-token".to_string());
        let summary = config.summary();
        assert!(summary.contains("configured"));
        assert!(!summary.contains("secret-token"));
    }
}
