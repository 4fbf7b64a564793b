// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management for the trainer

pub mod environment;
pub mod fitness_config;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::service;

pub use environment::ServiceConfig;
pub use fitness_config::FitnessConfig;

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub fitness: FitnessConfig,
}

impl Config {
    /// `<config dir>/personal-ai-trainer/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join(service::CONFIG_DIR_NAME).join(service::CONFIG_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(service::CONFIG_FILE_NAME))
    }

    /// Load from the TOML file when present, otherwise from the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config file {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file {}", config_path.display()))?;
            config.service.validate()?;
            config.fitness.validate()?;
            Ok(config)
        } else {
            Ok(Config {
                service: ServiceConfig::from_env()?,
                fitness: FitnessConfig::load(None)?,
            })
        }
    }

    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);

        let parent = config_path.parent().context("Invalid config path")?;
        fs::create_dir_all(parent)?;

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(&config_path, content)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_save_and_reload() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.service.database_url = Some("sqlite::memory:".to_string());
        config.service.data_dir = temp_dir.path().join("data");
        config.fitness.knowledge_base.top_k = 3;
        config.save(Some(&path))?;

        let loaded = Config::load(Some(&path))?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn test_partial_file_uses_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[service.timeouts]
request_timeout_secs = 10

[fitness.trends]
window = 14
"#,
        )?;

        let config = Config::load(Some(&path))?;
        assert_eq!(config.service.timeouts.request_timeout_secs, 10);
        assert_eq!(config.service.timeouts.storage_timeout_secs, 5);
        assert_eq!(config.fitness.trends.window, 14);
        assert_eq!(config.fitness.knowledge_base.top_k, 5);
        Ok(())
    }

    #[test]
    fn test_invalid_file_is_an_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[fitness.trends]\nwindow = \"seven\"\n")?;

        assert!(Config::load(Some(&path)).is_err());
        Ok(())
    }
}
