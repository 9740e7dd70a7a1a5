/*
[INPUT]:  YAML configuration file
[OUTPUT]: Parsed CLI configuration with defaults
[POS]:    Configuration layer - API endpoint, session file, wallet key source
[UPDATE]: When adding new configuration options
*/

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use contrib_auth::{AuthConfig, ClientConfig};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the sign-in CLI
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CliConfig {
    /// Rewards platform API base URL
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Where the session is persisted; defaults to the user data directory
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Environment variable holding the hex EVM private key used by `login`
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            session_file: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            private_key_env: default_private_key_env(),
            auth: AuthConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content).context("parse config yaml")?;
        Ok(config)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }

    pub fn session_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.session_file {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Could not determine data directory"))?
            .join("contrib-auth");
        Ok(data_dir.join("session.json"))
    }
}

fn default_api_base_url() -> String {
    "https://api.contrib.rewards".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_private_key_env() -> String {
    "CONTRIB_PRIVATE_KEY".to_string()
}
