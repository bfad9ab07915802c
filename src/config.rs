use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::topology::selection::clamp_panel_width;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    pub api: ApiConfig,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_panel_width")]
    pub panel_width: u32,
    #[serde(default)]
    pub icons: IconsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IconsConfig {
    #[serde(default)]
    pub control_plane: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub worker_node: Option<String>,
}

fn default_listen_port() -> u16 {
    9090
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_panel_width() -> u32 {
    400
}

fn default_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&data)
    }

    pub fn from_yaml(data: &str) -> Result<Self, ConfigError> {
        let mut cfg: Config = serde_yaml::from_str(data)?;

        cfg.api.base_url = cfg.api.base_url.trim().trim_end_matches('/').to_string();
        if cfg.api.base_url.is_empty() {
            return Err(ConfigError::MissingBaseUrl);
        }

        cfg.panel_width = clamp_panel_width(cfg.panel_width);

        Ok(cfg)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.listen_port)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}
