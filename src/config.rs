//! Configuration management for QuorumChain

use crate::error::{GovernanceError, Result};
use serde::Deserialize;
use std::fs;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub governance: GovernanceConfig,
}

#[derive(Debug, Deserialize)]
pub struct NetworkConfig {
    pub p2p_port: u16,
    #[serde(default = "default_network_id")]
    pub network_id: String,
    #[serde(default)]
    pub bootstrap_peers: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub struct GovernanceConfig {
    /// Hex identity of the local admin, if this node signs chain data.
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default = "default_status_interval")]
    pub status_interval_secs: u64,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            admin_id: None,
            status_interval_secs: default_status_interval(),
        }
    }
}

pub fn load_config() -> Result<Config> {
    let config_str = fs::read_to_string("config.toml").unwrap_or_default();
    let config: Config = if config_str.is_empty() {
        // Provide sane defaults when config.toml is absent
        Config {
            network: NetworkConfig {
                p2p_port: 8461,
                network_id: default_network_id(),
                bootstrap_peers: Vec::new(),
            },
            database: DatabaseConfig {
                path: default_db_path(),
            },
            governance: GovernanceConfig::default(),
        }
    } else {
        toml::from_str(&config_str).map_err(|e| GovernanceError::Config(e.to_string()))?
    };

    // Validate critical values
    if config.database.path.is_empty() {
        return Err(GovernanceError::Config(
            "database.path must be set in config.toml".to_string(),
        ));
    }

    if let Some(admin_id) = &config.governance.admin_id {
        let digits = admin_id.strip_prefix("0x").unwrap_or(admin_id);
        if digits.is_empty() || u32::from_str_radix(digits, 16).is_err() {
            return Err(GovernanceError::Config(format!(
                "governance.admin_id '{}' is not a valid hex identity",
                admin_id
            )));
        }
    }

    Ok(config)
}

fn default_network_id() -> String {
    "devnet".to_string()
}

fn default_db_path() -> String {
    "./data/governance.db".to_string()
}

fn default_status_interval() -> u64 {
    30
}
