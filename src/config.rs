//! Configuration management for the telemetry core

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Selectable network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" | "chronos" => Ok(Network::Testnet),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

/// Upstream endpoints for one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub network: Network,
    pub display_name: String,
    /// Block explorer REST API
    pub explorer_api: String,
    /// Storage listing API, absent where storage is not offered
    pub storage_api: Option<String>,
    pub gateway_url: String,
    pub rpc_url: String,
    pub alt_rpc_url: String,
    /// Consensus-layer indexer
    pub consensus_api: String,
}

impl NetworkProfile {
    pub fn mainnet() -> Self {
        Self {
            network: Network::Mainnet,
            display_name: "Mainnet".to_string(),
            explorer_api: "https://explorer.auto-evm.mainnet.autonomys.xyz/api/v2".to_string(),
            storage_api: Some("https://mainnet.auto-drive.autonomys.xyz/api".to_string()),
            gateway_url: "https://gateway.autonomys.xyz".to_string(),
            rpc_url: "https://auto-evm.mainnet.autonomys.xyz/ws".to_string(),
            alt_rpc_url: "https://rpc.auto-evm.mainnet.autonomys.xyz".to_string(),
            consensus_api: "https://autonomys.api.subscan.io".to_string(),
        }
    }

    pub fn testnet() -> Self {
        Self {
            network: Network::Testnet,
            display_name: "Testnet (Chronos)".to_string(),
            explorer_api: "https://explorer.auto-evm.chronos.autonomys.xyz/api/v2".to_string(),
            storage_api: None,
            gateway_url: "https://gateway.autonomys.xyz".to_string(),
            rpc_url: "https://auto-evm.chronos.autonomys.xyz/ws".to_string(),
            alt_rpc_url: "https://rpc.auto-evm.chronos.autonomys.xyz".to_string(),
            consensus_api: "https://autonomys-chronos.api.subscan.io".to_string(),
        }
    }

    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Mainnet => Self::mainnet(),
            Network::Testnet => Self::testnet(),
        }
    }

    pub fn has_storage(&self) -> bool {
        self.storage_api.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Endpoints of the selected network
    pub profile: NetworkProfile,

    /// API key for the storage listing, storage stats are skipped without it
    pub storage_api_key: Option<String>,

    /// Interval between automatic refreshes
    pub refresh_interval: Duration,

    /// HTTP timeout for every upstream request
    pub http_timeout: Duration,

    /// Size of the network-wide listing page used for the upload series
    pub broad_sample_limit: usize,

    /// Size of the caller-scoped listing page
    pub scoped_sample_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: NetworkProfile::mainnet(),
            storage_api_key: None,
            refresh_interval: Duration::from_secs(30),
            http_timeout: Duration::from_secs(10),
            broad_sample_limit: 5000,
            scoped_sample_limit: 500,
        }
    }
}

impl Config {
    /// Config for `network` with its default endpoints
    pub fn for_network(network: Network) -> Self {
        Self {
            profile: NetworkProfile::for_network(network),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let network = env::var("NETWORK")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(Network::Mainnet);

        let mut config = Config::for_network(network);
        config.apply_env();
        config
    }

    /// Overlay environment overrides on top of the current values
    pub fn apply_env(&mut self) {
        if let Ok(key) = env::var("STORAGE_API_KEY") {
            let key = key.trim().to_string();
            self.storage_api_key = (!key.is_empty()).then_some(key);
        }

        if let Ok(interval) = env::var("REFRESH_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                self.refresh_interval = Duration::from_secs(seconds);
            }
        }

        if let Ok(timeout) = env::var("HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                self.http_timeout = Duration::from_secs(seconds);
            }
        }

        if let Ok(limit) = env::var("BROAD_SAMPLE_LIMIT") {
            if let Ok(limit) = limit.parse() {
                self.broad_sample_limit = limit;
            }
        }

        if let Ok(limit) = env::var("SCOPED_SAMPLE_LIMIT") {
            if let Ok(limit) = limit.parse() {
                self.scoped_sample_limit = limit;
            }
        }

        if let Ok(url) = env::var("EXPLORER_API_URL") {
            self.profile.explorer_api = url;
        }

        if let Ok(url) = env::var("STORAGE_API_URL") {
            self.profile.storage_api = (!url.is_empty()).then_some(url);
        }

        if let Ok(url) = env::var("GATEWAY_URL") {
            self.profile.gateway_url = url;
        }

        if let Ok(url) = env::var("RPC_URL") {
            self.profile.rpc_url = url;
        }

        if let Ok(url) = env::var("ALT_RPC_URL") {
            self.profile.alt_rpc_url = url;
        }

        if let Ok(url) = env::var("CONSENSUS_API_URL") {
            self.profile.consensus_api = url;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        let endpoints = [
            ("explorer_api", &self.profile.explorer_api),
            ("gateway_url", &self.profile.gateway_url),
            ("rpc_url", &self.profile.rpc_url),
            ("consensus_api", &self.profile.consensus_api),
        ];

        for (name, url) in endpoints {
            if url.is_empty() {
                return Err(format!("{} cannot be empty", name));
            }
        }

        if self.refresh_interval.is_zero() {
            return Err("refresh_interval must be greater than 0".to_string());
        }

        if self.http_timeout.is_zero() {
            return Err("http_timeout must be greater than 0".to_string());
        }

        if self.broad_sample_limit == 0 || self.scoped_sample_limit == 0 {
            return Err("sample limits must be greater than 0".to_string());
        }

        Ok(())
    }
}
