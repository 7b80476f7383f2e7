use crate::constants::{DEFAULT_SWAP_GAS_COST, DEFAULT_VENUE_KEY, MULTICALL3};
use crate::utils::config_loader::{ConfigLoader, ConfigLoaderSync, LoadConfigError, load_from_file, load_from_file_sync};
use alloy_primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Configuration of the synchronization layer and the registry on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// HTTP RPC URL used for every read
    pub rpc_http_url: String,
    /// Multicall3 contract address
    pub multicall_address: String,
    /// Factory resolving token pairs to venues
    pub factory_address: String,
    /// Prefix of venue identifiers
    pub venue_key: String,
    /// Maximum number of calls in a single aggregate round trip
    pub max_calls_per_batch: usize,
    /// Timeout for HTTP requests in seconds
    pub http_timeout_secs: u64,
    /// Snapshots kept per venue
    pub max_snapshots_per_venue: usize,
    /// Lifetime of liquidity rankings in seconds
    pub liquidity_cache_ttl_secs: u64,
    /// Gas reported per swap in price quotes
    pub swap_gas_cost: u64,
}

#[derive(Clone, Deserialize, Debug)]
pub struct SyncConfigRoot {
    pub sync: SyncConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rpc_http_url: "http://127.0.0.1:8545".to_string(),
            multicall_address: MULTICALL3.to_string(),
            factory_address: Address::ZERO.to_string(),
            venue_key: DEFAULT_VENUE_KEY.to_string(),
            max_calls_per_batch: 500,
            http_timeout_secs: 10,
            max_snapshots_per_venue: 64,
            liquidity_cache_ttl_secs: 600,
            swap_gas_cost: DEFAULT_SWAP_GAS_COST,
        }
    }
}

fn parse_address(name: &str, value: &str) -> eyre::Result<Address> {
    Address::from_str(value).map_err(|e| eyre::eyre!("Invalid {}: {}", name, e))
}

impl SyncConfig {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> eyre::Result<Self> {
        let mut config = Self::default();

        if let Ok(rpc_http_url) = std::env::var("RPC_HTTP_URL") {
            config.rpc_http_url = rpc_http_url;
        }

        if let Ok(multicall_address) = std::env::var("MULTICALL_ADDRESS") {
            config.multicall_address = multicall_address;
        }

        if let Ok(factory_address) = std::env::var("FACTORY_ADDRESS") {
            config.factory_address = factory_address;
        }

        if let Ok(venue_key) = std::env::var("VENUE_KEY") {
            config.venue_key = venue_key;
        }

        if let Ok(max_calls_str) = std::env::var("MAX_CALLS_PER_BATCH") {
            config.max_calls_per_batch =
                max_calls_str.parse().map_err(|e| eyre::eyre!("Invalid MAX_CALLS_PER_BATCH: {}", e))?;
        }

        if let Ok(timeout_str) = std::env::var("HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = timeout_str.parse().map_err(|e| eyre::eyre!("Invalid HTTP_TIMEOUT_SECS: {}", e))?;
        }

        if let Ok(max_snapshots_str) = std::env::var("MAX_SNAPSHOTS_PER_VENUE") {
            config.max_snapshots_per_venue =
                max_snapshots_str.parse().map_err(|e| eyre::eyre!("Invalid MAX_SNAPSHOTS_PER_VENUE: {}", e))?;
        }

        if let Ok(ttl_str) = std::env::var("LIQUIDITY_CACHE_TTL_SECS") {
            config.liquidity_cache_ttl_secs = ttl_str.parse().map_err(|e| eyre::eyre!("Invalid LIQUIDITY_CACHE_TTL_SECS: {}", e))?;
        }

        if let Ok(gas_str) = std::env::var("SWAP_GAS_COST") {
            config.swap_gas_cost = gas_str.parse().map_err(|e| eyre::eyre!("Invalid SWAP_GAS_COST: {}", e))?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks URL, addresses and limits.
    pub fn validate(&self) -> eyre::Result<()> {
        Url::parse(&self.rpc_http_url).map_err(|e| eyre::eyre!("Invalid RPC_HTTP_URL: {}", e))?;
        self.multicall()?;
        self.factory()?;
        if self.max_calls_per_batch == 0 {
            return Err(eyre::eyre!("MAX_CALLS_PER_BATCH must be positive"));
        }
        if self.max_snapshots_per_venue == 0 {
            return Err(eyre::eyre!("MAX_SNAPSHOTS_PER_VENUE must be positive"));
        }
        Ok(())
    }

    pub fn multicall(&self) -> eyre::Result<Address> {
        parse_address("MULTICALL_ADDRESS", &self.multicall_address)
    }

    pub fn factory(&self) -> eyre::Result<Address> {
        parse_address("FACTORY_ADDRESS", &self.factory_address)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn liquidity_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.liquidity_cache_ttl_secs)
    }
}

#[async_trait]
impl ConfigLoader for SyncConfig {
    type SectionType = SyncConfig;

    async fn load_section_from_file(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: SyncConfigRoot = load_from_file(file_name).await?;
        Ok(root.sync)
    }
}

impl ConfigLoaderSync for SyncConfig {
    type SectionType = SyncConfig;

    fn load_section_from_file_sync(file_name: String) -> Result<Self::SectionType, LoadConfigError> {
        let root: SyncConfigRoot = load_from_file_sync(file_name)?;
        Ok(root.sync)
    }
}
