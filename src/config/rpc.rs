//! RPC endpoint configuration
//!
//! Supports the usual Ethereum ecosystem conventions, highest priority
//! first:
//! 1. Per-chain env vars (ETH_RPC_URL, SEPOLIA_RPC_URL)
//! 2. Provider API keys (ALCHEMY_API_KEY, INFURA_API_KEY)
//! 3. Public RPC fallbacks - rate limited, for testing only

use crate::config::Network;
use std::collections::HashMap;

/// RPC URLs indexed by chain ID
#[derive(Debug, Clone)]
pub struct RpcConfig {
    urls: HashMap<u64, String>,
}

mod env_vars {
    pub const ETH_RPC_URL: &str = "ETH_RPC_URL";
    pub const SEPOLIA_RPC_URL: &str = "SEPOLIA_RPC_URL";
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const INFURA_API_KEY: &str = "INFURA_API_KEY";
}

mod public_rpcs {
    pub const ETHEREUM: &str = "https://eth.llamarpc.com";
    pub const SEPOLIA: &str = "https://ethereum-sepolia-rpc.publicnode.com";
}

const ETHEREUM: u64 = 1;
const SEPOLIA: u64 = 11_155_111;

impl RpcConfig {
    /// Resolve RPC URLs from the environment.
    pub fn from_env() -> Self {
        Self::resolve(|name| std::env::var(name).ok())
    }

    /// Resolution against an arbitrary variable lookup; tests inject maps
    /// here instead of mutating process environment.
    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut urls = HashMap::new();

        if let Some(url) = lookup(env_vars::ETH_RPC_URL) {
            tracing::debug!("Using ETH_RPC_URL for Ethereum");
            urls.insert(ETHEREUM, url);
        }
        if let Some(url) = lookup(env_vars::SEPOLIA_RPC_URL) {
            tracing::debug!("Using SEPOLIA_RPC_URL for Sepolia");
            urls.insert(SEPOLIA, url);
        }

        if urls.is_empty() {
            if let Some(key) = lookup(env_vars::ALCHEMY_API_KEY) {
                tracing::info!("Building RPC URLs from ALCHEMY_API_KEY");
                urls.insert(
                    ETHEREUM,
                    format!("https://eth-mainnet.g.alchemy.com/v2/{}", key),
                );
                urls.insert(
                    SEPOLIA,
                    format!("https://eth-sepolia.g.alchemy.com/v2/{}", key),
                );
            }
        }

        if urls.is_empty() {
            if let Some(key) = lookup(env_vars::INFURA_API_KEY) {
                tracing::info!("Building RPC URLs from INFURA_API_KEY");
                urls.insert(ETHEREUM, format!("https://mainnet.infura.io/v3/{}", key));
                urls.insert(SEPOLIA, format!("https://sepolia.infura.io/v3/{}", key));
            }
        }

        if !urls.contains_key(&ETHEREUM) {
            tracing::warn!("No RPC configured for Ethereum, using public RPC (rate limited)");
        }
        urls.entry(ETHEREUM)
            .or_insert_with(|| public_rpcs::ETHEREUM.to_string());
        urls.entry(SEPOLIA)
            .or_insert_with(|| public_rpcs::SEPOLIA.to_string());

        Self { urls }
    }

    /// Create with explicit RPC URLs
    pub fn with_urls(urls: HashMap<u64, String>) -> Self {
        Self { urls }
    }

    /// RPC URL for a network
    pub fn url_for(&self, network: Network) -> Option<&str> {
        self.urls.get(&network.chain_id()).map(|s| s.as_str())
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_urls_resolve_by_network() {
        let mut urls = HashMap::new();
        urls.insert(1, "https://custom.rpc".to_string());
        let config = RpcConfig::with_urls(urls);

        assert_eq!(config.url_for(Network::Ethereum), Some("https://custom.rpc"));
        assert_eq!(config.url_for(Network::Sepolia), None);
    }

    #[test]
    fn public_rpc_fallbacks_cover_both_networks() {
        let config = RpcConfig::resolve(|_| None);
        assert!(config.url_for(Network::Ethereum).is_some());
        assert!(config.url_for(Network::Sepolia).is_some());
    }

    #[test]
    fn per_chain_url_takes_priority_over_api_keys() {
        let config = RpcConfig::resolve(|name| match name {
            env_vars::ETH_RPC_URL => Some("https://custom.rpc".to_string()),
            env_vars::ALCHEMY_API_KEY => Some("key".to_string()),
            _ => None,
        });
        assert_eq!(config.url_for(Network::Ethereum), Some("https://custom.rpc"));
    }

    #[test]
    fn alchemy_key_builds_urls_for_both_networks() {
        let config = RpcConfig::resolve(|name| match name {
            env_vars::ALCHEMY_API_KEY => Some("abc123".to_string()),
            _ => None,
        });
        assert_eq!(
            config.url_for(Network::Ethereum),
            Some("https://eth-mainnet.g.alchemy.com/v2/abc123")
        );
        assert_eq!(
            config.url_for(Network::Sepolia),
            Some("https://eth-sepolia.g.alchemy.com/v2/abc123")
        );
    }
}
