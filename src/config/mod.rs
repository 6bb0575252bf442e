//! Configuration for the presale trading agent

pub mod rpc;

use crate::decision::ThresholdTable;
use crate::{Error, Result};
use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::path::Path;

// Re-export RPC config
pub use rpc::RpcConfig;

/// Supported networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Sepolia,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Sepolia => 11_155_111,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Sepolia => "sepolia",
        }
    }
}

/// On-chain addresses the agent talks to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Time-locked presale distribution contract.
    pub presale: Address,
    /// Token the presale vests (what we claim and sell).
    pub input_token: Address,
    /// Asset we sell into.
    pub output_token: Address,
    /// Uniswap V3 SwapRouter.
    pub swap_router: Address,
    /// Uniswap V3 QuoterV2.
    pub quoter: Address,
}

/// Trade sizing and thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Base units sold per tranche; also the divisor for the active
    /// tranche index. Must be non-zero.
    pub tranche_size: u128,
    /// Minimum sale price per tranche, output tokens per input token.
    pub thresholds: ThresholdTable,
    /// Uniswap pool fee tier in hundredths of a bip (e.g. 3000 = 0.3%).
    #[serde(default = "default_pool_fee")]
    pub pool_fee: u32,
    /// Slippage tolerance on the swap's minimum output, parts-per-1000.
    #[serde(default = "default_slippage_permille")]
    pub slippage_permille: u16,
}

fn default_pool_fee() -> u32 {
    3000
}

fn default_slippage_permille() -> u16 {
    10
}

/// Loop and retry timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalsConfig {
    /// Sleep after a completed cycle.
    pub poll_secs: u64,
    /// Sleep after an error or a wait decision.
    pub error_backoff_secs: u64,
    /// Fixed backoff between transaction retries.
    pub retry_backoff_secs: u64,
    /// Bound on waiting for a single receipt.
    pub receipt_timeout_secs: u64,
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            poll_secs: 1,
            error_backoff_secs: 5,
            retry_backoff_secs: 5,
            receipt_timeout_secs: 120,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: Network,
    /// Presale position id inside the distribution contract.
    pub presale_id: u64,
    pub contracts: ContractsConfig,
    pub trading: TradingConfig,
    #[serde(default)]
    pub intervals: IntervalsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: Network::Ethereum,
            presale_id: 2,
            contracts: ContractsConfig {
                presale: address!("602C90D796D746b97a36f075d9f3b2892B9B07c2"),
                input_token: address!("26EbB8213fb8D66156F1Af8908d43f7e3e367C1d"),
                output_token: address!("dAC17F958D2ee523a2206206994597C13D831ec7"), // USDT
                swap_router: address!("E592427A0AEce92De3Edee1F18E0157C05861564"),
                quoter: address!("61fFE014bA17989E743c5F6cB21bF9697530B21e"),
            },
            trading: TradingConfig {
                tranche_size: 1_000_000_000_000_000_000_000, // 1000 tokens at 18 decimals
                thresholds: ThresholdTable(vec![0.04]),
                pool_fee: default_pool_fee(),
                slippage_permille: default_slippage_permille(),
            },
            intervals: IntervalsConfig::default(),
        }
    }
}

impl Config {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Ok(config)
    }

    /// Fail fast on values the decision engine cannot safely run on.
    pub fn validate(&self) -> Result<()> {
        if self.trading.tranche_size == 0 {
            return Err(Error::Config("trading.tranche_size must be non-zero".to_string()));
        }
        if self.trading.thresholds.is_empty() {
            return Err(Error::Config("trading.thresholds must not be empty".to_string()));
        }
        if self
            .trading
            .thresholds
            .0
            .iter()
            .any(|p| !p.is_finite() || *p < 0.0)
        {
            return Err(Error::Config(
                "trading.thresholds entries must be finite and non-negative".to_string(),
            ));
        }
        if self.trading.slippage_permille >= 1000 {
            return Err(Error::Config(
                "trading.slippage_permille must be below 1000".to_string(),
            ));
        }
        // The router takes the fee as uint24; anything wider would only
        // fail once the first quote is built.
        if self.trading.pool_fee == 0 || self.trading.pool_fee > 0xFF_FFFF {
            return Err(Error::Config(
                "trading.pool_fee must be non-zero and fit in 24 bits".to_string(),
            ));
        }
        if self.intervals.receipt_timeout_secs == 0 {
            return Err(Error::Config(
                "intervals.receipt_timeout_secs must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn zero_tranche_size_fails_validation() {
        let mut config = Config::default();
        config.trading.tranche_size = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn empty_thresholds_fail_validation() {
        let mut config = Config::default();
        config.trading.thresholds = ThresholdTable(vec![]);
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn pool_fee_wider_than_uint24_fails_validation() {
        let mut config = Config::default();
        config.trading.pool_fee = 20_000_000; // > 2^24 - 1
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        config.trading.pool_fee = 0xFF_FFFF;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn nan_threshold_fails_validation() {
        let mut config = Config::default();
        config.trading.thresholds = ThresholdTable(vec![f64::NAN]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let value = serde_json::json!({
            "network": "ethereum",
            "presale_id": 2,
            "contracts": {
                "presale": "0x602C90D796D746b97a36f075d9f3b2892B9B07c2",
                "input_token": "0x26EbB8213fb8D66156F1Af8908d43f7e3e367C1d",
                "output_token": "0xdAC17F958D2ee523a2206206994597C13D831ec7",
                "swap_router": "0xE592427A0AEce92De3Edee1F18E0157C05861564",
                "quoter": "0x61fFE014bA17989E743c5F6cB21bF9697530B21e"
            },
            "trading": {
                "tranche_size": 1000,
                "thresholds": [0.04, 0.05]
            }
        });
        let parsed: Config = serde_json::from_value(value).expect("parse config");
        assert_eq!(parsed.trading.pool_fee, 3000);
        assert_eq!(parsed.trading.slippage_permille, 10);
        assert_eq!(parsed.intervals.poll_secs, 1);
        assert_eq!(parsed.intervals.error_backoff_secs, 5);
        assert_eq!(parsed.trading.thresholds.len(), 2);
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.contracts.presale, config.contracts.presale);
        assert_eq!(parsed.trading.tranche_size, config.trading.tranche_size);
    }
}
