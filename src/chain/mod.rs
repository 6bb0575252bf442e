//! Chain access capabilities
//!
//! The trading core consumes the chain through the [`ChainClient`] trait;
//! the concrete alloy-backed implementation lives in [`presale`]. Keeping
//! the boundary here is what lets the executor and the loop run against
//! scripted mocks in tests.

pub mod erc20;
pub mod etherscan;
pub mod presale;

#[cfg(test)]
pub mod mock;

use crate::vesting::{ClaimState, VestingSchedule};
use crate::{Error, Result};
use alloy::primitives::B256;
use async_trait::async_trait;
use std::time::Duration;

/// Hash identifying a submitted transaction.
pub type TxId = B256;

/// Outcome recorded in a transaction receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Failure,
}

/// On-chain confirmation record for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx: TxId,
    pub status: ReceiptStatus,
}

/// Read and mutate the chain for one wallet and one presale position.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Whether the node connection is currently live.
    async fn is_connected(&self) -> bool;

    /// Latest block timestamp; the clock all vesting math runs on.
    async fn current_time(&self) -> Result<u64>;

    /// Vesting rules for the configured presale id.
    async fn vesting_schedule(&self) -> Result<VestingSchedule>;

    /// The wallet's claim history, read fresh.
    async fn claim_state(&self) -> Result<ClaimState>;

    /// Held-token balance of the wallet, base units.
    async fn wallet_balance(&self) -> Result<u128>;

    /// Broadcast a claim for the configured presale id.
    async fn submit_claim(&self) -> Result<TxId>;

    /// Wait for a receipt, bounded by `timeout`.
    async fn wait_for_receipt(&self, tx: TxId, timeout: Duration) -> Result<TxReceipt>;
}

/// Translate an alloy contract error into the crate taxonomy.
///
/// A node rejection for insufficient gas funds becomes the structured
/// non-retryable signal; everything else from the transport is transient.
pub(crate) fn classify_contract_error(err: alloy::contract::Error) -> Error {
    if let alloy::contract::Error::TransportError(transport) = &err {
        if let Some(payload) = transport.as_error_resp() {
            if payload.code == -32000 && payload.message.contains("insufficient funds") {
                return Error::InsufficientBalance(payload.message.to_string());
            }
        }
    }
    Error::Rpc(err.to_string())
}

/// Convert a chain-read `U256` into the core's `u128` base units.
///
/// A value that does not fit means the contract is returning garbage for
/// this position; deciding on it would be worse than stopping.
pub(crate) fn to_u128(value: alloy::primitives::U256, field: &str) -> Result<u128> {
    u128::try_from(value).map_err(|_| Error::Config(format!("{field} does not fit in u128: {value}")))
}
