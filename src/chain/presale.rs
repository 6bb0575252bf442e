//! Alloy-backed chain client for the presale contract
//!
//! Reads the vesting schedule and per-wallet claim data, submits claim
//! transactions, and waits for receipts by polling the provider. All
//! provider failures are translated into the crate error taxonomy at this
//! boundary; nothing above it looks at error text.

use crate::chain::erc20::{self, TokenMeta};
use crate::chain::{classify_contract_error, to_u128, ChainClient, ReceiptStatus, TxId, TxReceipt};
use crate::vesting::{ClaimState, VestingSchedule};
use crate::{Error, Result};
use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider};
use alloy::sol;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

sol! {
    #[sol(rpc)]
    interface IVestingPresale {
        function presale(uint256 id) external view returns (
            uint256 startTime,
            uint256 initialClaimPermille,
            uint256 cycleDuration,
            uint256 permillePerCycle,
            uint256 totalCycles,
            bool claimEnabled
        );

        function userClaimData(address user, uint256 id) external view returns (
            uint256 claimableAmount,
            uint256 claimedAmount,
            uint256 claimCount
        );

        function claimAmount(uint256 id) external returns (bool);
    }
}

const RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(2);

pub struct EthereumChainClient {
    provider: DynProvider,
    presale: IVestingPresale::IVestingPresaleInstance<DynProvider>,
    input_token: TokenMeta,
    wallet_address: Address,
    presale_id: U256,
}

impl EthereumChainClient {
    pub fn new(
        provider: DynProvider,
        presale_address: Address,
        input_token: TokenMeta,
        wallet_address: Address,
        presale_id: u64,
    ) -> Self {
        let presale = IVestingPresale::new(presale_address, provider.clone());
        Self {
            provider,
            presale,
            input_token,
            wallet_address,
            presale_id: U256::from(presale_id),
        }
    }

    pub fn input_token(&self) -> &TokenMeta {
        &self.input_token
    }
}

#[async_trait]
impl ChainClient for EthereumChainClient {
    async fn is_connected(&self) -> bool {
        self.provider.get_chain_id().await.is_ok()
    }

    async fn current_time(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(|e| Error::Rpc(e.to_string()))?
            .ok_or_else(|| Error::Rpc("node returned no latest block".to_string()))?;
        Ok(block.header.timestamp)
    }

    async fn vesting_schedule(&self) -> Result<VestingSchedule> {
        let data = self
            .presale
            .presale(self.presale_id)
            .call()
            .await
            .map_err(classify_contract_error)?;

        let permille = |value: U256, field: &str| -> Result<u16> {
            u16::try_from(to_u128(value, field)?)
                .map_err(|_| Error::Config(format!("{field} exceeds u16")))
        };

        Ok(VestingSchedule {
            start_time: to_u128(data.startTime, "startTime")? as u64,
            initial_claim_permille: permille(data.initialClaimPermille, "initialClaimPermille")?,
            cycle_duration: to_u128(data.cycleDuration, "cycleDuration")? as u64,
            permille_per_cycle: permille(data.permillePerCycle, "permillePerCycle")?,
            total_cycles: to_u128(data.totalCycles, "totalCycles")? as u64,
        })
    }

    async fn claim_state(&self) -> Result<ClaimState> {
        let schedule = self
            .presale
            .presale(self.presale_id)
            .call()
            .await
            .map_err(classify_contract_error)?;
        let data = self
            .presale
            .userClaimData(self.wallet_address, self.presale_id)
            .call()
            .await
            .map_err(classify_contract_error)?;

        let claimable = to_u128(data.claimableAmount, "claimableAmount")?;
        let claimed = to_u128(data.claimedAmount, "claimedAmount")?;
        Ok(ClaimState {
            total_allocated: claimable.saturating_add(claimed),
            claimed_amount: claimed,
            claim_count: to_u128(data.claimCount, "claimCount")? as u64,
            claim_enabled: schedule.claimEnabled,
        })
    }

    async fn wallet_balance(&self) -> Result<u128> {
        erc20::balance_of(
            self.provider.clone(),
            self.input_token.address,
            self.wallet_address,
        )
        .await
    }

    async fn submit_claim(&self) -> Result<TxId> {
        // The contract reverts on a claim with nothing vested; surface that
        // as the structured non-retryable signal before spending gas.
        let data = self
            .presale
            .userClaimData(self.wallet_address, self.presale_id)
            .call()
            .await
            .map_err(classify_contract_error)?;
        if data.claimableAmount.is_zero() {
            return Err(Error::InsufficientBalance(format!(
                "no claimable {} allocation for presale {}",
                self.input_token.symbol, self.presale_id
            )));
        }

        let pending = self
            .presale
            .claimAmount(self.presale_id)
            .send()
            .await
            .map_err(classify_contract_error)?;
        Ok(*pending.tx_hash())
    }

    async fn wait_for_receipt(&self, tx: TxId, timeout: Duration) -> Result<TxReceipt> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.provider.get_transaction_receipt(tx).await {
                Ok(Some(receipt)) => {
                    let status = if receipt.status() {
                        ReceiptStatus::Success
                    } else {
                        ReceiptStatus::Failure
                    };
                    return Ok(TxReceipt { tx, status });
                }
                Ok(None) => debug!(tx = %tx, "Receipt not yet available"),
                Err(e) => debug!(tx = %tx, error = %e, "Receipt poll failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::ReceiptTimeout(tx.to_string()));
            }
            tokio::time::sleep(RECEIPT_POLL_INTERVAL).await;
        }
    }
}
