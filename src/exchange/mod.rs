//! Exchange venue capability
//!
//! The core asks the venue two things: what would one tranche fetch right
//! now, and sell it. The Uniswap V3 implementation quotes through the
//! QuoterV2 and swaps through the SwapRouter, handling the router
//! allowance the way the original operator tooling did implicitly.

use crate::chain::erc20::{IERC20, TokenMeta};
use crate::chain::{classify_contract_error, to_u128, TxId};
use crate::decision::PriceQuote;
use crate::{Error, Result};
use alloy::primitives::{aliases::U24, Address, U160, U256};
use alloy::providers::DynProvider;
use alloy::sol;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

sol! {
    #[sol(rpc)]
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params)
            external
            returns (
                uint256 amountOut,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );
    }

    #[sol(rpc)]
    interface ISwapRouter {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 deadline;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params)
            external
            payable
            returns (uint256 amountOut);
    }
}

/// Seconds a submitted swap stays valid on the router.
const SWAP_DEADLINE_SECS: i64 = 300;
const APPROVAL_TIMEOUT: Duration = Duration::from_secs(120);

/// Quote and execute swaps for one fixed token pair.
#[async_trait]
pub trait ExchangeVenue: Send + Sync {
    /// Fresh quote for selling `input_amount` base units.
    async fn quote(&self, input_amount: u128) -> Result<PriceQuote>;

    /// Broadcast a swap selling `input_amount` base units.
    async fn submit_swap(&self, input_amount: u128) -> Result<TxId>;
}

pub struct UniswapV3Venue {
    provider: DynProvider,
    router_address: Address,
    quoter: IQuoterV2::IQuoterV2Instance<DynProvider>,
    router: ISwapRouter::ISwapRouterInstance<DynProvider>,
    input_token: TokenMeta,
    output_token: TokenMeta,
    wallet_address: Address,
    pool_fee: u32,
    slippage_permille: u16,
}

impl UniswapV3Venue {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: DynProvider,
        router_address: Address,
        quoter_address: Address,
        input_token: TokenMeta,
        output_token: TokenMeta,
        wallet_address: Address,
        pool_fee: u32,
        slippage_permille: u16,
    ) -> Self {
        let quoter = IQuoterV2::new(quoter_address, provider.clone());
        let router = ISwapRouter::new(router_address, provider.clone());
        Self {
            provider,
            router_address,
            quoter,
            router,
            input_token,
            output_token,
            wallet_address,
            pool_fee,
            slippage_permille,
        }
    }

    /// Make sure the router can move `amount` of the input token,
    /// approving and waiting for confirmation if it cannot yet.
    async fn ensure_allowance(&self, amount: U256) -> Result<()> {
        let token = IERC20::new(self.input_token.address, self.provider.clone());
        let allowance = token
            .allowance(self.wallet_address, self.router_address)
            .call()
            .await
            .map_err(classify_contract_error)?;
        if allowance >= amount {
            return Ok(());
        }

        info!(
            token = %self.input_token.symbol,
            router = %self.router_address,
            "Approving router for swaps"
        );
        let pending = token
            .approve(self.router_address, U256::MAX)
            .send()
            .await
            .map_err(classify_contract_error)?;
        pending
            .with_timeout(Some(APPROVAL_TIMEOUT))
            .watch()
            .await
            .map_err(|e| Error::Rpc(format!("approval confirmation failed: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ExchangeVenue for UniswapV3Venue {
    async fn quote(&self, input_amount: u128) -> Result<PriceQuote> {
        let params = IQuoterV2::QuoteExactInputSingleParams {
            tokenIn: self.input_token.address,
            tokenOut: self.output_token.address,
            amountIn: U256::from(input_amount),
            fee: U24::from(self.pool_fee),
            sqrtPriceLimitX96: U160::ZERO,
        };
        let quoted = self
            .quoter
            .quoteExactInputSingle(params)
            .call()
            .await
            .map_err(classify_contract_error)?;

        Ok(PriceQuote {
            input_amount,
            output_amount: to_u128(quoted.amountOut, "amountOut")?,
            input_decimals: self.input_token.decimals,
            output_decimals: self.output_token.decimals,
        })
    }

    async fn submit_swap(&self, input_amount: u128) -> Result<TxId> {
        // Structured non-retryable signal: the wallet cannot cover the sale.
        let balance = crate::chain::erc20::balance_of(
            self.provider.clone(),
            self.input_token.address,
            self.wallet_address,
        )
        .await?;
        if balance < input_amount {
            return Err(Error::InsufficientBalance(format!(
                "wallet holds {balance} {} base units, swap needs {input_amount}",
                self.input_token.symbol
            )));
        }

        let amount = U256::from(input_amount);
        self.ensure_allowance(amount).await?;

        // Re-quote at submission time so the minimum output reflects the
        // market the transaction will actually land in.
        let quote = self.quote(input_amount).await?;
        let min_out = quote
            .output_amount
            .saturating_mul((1000 - self.slippage_permille) as u128)
            / 1000;
        debug!(
            quoted_out = quote.output_amount,
            min_out,
            slippage_permille = self.slippage_permille,
            "Swap bounds"
        );

        let deadline = chrono::Utc::now().timestamp() + SWAP_DEADLINE_SECS;
        let params = ISwapRouter::ExactInputSingleParams {
            tokenIn: self.input_token.address,
            tokenOut: self.output_token.address,
            fee: U24::from(self.pool_fee),
            recipient: self.wallet_address,
            deadline: U256::from(deadline),
            amountIn: amount,
            amountOutMinimum: U256::from(min_out),
            sqrtPriceLimitX96: U160::ZERO,
        };
        let pending = self
            .router
            .exactInputSingle(params)
            .send()
            .await
            .map_err(classify_contract_error)?;
        Ok(*pending.tx_hash())
    }
}

#[cfg(test)]
pub mod mock {
    //! Scripted venue for executor and loop tests

    use super::*;
    use alloy::primitives::B256;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    pub struct MockVenue {
        pub quote_output: u128,
        pub input_decimals: u8,
        pub output_decimals: u8,
        pub swap_results: Mutex<VecDeque<Result<TxId>>>,
        pub swap_calls: AtomicU32,
    }

    impl MockVenue {
        /// Venue quoting `quote_output` base units of a 6-decimal asset for
        /// one whole 18-decimal input token.
        pub fn with_output(quote_output: u128) -> Self {
            Self {
                quote_output,
                input_decimals: 18,
                output_decimals: 6,
                swap_results: Mutex::new(VecDeque::new()),
                swap_calls: AtomicU32::new(0),
            }
        }

        pub fn script_swap(&self, result: Result<TxId>) {
            self.swap_results.lock().unwrap().push_back(result);
        }

        pub fn swap_calls(&self) -> u32 {
            self.swap_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExchangeVenue for MockVenue {
        async fn quote(&self, input_amount: u128) -> Result<PriceQuote> {
            Ok(PriceQuote {
                input_amount,
                output_amount: self.quote_output,
                input_decimals: self.input_decimals,
                output_decimals: self.output_decimals,
            })
        }

        async fn submit_swap(&self, _input_amount: u128) -> Result<TxId> {
            self.swap_calls.fetch_add(1, Ordering::SeqCst);
            self.swap_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(B256::ZERO))
        }
    }
}
