//! Minimal ERC-20 surface shared by the chain client and the venue

use crate::chain::{classify_contract_error, to_u128};
use crate::Result;
use alloy::primitives::Address;
use alloy::providers::DynProvider;
use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

/// Token identity read once at connect time.
#[derive(Debug, Clone)]
pub struct TokenMeta {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl TokenMeta {
    /// Read symbol and decimals from the token contract.
    pub async fn load(provider: DynProvider, address: Address) -> Result<Self> {
        let token = IERC20::new(address, provider);
        let symbol = token.symbol().call().await.map_err(classify_contract_error)?;
        let decimals = token.decimals().call().await.map_err(classify_contract_error)?;
        Ok(Self {
            address,
            symbol,
            decimals,
        })
    }

    /// One whole token in base units.
    pub fn unit_amount(&self) -> u128 {
        10u128.pow(self.decimals as u32)
    }
}

/// Balance of `owner` in base units.
pub async fn balance_of(provider: DynProvider, token: Address, owner: Address) -> Result<u128> {
    let token = IERC20::new(token, provider);
    let balance = token
        .balanceOf(owner)
        .call()
        .await
        .map_err(classify_contract_error)?;
    to_u128(balance, "balanceOf")
}
