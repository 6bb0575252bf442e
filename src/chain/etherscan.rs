//! Contract metadata resolver
//!
//! Resolves a contract's ABI from the Etherscan API and verifies, once at
//! startup, that the presale contract actually exposes the functions the
//! agent is about to call. An unresolvable ABI is a fatal configuration
//! error, never a retryable runtime one: trading against an interface we
//! cannot confirm would silently decide on broken data.

use crate::{Error, Result};
use alloy::primitives::Address;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.etherscan.io/api";
const API_KEY_ENV: &str = "ETHERSCAN_API_KEY";

#[derive(Debug, Deserialize)]
struct EtherscanResponse {
    status: String,
    message: String,
    result: String,
}

pub struct EtherscanAbiResolver {
    client: Client,
    base_url: String,
    api_key: String,
}

impl EtherscanAbiResolver {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from the `ETHERSCAN_API_KEY` environment variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::Config(format!("{API_KEY_ENV} not set")))?;
        Ok(Self::new(api_key))
    }

    /// Fetch the verified ABI for `address` as parsed JSON.
    pub async fn get_interface(&self, address: Address) -> Result<Value> {
        let url = format!(
            "{}?module=contract&action=getabi&address={}&apikey={}",
            self.base_url, address, self.api_key
        );
        let response: EtherscanResponse = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::AbiUnavailable(format!("{address}: {e}")))?
            .json()
            .await
            .map_err(|e| Error::AbiUnavailable(format!("{address}: {e}")))?;

        if response.status != "1" {
            return Err(Error::AbiUnavailable(format!(
                "{address}: {} ({})",
                response.message, response.result
            )));
        }

        serde_json::from_str(&response.result)
            .map_err(|e| Error::AbiUnavailable(format!("{address}: invalid ABI JSON: {e}")))
    }

    /// Startup check: the contract at `address` must expose every function
    /// in `required`.
    pub async fn verify_interface(&self, address: Address, required: &[&str]) -> Result<()> {
        let abi = self.get_interface(address).await?;
        ensure_functions(&abi, required)
            .map_err(|missing| Error::AbiUnavailable(format!("{address}: missing {missing}")))
    }
}

/// Check that every name in `required` appears as a function in the ABI.
fn ensure_functions(abi: &Value, required: &[&str]) -> std::result::Result<(), String> {
    let functions: Vec<&str> = abi
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter(|e| e.get("type").and_then(Value::as_str) == Some("function"))
                .filter_map(|e| e.get("name").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    let missing: Vec<&str> = required
        .iter()
        .filter(|name| !functions.contains(*name))
        .copied()
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing.join(", "))
    }
}
