//! Secure wallet
//!
//! The only place a private key exists. The key lives inside alloy's
//! `PrivateKeySigner`, is read from the environment through `SecretString`
//! so intermediate copies are not left around, and is never serialized or
//! logged.

use crate::{Error, Result};
use alloy::network::EthereumWallet;
use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use secrecy::{ExposeSecret, SecretString};

pub struct SecureWallet {
    address: Address,
    wallet: EthereumWallet,
}

impl SecureWallet {
    /// Load the key from an environment variable holding hex.
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key = std::env::var(var_name).map(SecretString::from).map_err(|_| {
            Error::Wallet(format!(
                "environment variable {var_name} not set; required for signing"
            ))
        })?;
        Self::from_hex(key.expose_secret())
    }

    /// Build from a hex-encoded private key, with or without 0x prefix.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);
        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("invalid private key: {e}")))?;

        let address = signer.address();
        let wallet = EthereumWallet::from(signer);
        Ok(Self { address, wallet })
    }

    /// Public address, safe to share and log.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Signing wallet for alloy providers. Exposes signing operations
    /// only, never the raw key.
    pub fn wallet(&self) -> &EthereumWallet {
        &self.wallet
    }
}

impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("key", &"[REDACTED]")
            .finish()
    }
}
