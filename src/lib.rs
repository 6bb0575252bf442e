//! Presale Trading Agent
//!
//! An unattended agent that watches one vesting position in a presale
//! distribution contract and one Uniswap V3 token pair:
//! - Computes claim eligibility from the on-chain vesting schedule
//! - Sells claimed tokens tranche by tranche when price clears a threshold
//! - Drives every on-chain call through a retrying transaction executor
//!
//! # State model
//!
//! - Chain state is the only durable state; the agent is restart-safe
//! - Every cycle works on fresh immutable snapshots, never cached reads
//! - Private keys never leave the wallet module

pub mod chain;
pub mod config;
pub mod decision;
pub mod exchange;
pub mod executor;
pub mod trader;
pub mod vesting;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{Config, Network, RpcConfig};
pub use error::{Error, ErrorKind, Result};
pub use trader::Trader;
