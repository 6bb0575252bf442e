//! Trade decision engine
//!
//! Pure mapping from a fresh price quote, the tranche-indexed minimum
//! price table, and account balances to the action the loop should take
//! this cycle. No chain access happens here; every input is a snapshot
//! taken at the top of the cycle.

use crate::vesting::ClaimState;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single price observation from the exchange venue.
///
/// Ephemeral: fetched fresh each cycle and never cached across cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    /// Base units of the held token offered.
    pub input_amount: u128,
    /// Base units of the target asset the venue would return.
    pub output_amount: u128,
    pub input_decimals: u8,
    pub output_decimals: u8,
}

impl PriceQuote {
    /// Price of one whole input token in whole output tokens.
    pub fn price(&self) -> f64 {
        if self.input_amount == 0 {
            return 0.0;
        }
        let output = self.output_amount as f64 / 10f64.powi(self.output_decimals as i32);
        let input = self.input_amount as f64 / 10f64.powi(self.input_decimals as i32);
        output / input
    }
}

/// Ordered minimum acceptable sale prices, one entry per tranche of
/// claimed tokens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdTable(pub Vec<f64>);

impl ThresholdTable {
    /// Minimum price for the tranche the wallet is currently selling.
    ///
    /// The active index is `claimed_amount / tranche_size`, clamped to the
    /// last entry once claims outrun the table. A zero tranche size or an
    /// empty table is a configuration error, not a runtime decision.
    pub fn active_min_price(&self, claimed_amount: u128, tranche_size: u128) -> Result<f64> {
        if tranche_size == 0 {
            return Err(Error::Config(
                "tranche_size must be non-zero to index the threshold table".to_string(),
            ));
        }
        if self.0.is_empty() {
            return Err(Error::Config("threshold table is empty".to_string()));
        }
        let index = (claimed_amount / tranche_size).min((self.0.len() - 1) as u128) as usize;
        Ok(self.0[index])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What the loop should do this cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Wait: price below threshold, or nothing actionable.
    None,
    /// Claim vested tokens so a later cycle can sell a full tranche.
    ClaimOnly,
    /// Sell exactly one tranche at the current price.
    SwapOnly,
    /// Claim, await confirmation, then sell one tranche.
    ClaimThenSwap,
}

impl Action {
    pub fn includes_claim(&self) -> bool {
        matches!(self, Action::ClaimOnly | Action::ClaimThenSwap)
    }

    pub fn includes_swap(&self) -> bool {
        matches!(self, Action::SwapOnly | Action::ClaimThenSwap)
    }
}

/// Decide the action for this cycle.
///
/// A sale requires the quoted price to be strictly above the active
/// tranche's minimum; equality waits. With the price condition met, a
/// wallet holding at least one tranche sells it, otherwise an eligible
/// claim runs first so the balance reaches the tranche size on a later
/// cycle.
pub fn decide(
    quote: &PriceQuote,
    thresholds: &ThresholdTable,
    claim_state: &ClaimState,
    wallet_balance: u128,
    tranche_size: u128,
    claim_eligible: bool,
) -> Result<Action> {
    let min_price = thresholds.active_min_price(claim_state.claimed_amount, tranche_size)?;
    let price = quote.price();

    if price <= min_price {
        return Ok(Action::None);
    }

    if wallet_balance >= tranche_size {
        Ok(Action::SwapOnly)
    } else if claim_eligible {
        Ok(Action::ClaimOnly)
    } else {
        Ok(Action::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quote(output_amount: u128) -> PriceQuote {
        // One whole 18-decimal token quoted against a 6-decimal stable.
        PriceQuote {
            input_amount: 1_000_000_000_000_000_000,
            output_amount,
            input_decimals: 18,
            output_decimals: 6,
        }
    }

    fn state(claimed_amount: u128) -> ClaimState {
        ClaimState {
            total_allocated: 10_000,
            claimed_amount,
            claim_count: 1,
            claim_enabled: true,
        }
    }

    const TRANCHE: u128 = 1_000;

    fn table() -> ThresholdTable {
        ThresholdTable(vec![0.04, 0.05, 0.06])
    }

    #[test]
    fn quote_price_is_decimal_aware() {
        // 40_000 of a 6-decimal asset for one 18-decimal token = 0.04.
        assert!((quote(40_000).price() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn tranche_index_boundaries() {
        let table = table();
        assert_eq!(table.active_min_price(0, TRANCHE).unwrap(), 0.04);
        assert_eq!(table.active_min_price(TRANCHE - 1, TRANCHE).unwrap(), 0.04);
        // Exactly one tranche claimed moves to the second entry.
        assert_eq!(table.active_min_price(TRANCHE, TRANCHE).unwrap(), 0.05);
        // Past the end of the table, clamp to the last entry.
        assert_eq!(table.active_min_price(50 * TRANCHE, TRANCHE).unwrap(), 0.06);
    }

    #[test]
    fn zero_tranche_size_is_a_config_error() {
        let err = table().active_min_price(0, 0).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_table_is_a_config_error() {
        let err = ThresholdTable(vec![]).active_min_price(0, TRANCHE).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn price_equal_to_threshold_waits() {
        let action = decide(&quote(40_000), &table(), &state(0), TRANCHE, TRANCHE, true).unwrap();
        assert_eq!(action, Action::None);
    }

    #[test]
    fn price_above_threshold_with_balance_swaps() {
        // One base unit above the threshold is enough.
        let action = decide(&quote(40_001), &table(), &state(0), TRANCHE, TRANCHE, false).unwrap();
        assert_eq!(action, Action::SwapOnly);
        assert!(action.includes_swap());
        assert!(!action.includes_claim());
    }

    #[test]
    fn price_above_threshold_without_balance_claims_if_eligible() {
        let action =
            decide(&quote(40_001), &table(), &state(0), TRANCHE - 1, TRANCHE, true).unwrap();
        assert_eq!(action, Action::ClaimOnly);
    }

    #[test]
    fn price_above_threshold_without_balance_or_claim_waits() {
        let action =
            decide(&quote(40_001), &table(), &state(0), TRANCHE - 1, TRANCHE, false).unwrap();
        assert_eq!(action, Action::None);
    }

    #[test]
    fn later_tranche_uses_its_own_threshold() {
        // 0.045 clears tranche 0 (0.04) but not tranche 1 (0.05).
        let action =
            decide(&quote(45_000), &table(), &state(TRANCHE), TRANCHE, TRANCHE, true).unwrap();
        assert_eq!(action, Action::None);
    }

    #[test]
    fn claim_then_swap_decomposes() {
        assert!(Action::ClaimThenSwap.includes_claim());
        assert!(Action::ClaimThenSwap.includes_swap());
        assert!(!Action::None.includes_claim());
        assert!(!Action::None.includes_swap());
    }
}
