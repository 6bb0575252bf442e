//! Vesting-eligibility accounting
//!
//! Pure functions mapping a vesting schedule, the on-chain claim history,
//! and the current block time to "is a claim allowed right now" and "how
//! much would it transfer". All amounts are integer token base units and
//! all permille arithmetic uses floor division; floating point never
//! touches claimable amounts.

use serde::{Deserialize, Serialize};

/// Immutable vesting rules for one presale position.
///
/// Percentages are parts-per-1000. `initial_claim_permille +
/// permille_per_cycle * total_cycles` may exceed 1000; the computed
/// unlocked share is clamped to 1000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSchedule {
    /// Unix timestamp at which the first claim unlocks.
    pub start_time: u64,
    /// Share unlocked by the first claim, parts-per-1000.
    pub initial_claim_permille: u16,
    /// Seconds per vesting cycle. Must be non-zero; validated at startup.
    pub cycle_duration: u64,
    /// Additional share unlocked per completed cycle, parts-per-1000.
    pub permille_per_cycle: u16,
    /// Number of cycles after which the schedule stops accruing.
    pub total_cycles: u64,
}

/// Mutable per-wallet claim history, read fresh from chain each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimState {
    /// Full allocation: claimable plus already claimed, base units.
    pub total_allocated: u128,
    /// Amount already transferred out by prior claims, base units.
    pub claimed_amount: u128,
    /// Number of successful prior claims.
    pub claim_count: u64,
    /// Set by the contract owner; nothing is claimable while false.
    pub claim_enabled: bool,
}

impl ClaimState {
    /// Allocation still held by the presale contract.
    pub fn remaining(&self) -> u128 {
        self.total_allocated.saturating_sub(self.claimed_amount)
    }
}

/// Result of [`compute_claimable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claimable {
    /// Whether submitting a claim now would succeed.
    pub eligible: bool,
    /// Base units a claim submitted now would transfer.
    pub amount: u128,
}

impl Claimable {
    const NONE: Claimable = Claimable {
        eligible: false,
        amount: 0,
    };
}

/// Floor of `amount * permille / 1000`, saturating on the multiply.
fn permille_of(amount: u128, permille: u128) -> u128 {
    amount.saturating_mul(permille) / 1000
}

/// Compute claim eligibility and the amount a claim would transfer at `now`.
///
/// The first claim unlocks only the initial share and requires `now` to
/// have reached `start_time`. Later claims unlock
/// `min(1000, initial + per_cycle * cycles_completed)` of the allocation,
/// with `cycles_completed` clamped to the schedule's total, and require a
/// cycle to have completed since the last claim
/// (`cycles_completed > claim_count`).
///
/// For a fixed claim state the returned amount is non-decreasing in `now`
/// and never exceeds the remaining unclaimed allocation.
pub fn compute_claimable(schedule: &VestingSchedule, state: &ClaimState, now: u64) -> Claimable {
    if !state.claim_enabled || state.remaining() == 0 {
        return Claimable::NONE;
    }

    if state.claim_count == 0 {
        if now < schedule.start_time {
            return Claimable::NONE;
        }
        return Claimable {
            eligible: true,
            amount: permille_of(state.total_allocated, schedule.initial_claim_permille as u128),
        };
    }

    // The schedule is read from chain; a zero cycle duration must not
    // panic the loop.
    if schedule.cycle_duration == 0 {
        return Claimable::NONE;
    }

    let elapsed = now.saturating_sub(schedule.start_time);
    let cycles_completed = (elapsed / schedule.cycle_duration).min(schedule.total_cycles);

    let total_permille = (schedule.initial_claim_permille as u128)
        .saturating_add((schedule.permille_per_cycle as u128).saturating_mul(cycles_completed as u128))
        .min(1000);

    let total_claimable = permille_of(state.total_allocated, total_permille);
    let amount = total_claimable
        .saturating_sub(state.claimed_amount)
        .min(state.remaining());

    Claimable {
        eligible: cycles_completed > state.claim_count,
        amount,
    }
}
