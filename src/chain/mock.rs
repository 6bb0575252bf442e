//! Scripted chain client for executor and loop tests

use crate::chain::{ChainClient, ReceiptStatus, TxId, TxReceipt};
use crate::vesting::{ClaimState, VestingSchedule};
use crate::Result;
use alloy::primitives::B256;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A [`ChainClient`] returning fixed snapshots and scripted submission
/// results. Submission and receipt queues pop front-to-back; an exhausted
/// queue yields success.
pub struct MockChain {
    pub connected: bool,
    pub now: u64,
    pub schedule: VestingSchedule,
    pub claim_state: ClaimState,
    pub balance: u128,
    pub claim_results: Mutex<VecDeque<Result<TxId>>>,
    pub receipt_results: Mutex<VecDeque<Result<TxReceipt>>>,
    pub claim_calls: AtomicU32,
    pub receipt_calls: AtomicU32,
}

impl Default for MockChain {
    fn default() -> Self {
        Self {
            connected: true,
            now: 1000,
            schedule: VestingSchedule {
                start_time: 1000,
                initial_claim_permille: 100,
                cycle_duration: 100,
                permille_per_cycle: 50,
                total_cycles: 18,
            },
            claim_state: ClaimState {
                total_allocated: 1000,
                claimed_amount: 0,
                claim_count: 0,
                claim_enabled: true,
            },
            balance: 0,
            claim_results: Mutex::new(VecDeque::new()),
            receipt_results: Mutex::new(VecDeque::new()),
            claim_calls: AtomicU32::new(0),
            receipt_calls: AtomicU32::new(0),
        }
    }
}

impl MockChain {
    pub fn script_claim(&self, result: Result<TxId>) {
        self.claim_results.lock().unwrap().push_back(result);
    }

    pub fn script_receipt(&self, result: Result<TxReceipt>) {
        self.receipt_results.lock().unwrap().push_back(result);
    }

    pub fn claim_calls(&self) -> u32 {
        self.claim_calls.load(Ordering::SeqCst)
    }

    pub fn receipt_calls(&self) -> u32 {
        self.receipt_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChainClient for MockChain {
    async fn is_connected(&self) -> bool {
        self.connected
    }

    async fn current_time(&self) -> Result<u64> {
        Ok(self.now)
    }

    async fn vesting_schedule(&self) -> Result<VestingSchedule> {
        Ok(self.schedule)
    }

    async fn claim_state(&self) -> Result<ClaimState> {
        Ok(self.claim_state)
    }

    async fn wallet_balance(&self) -> Result<u128> {
        Ok(self.balance)
    }

    async fn submit_claim(&self) -> Result<TxId> {
        self.claim_calls.fetch_add(1, Ordering::SeqCst);
        self.claim_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(B256::ZERO))
    }

    async fn wait_for_receipt(&self, tx: TxId, _timeout: Duration) -> Result<TxReceipt> {
        self.receipt_calls.fetch_add(1, Ordering::SeqCst);
        self.receipt_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(TxReceipt {
                tx,
                status: ReceiptStatus::Success,
            }))
    }
}
