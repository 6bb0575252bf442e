//! Transaction submission state machine
//!
//! One dispatched action moves through Built → Submitted → Confirmed or
//! Reverted. A non-retryable failure (the structured insufficient-balance
//! signal) aborts immediately; every other failure re-enters Built after a
//! fixed backoff, without bound, until the shutdown signal is observed.
//! Confirmation reports the transaction hash only; callers refresh their
//! view of claim and balance state from the next chain read, never from
//! local bookkeeping.

use crate::chain::{ChainClient, ReceiptStatus, TxId};
use crate::exchange::ExchangeVenue;
use crate::{Error, ErrorKind, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// What kind of on-chain call an attempt carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Claim,
    Swap,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionKind::Claim => write!(f, "claim"),
            ActionKind::Swap => write!(f, "swap"),
        }
    }
}

/// Lifecycle of a single logical action; discarded once terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Pending,
    Confirmed,
    Reverted,
}

#[derive(Debug)]
pub struct TransactionAttempt {
    pub kind: ActionKind,
    pub status: AttemptStatus,
    pub attempts: u32,
}

impl TransactionAttempt {
    fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            status: AttemptStatus::Pending,
            attempts: 0,
        }
    }
}

/// Terminal result of driving one action through the state machine.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// Receipt came back successful.
    Confirmed { tx: TxId, attempts: u32 },
    /// Non-retryable failure; the action was dropped without retry.
    Aborted { reason: Error, attempts: u32 },
    /// The shutdown signal was observed between attempts.
    Cancelled,
}

pub struct TransactionExecutor<C, V> {
    chain: Arc<C>,
    venue: Arc<V>,
    retry_backoff: Duration,
    receipt_timeout: Duration,
    shutdown: watch::Receiver<bool>,
}

impl<C: ChainClient, V: ExchangeVenue> TransactionExecutor<C, V> {
    pub fn new(
        chain: Arc<C>,
        venue: Arc<V>,
        retry_backoff: Duration,
        receipt_timeout: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            chain,
            venue,
            retry_backoff,
            receipt_timeout,
            shutdown,
        }
    }

    /// Drive `kind` to a terminal state. `amount` is the base-unit size of
    /// a swap; claims take their amount from the contract.
    ///
    /// Fatal errors propagate as `Err`; every terminal state of the action
    /// itself is an `Ok` outcome.
    pub async fn execute(&self, kind: ActionKind, amount: u128) -> Result<ExecutionOutcome> {
        let mut attempt = TransactionAttempt::new(kind);

        loop {
            if *self.shutdown.borrow() {
                info!(action = %kind, "Shutdown requested, cancelling action");
                return Ok(ExecutionOutcome::Cancelled);
            }
            attempt.attempts += 1;
            attempt.status = AttemptStatus::Pending;

            let submitted = match kind {
                ActionKind::Claim => self.chain.submit_claim().await,
                ActionKind::Swap => self.venue.submit_swap(amount).await,
            };
            let tx = match submitted {
                Ok(tx) => {
                    info!(action = %kind, tx = %tx, attempt = attempt.attempts, amount, "Transaction submitted");
                    tx
                }
                Err(e) => match e.kind() {
                    ErrorKind::NonRetryable => {
                        warn!(action = %kind, error = %e, "Action not executable, aborting without retry");
                        return Ok(ExecutionOutcome::Aborted {
                            reason: e,
                            attempts: attempt.attempts,
                        });
                    }
                    ErrorKind::Fatal => return Err(e),
                    ErrorKind::Transient => {
                        warn!(action = %kind, error = %e, backoff_secs = self.retry_backoff.as_secs(), "Submission failed, will retry");
                        tokio::time::sleep(self.retry_backoff).await;
                        continue;
                    }
                },
            };

            match self.chain.wait_for_receipt(tx, self.receipt_timeout).await {
                Ok(receipt) if receipt.status == ReceiptStatus::Success => {
                    attempt.status = AttemptStatus::Confirmed;
                    info!(action = %kind, tx = %tx, attempts = attempt.attempts, "Transaction confirmed");
                    return Ok(ExecutionOutcome::Confirmed {
                        tx,
                        attempts: attempt.attempts,
                    });
                }
                Ok(_) => {
                    attempt.status = AttemptStatus::Reverted;
                    warn!(action = %kind, tx = %tx, "Transaction reverted, will retry");
                    tokio::time::sleep(self.retry_backoff).await;
                }
                Err(e) => match e.kind() {
                    ErrorKind::NonRetryable => {
                        warn!(action = %kind, tx = %tx, error = %e, "Aborting after receipt failure");
                        return Ok(ExecutionOutcome::Aborted {
                            reason: e,
                            attempts: attempt.attempts,
                        });
                    }
                    ErrorKind::Fatal => return Err(e),
                    ErrorKind::Transient => {
                        warn!(action = %kind, tx = %tx, error = %e, "Receipt wait failed, resubmitting");
                        tokio::time::sleep(self.retry_backoff).await;
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::mock::MockChain;
    use crate::chain::{ReceiptStatus, TxReceipt};
    use crate::exchange::mock::MockVenue;
    use alloy::primitives::B256;

    fn executor(
        chain: Arc<MockChain>,
        venue: Arc<MockVenue>,
    ) -> (TransactionExecutor<MockChain, MockVenue>, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(false);
        let executor = TransactionExecutor::new(
            chain,
            venue,
            Duration::from_millis(1),
            Duration::from_millis(10),
            rx,
        );
        (executor, tx)
    }

    #[tokio::test]
    async fn insufficient_balance_aborts_without_retry() {
        let chain = Arc::new(MockChain::default());
        let venue = Arc::new(MockVenue::with_output(40_000));
        venue.script_swap(Err(Error::InsufficientBalance("short".into())));
        let (executor, _stop) = executor(chain, venue.clone());

        let outcome = executor.execute(ActionKind::Swap, 1000).await.unwrap();
        match outcome {
            ExecutionOutcome::Aborted { reason, attempts } => {
                assert!(matches!(reason, Error::InsufficientBalance(_)));
                assert_eq!(attempts, 1);
            }
            other => panic!("expected abort, got {other:?}"),
        }
        assert_eq!(venue.swap_calls(), 1);
    }

    #[tokio::test]
    async fn transient_submission_failure_is_retried() {
        let chain = Arc::new(MockChain::default());
        chain.script_claim(Err(Error::Rpc("nonce conflict".into())));
        chain.script_claim(Ok(B256::repeat_byte(1)));
        let (executor, _stop) = executor(chain.clone(), Arc::new(MockVenue::with_output(0)));

        let outcome = executor.execute(ActionKind::Claim, 0).await.unwrap();
        match outcome {
            ExecutionOutcome::Confirmed { tx, attempts } => {
                assert_eq!(tx, B256::repeat_byte(1));
                assert_eq!(attempts, 2);
            }
            other => panic!("expected confirmation, got {other:?}"),
        }
        assert_eq!(chain.claim_calls(), 2);
    }

    #[tokio::test]
    async fn reverted_receipt_resubmits_the_same_action() {
        let chain = Arc::new(MockChain::default());
        let failed = B256::repeat_byte(2);
        chain.script_claim(Ok(failed));
        chain.script_claim(Ok(B256::repeat_byte(3)));
        chain.script_receipt(Ok(TxReceipt {
            tx: failed,
            status: ReceiptStatus::Failure,
        }));
        let (executor, _stop) = executor(chain.clone(), Arc::new(MockVenue::with_output(0)));

        let outcome = executor.execute(ActionKind::Claim, 0).await.unwrap();
        match outcome {
            ExecutionOutcome::Confirmed { tx, attempts } => {
                assert_eq!(tx, B256::repeat_byte(3));
                assert_eq!(attempts, 2);
            }
            other => panic!("expected confirmation, got {other:?}"),
        }
        assert_eq!(chain.receipt_calls(), 2);
    }

    #[tokio::test]
    async fn receipt_timeout_is_retried_as_transient() {
        let chain = Arc::new(MockChain::default());
        chain.script_receipt(Err(Error::ReceiptTimeout("0x02".into())));
        let (executor, _stop) = executor(chain.clone(), Arc::new(MockVenue::with_output(0)));

        let outcome = executor.execute(ActionKind::Claim, 0).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Confirmed { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn shutdown_signal_cancels_before_submission() {
        let chain = Arc::new(MockChain::default());
        let (executor, stop) = executor(chain.clone(), Arc::new(MockVenue::with_output(0)));
        stop.send(true).unwrap();

        let outcome = executor.execute(ActionKind::Claim, 0).await.unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Cancelled));
        assert_eq!(chain.claim_calls(), 0);
    }

    #[tokio::test]
    async fn fatal_error_propagates() {
        let chain = Arc::new(MockChain::default());
        chain.script_claim(Err(Error::Config("bad presale id".into())));
        let (executor, _stop) = executor(chain, Arc::new(MockVenue::with_output(0)));

        let err = executor.execute(ActionKind::Claim, 0).await.unwrap_err();
        assert!(err.is_fatal());
    }
}
