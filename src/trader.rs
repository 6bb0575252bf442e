//! Trading loop
//!
//! The top-level scheduler: each iteration snapshots chain state, asks the
//! vesting accountant and the decision engine what to do, drives the
//! executor, then sleeps. One second after a completed cycle, five after
//! an error or a wait decision. Nothing here caches across iterations;
//! the next cycle re-reads everything from chain.

use crate::chain::ChainClient;
use crate::decision::{decide, Action, ThresholdTable};
use crate::exchange::ExchangeVenue;
use crate::executor::{ActionKind, ExecutionOutcome, TransactionExecutor};
use crate::vesting::compute_claimable;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// How an iteration ended; decides the sleep before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// An action ran to a terminal state.
    Acted,
    /// Nothing to do at the current price or vesting position.
    Waited,
}

pub struct Trader<C, V> {
    chain: Arc<C>,
    venue: Arc<V>,
    executor: TransactionExecutor<C, V>,
    thresholds: ThresholdTable,
    tranche_size: u128,
    /// One whole input token in base units; the quote probe size.
    unit_amount: u128,
    poll_interval: Duration,
    error_backoff: Duration,
    dry_run: bool,
    shutdown: watch::Receiver<bool>,
}

impl<C: ChainClient, V: ExchangeVenue> Trader<C, V> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: Arc<C>,
        venue: Arc<V>,
        thresholds: ThresholdTable,
        tranche_size: u128,
        unit_amount: u128,
        intervals: &crate::config::IntervalsConfig,
        dry_run: bool,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let executor = TransactionExecutor::new(
            chain.clone(),
            venue.clone(),
            Duration::from_secs(intervals.retry_backoff_secs),
            Duration::from_secs(intervals.receipt_timeout_secs),
            shutdown.clone(),
        );
        Self {
            chain,
            venue,
            executor,
            thresholds,
            tranche_size,
            unit_amount,
            poll_interval: Duration::from_secs(intervals.poll_secs),
            error_backoff: Duration::from_secs(intervals.error_backoff_secs),
            dry_run,
            shutdown,
        }
    }

    /// Run until the shutdown signal is observed. Fatal errors stop the
    /// loop; everything else is logged and retried after backoff.
    pub async fn run(&self) -> Result<()> {
        info!(
            tranche_size = self.tranche_size,
            tranches = self.thresholds.len(),
            dry_run = self.dry_run,
            "Starting trading loop"
        );

        loop {
            if *self.shutdown.borrow() {
                info!("Shutdown requested, stopping after current iteration");
                return Ok(());
            }

            let started = chrono::Utc::now();
            let sleep = match self.cycle().await {
                Ok(CycleOutcome::Acted) => self.poll_interval,
                Ok(CycleOutcome::Waited) => self.error_backoff,
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Unrecoverable error, stopping");
                    return Err(e);
                }
                Err(e) => {
                    warn!(error = %e, "Cycle failed, backing off");
                    self.error_backoff
                }
            };
            debug!(
                elapsed_ms = (chrono::Utc::now() - started).num_milliseconds(),
                sleep_secs = sleep.as_secs(),
                "Cycle complete"
            );
            tokio::time::sleep(sleep).await;
        }
    }

    /// One iteration: snapshot, decide, execute.
    pub async fn cycle(&self) -> Result<CycleOutcome> {
        if !self.chain.is_connected().await {
            return Err(Error::Rpc("chain connection is not live".to_string()));
        }

        let quote = self.venue.quote(self.unit_amount).await?;
        let schedule = self.chain.vesting_schedule().await?;
        let claim_state = self.chain.claim_state().await?;
        let now = self.chain.current_time().await?;
        let balance = self.chain.wallet_balance().await?;

        let claimable = compute_claimable(&schedule, &claim_state, now);
        info!(
            price = quote.price(),
            balance,
            claimed = claim_state.claimed_amount,
            claimable = claimable.amount,
            claim_eligible = claimable.eligible,
            "Cycle snapshot"
        );

        let action = decide(
            &quote,
            &self.thresholds,
            &claim_state,
            balance,
            self.tranche_size,
            claimable.eligible,
        )?;

        if action == Action::None {
            debug!("Holding this cycle");
            return Ok(CycleOutcome::Waited);
        }

        if self.dry_run {
            info!(action = ?action, "Dry run, skipping execution");
            return Ok(CycleOutcome::Acted);
        }

        if action.includes_claim() {
            info!(amount = claimable.amount, "Dispatching claim");
            match self.executor.execute(ActionKind::Claim, claimable.amount).await? {
                ExecutionOutcome::Confirmed { .. } => {}
                ExecutionOutcome::Aborted { reason, .. } => {
                    warn!(error = %reason, "Claim aborted this cycle");
                    return Ok(CycleOutcome::Waited);
                }
                ExecutionOutcome::Cancelled => return Ok(CycleOutcome::Waited),
            }
        }

        if action.includes_swap() {
            info!(
                amount = self.tranche_size,
                price = quote.price(),
                "Dispatching swap"
            );
            match self.executor.execute(ActionKind::Swap, self.tranche_size).await? {
                ExecutionOutcome::Confirmed { .. } => {}
                ExecutionOutcome::Aborted { reason, .. } => {
                    warn!(error = %reason, "Swap aborted this cycle");
                    return Ok(CycleOutcome::Waited);
                }
                ExecutionOutcome::Cancelled => return Ok(CycleOutcome::Waited),
            }
        }

        Ok(CycleOutcome::Acted)
    }
}
