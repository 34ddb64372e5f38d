//! # DistributionScheduler — Interval Loop
//!
//! The root of the pipeline. Wall-clock time is divided into buckets
//! of `interval_secs`, shifted by `offset_secs`; crossing into a new
//! bucket triggers one distribution round:
//!
//! ```text
//! params ─→ per pool asset: weigh ─→ admit ─→ classify ─→ reward
//!                                   └────────── merge ──────────┘
//!                                                 │
//!                                        ledger ─→ pay (pages)
//! ```
//!
//! One round per boundary, never a retry within the same bucket. A
//! failing pool contributes nothing and the round carries on; only a
//! missing parameter fetch skips the round whole. Cancellation is
//! honored between pools and before payment, never mid-page.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use asb_common::{Address, AlgodApi, PoolConfig, StakingConfig};

use crate::balance_source::{BalanceSource, HolderBalance, SourceError};
use crate::batcher::{PageOutcome, PayoutBatcher};
use crate::calculator::{compute_rewards, rate_per_interval, CalcError};
use crate::classifier::AccountClassifier;
use crate::ledger::{PoolRewards, RewardLedger};
use crate::shutdown::ShutdownToken;
use crate::weighter::{ReserveWeighter, WeightError};

/// Granularity of the idle wait between buckets.
const IDLE_POLL: Duration = Duration::from_secs(1);

// ════════════════════════════════════════════════════════════════════════════════
// ERRORS
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error, PartialEq)]
enum PoolRoundError {
    #[error(transparent)]
    Weight(#[from] WeightError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Calc(#[from] CalcError),
}

impl PoolRoundError {
    fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Self::Source(SourceError::Cancelled)
                | Self::Weight(WeightError::Source(SourceError::Cancelled))
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// OUTCOMES
// ════════════════════════════════════════════════════════════════════════════════

/// What one triggered round amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Network parameters were unavailable; nothing was attempted.
    Skipped,
    /// Shutdown was requested before payment started.
    Cancelled,
    /// The round reached payment; one entry per attempted page.
    Paid(Vec<PageOutcome>),
}

// ════════════════════════════════════════════════════════════════════════════════
// SCHEDULER
// ════════════════════════════════════════════════════════════════════════════════

pub struct DistributionScheduler {
    staking_asset: u64,
    interval_secs: u64,
    offset_secs: u64,
    pools: Vec<PoolConfig>,
    excluded: HashSet<Address>,
    source: BalanceSource,
    classifier: AccountClassifier,
    weighter: ReserveWeighter,
    batcher: PayoutBatcher,
    algod: Arc<dyn AlgodApi>,
    shutdown: ShutdownToken,
    last_bucket: Option<u64>,
}

impl DistributionScheduler {
    #[must_use]
    pub fn new(
        staking: &StakingConfig,
        source: BalanceSource,
        batcher: PayoutBatcher,
        algod: Arc<dyn AlgodApi>,
        shutdown: ShutdownToken,
    ) -> Self {
        Self {
            staking_asset: staking.asset_id,
            interval_secs: staking.interval_secs,
            offset_secs: staking.offset_secs,
            pools: staking.effective_pools(),
            excluded: staking.excluded_accounts.iter().cloned().collect(),
            source,
            classifier: AccountClassifier::new(
                staking.known_logicsig_accounts.iter().cloned(),
                staking.known_non_logicsig_accounts.iter().cloned(),
            ),
            weighter: ReserveWeighter::new(staking.asset_id),
            batcher,
            algod,
            shutdown,
            last_bucket: None,
        }
    }

    /// Runs until shutdown. The bucket current at startup is recorded
    /// as already handled, so the first round fires at the next
    /// boundary, not immediately.
    pub async fn run(&mut self) {
        let start = bucket(unix_now(), self.interval_secs, self.offset_secs);
        self.last_bucket = Some(start);
        info!(
            staking_asset = self.staking_asset,
            interval_secs = self.interval_secs,
            offset_secs = self.offset_secs,
            pools = self.pools.len(),
            bucket = start,
            "distribution loop started"
        );

        loop {
            if self.shutdown.is_requested() {
                break;
            }
            let current = bucket(unix_now(), self.interval_secs, self.offset_secs);
            if Some(current) <= self.last_bucket {
                if !self.shutdown.sleep(IDLE_POLL).await {
                    break;
                }
                continue;
            }

            info!(bucket = current, "interval boundary crossed, starting round");
            match self.run_round().await {
                RoundOutcome::Cancelled => break,
                RoundOutcome::Skipped => {}
                RoundOutcome::Paid(outcomes) => {
                    let submitted = outcomes.iter().filter(|o| o.tx_id.is_some()).count();
                    info!(pages = outcomes.len(), submitted, "distribution round complete");
                }
            }
            // Buckets crossed while the round ran are deliberately
            // swallowed; the next round waits for a fresh boundary.
            self.last_bucket = Some(bucket(unix_now(), self.interval_secs, self.offset_secs));
        }
        info!("distribution loop stopped");
    }

    /// One full round: parameters, every pool of every config entry,
    /// then payment of the merged ledger.
    pub async fn run_round(&mut self) -> RoundOutcome {
        let params = match self.algod.transaction_params().await {
            Ok(params) => params,
            Err(error) => {
                error!(%error, "network parameters unavailable, skipping round");
                return RoundOutcome::Skipped;
            }
        };

        let mut ledger = RewardLedger::new();
        let pools = self.pools.clone();
        for pool_cfg in &pools {
            let weighting = !pool_cfg.pool_assets.is_empty();
            let assets = if weighting {
                pool_cfg.pool_assets.clone()
            } else {
                vec![self.staking_asset]
            };
            for pool_asset in assets {
                if self.shutdown.is_requested() {
                    info!("shutdown requested, abandoning round before payment");
                    return RoundOutcome::Cancelled;
                }
                match self.pool_round(pool_asset, pool_cfg, weighting).await {
                    Ok(rewards) => {
                        if rewards.is_empty() {
                            warn!(pool_asset, "pool asset does not have any rewards");
                        }
                        ledger.merge(rewards);
                    }
                    Err(error) if error.is_cancelled() => {
                        info!("shutdown requested, abandoning round before payment");
                        return RoundOutcome::Cancelled;
                    }
                    Err(error) => {
                        error!(pool_asset, %error, "pool round failed, contributing no rewards");
                    }
                }
            }
        }

        if ledger.total() == 0 {
            warn!("no rewards to pay this round");
            return RoundOutcome::Paid(Vec::new());
        }
        if self.shutdown.is_requested() {
            info!("shutdown requested, abandoning round before payment");
            return RoundOutcome::Cancelled;
        }
        RoundOutcome::Paid(self.batcher.pay(&ledger, &params).await)
    }

    /// Weighs, admits, classifies, and rewards one pool asset.
    async fn pool_round(
        &mut self,
        pool_asset: u64,
        pool_cfg: &PoolConfig,
        weighting: bool,
    ) -> Result<PoolRewards, PoolRoundError> {
        let balances = if weighting {
            self.weighter
                .weigh_pool(&mut self.source, pool_asset, pool_cfg.min_balance)
                .await?
        } else {
            self.weighter
                .direct_balances(&mut self.source, pool_cfg.min_balance)
                .await?
        };

        let admitted: Vec<HolderBalance> = balances
            .into_iter()
            .filter(|b| b.amount >= pool_cfg.min_balance && !self.excluded.contains(&b.address))
            .collect();

        let addresses: Vec<Address> = admitted.iter().map(|b| b.address.clone()).collect();
        let verdicts = self.classifier.classify(&mut self.source, &addresses).await?;
        let eligible: Vec<HolderBalance> = admitted
            .into_iter()
            .filter(|b| verdicts.get(&b.address) == Some(&false))
            .collect();

        debug!(pool_asset, eligible = eligible.len(), "computing rewards");
        let rate = rate_per_interval(pool_cfg.annual_rate_percent, self.interval_secs)?;
        Ok(compute_rewards(
            &eligible,
            pool_cfg.max_balance,
            pool_cfg.annual_rate_percent,
            rate,
        )?)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// CLOCK
// ════════════════════════════════════════════════════════════════════════════════

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Which interval bucket `now_secs` falls in.
fn bucket(now_secs: u64, interval_secs: u64, offset_secs: u64) -> u64 {
    if interval_secs == 0 {
        return 0;
    }
    now_secs.saturating_add(offset_secs) / interval_secs
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
