//! # ReserveWeighter — LP Share Translation
//!
//! An LP token is a claim on a pool, not the staked asset itself. To
//! reward LP holders fairly, their LP balances are translated into the
//! share of the pool reserve's actual staking-asset holding they
//! represent:
//!
//! ```text
//! weighted(holder) = round( pool_amount × lp_amount / Σ lp_amounts )
//! ```
//!
//! computed in decimal arithmetic with midpoint-away-from-zero
//! rounding, so `Σ weighted` stays within half a base unit per holder
//! of the reserve's real holding.
//!
//! Pools whose reserve field carries the all-zero placeholder address
//! publish the true reserve as the asset creator instead; the weighter
//! follows that convention.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::debug;

use asb_common::constants::ZERO_ADDRESS;
use asb_common::Address;

use crate::balance_source::{BalanceSource, HolderBalance, SourceError};

// ════════════════════════════════════════════════════════════════════════════════
// ERRORS
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WeightError {
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The reserve holds none of the staking asset; weights would be
    /// meaningless, so the pool contributes nothing this round.
    #[error("reserve {reserve} holds no balance of asset {asset}")]
    ReserveNotHolding { reserve: Address, asset: u64 },
    #[error("weighting arithmetic overflowed for pool asset {0}")]
    ValueOverflow(u64),
}

// ════════════════════════════════════════════════════════════════════════════════
// WEIGHTER
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
pub struct ReserveWeighter {
    staking_asset: u64,
}

impl ReserveWeighter {
    #[must_use]
    pub fn new(staking_asset: u64) -> Self {
        Self { staking_asset }
    }

    /// Translates LP balances of `pool_asset` into effective
    /// staking-asset amounts backed by the pool reserve.
    ///
    /// Frozen, zero, below-minimum, and reserve-owned LP balances are
    /// dropped before weighting; holders whose weighted amount rounds
    /// to zero are dropped after.
    pub async fn weigh_pool(
        &self,
        source: &mut BalanceSource,
        pool_asset: u64,
        min_balance: u64,
    ) -> Result<Vec<HolderBalance>, WeightError> {
        let info = source.asset_info(pool_asset).await?;
        let reserve = match info.reserve {
            Some(ref r) if r.as_str() != ZERO_ADDRESS => r.clone(),
            _ => info.creator.clone(),
        };

        let holders: Vec<HolderBalance> = source
            .list_balances(pool_asset)
            .await?
            .into_iter()
            .filter(|b| {
                !b.frozen && b.amount > 0 && b.amount >= min_balance && b.address != reserve
            })
            .collect();

        // The reserve's own staking-asset holding is what the LP shares
        // are worth in total.
        let pool_amount = source
            .list_balances(self.staking_asset)
            .await?
            .into_iter()
            .find(|b| b.address == reserve)
            .map(|b| b.amount)
            .ok_or_else(|| WeightError::ReserveNotHolding {
                reserve: reserve.clone(),
                asset: self.staking_asset,
            })?;

        let lp_sum: u128 = holders.iter().map(|b| u128::from(b.amount)).sum();
        if lp_sum == 0 {
            return Ok(Vec::new());
        }

        debug!(
            pool_asset,
            holders = holders.len(),
            pool_amount,
            "weighting LP balances against reserve holding"
        );

        let lp_sum =
            Decimal::from_u128(lp_sum).ok_or(WeightError::ValueOverflow(pool_asset))?;
        let pool = Decimal::from(pool_amount);

        let mut weighted = Vec::with_capacity(holders.len());
        for holder in holders {
            let amount = pool
                .checked_mul(Decimal::from(holder.amount))
                .and_then(|v| v.checked_div(lp_sum))
                .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
                .and_then(|v| v.to_u64())
                .ok_or(WeightError::ValueOverflow(pool_asset))?;
            if amount == 0 {
                continue;
            }
            weighted.push(HolderBalance { amount, ..holder });
        }
        Ok(weighted)
    }

    /// Pool-less mode: staking-asset balances are used directly, with
    /// the same frozen/zero/minimum filters but no reserve lookup.
    pub async fn direct_balances(
        &self,
        source: &mut BalanceSource,
        min_balance: u64,
    ) -> Result<Vec<HolderBalance>, WeightError> {
        let holders = source
            .list_balances(self.staking_asset)
            .await?
            .into_iter()
            .filter(|b| !b.frozen && b.amount > 0 && b.amount >= min_balance)
            .collect();
        Ok(holders)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
