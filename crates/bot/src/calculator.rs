//! # RewardCalculator — Compounding Interest Math
//!
//! Converts a configured annual percentage into a per-interval
//! compounding rate and applies it to effective balances:
//!
//! ```text
//! rate = (1 + annual/100) ^ (1 / intervals_per_year) - 1
//! reward = round(min(amount, max_balance) × rate)
//! ```
//!
//! The root is taken in f64 (`Decimal` carries no exponentiation), the
//! per-balance multiply and round in `Decimal`. The f64 stage limits
//! the rate to ~15 significant digits; the Decimal stage keeps the
//! final rounding exact, so the per-interval rate is stable to at
//! least 10 decimal places and base-unit rewards never drift.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use asb_common::constants::intervals_per_year;
use asb_common::Address;

use crate::balance_source::HolderBalance;
use crate::ledger::{NoteRecord, PoolRewards};

// ════════════════════════════════════════════════════════════════════════════════
// ERRORS
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CalcError {
    #[error("cannot derive a per-interval rate from {annual_percent}% over {interval_secs}s")]
    InvalidRate {
        annual_percent: f64,
        interval_secs: u64,
    },
    #[error("reward for {address} overflowed during computation")]
    RewardOverflow { address: Address },
}

// ════════════════════════════════════════════════════════════════════════════════
// RATE
// ════════════════════════════════════════════════════════════════════════════════

/// Per-interval compounding rate for an annual percentage.
///
/// Rejects non-finite or non-positive rates and intervals that do not
/// fit a year at least once.
pub fn rate_per_interval(annual_percent: f64, interval_secs: u64) -> Result<Decimal, CalcError> {
    let invalid = || CalcError::InvalidRate {
        annual_percent,
        interval_secs,
    };

    if !annual_percent.is_finite() || annual_percent <= 0.0 {
        return Err(invalid());
    }
    let intervals = intervals_per_year(interval_secs);
    if intervals == 0 {
        return Err(invalid());
    }

    let annual_fraction = annual_percent / 100.0;
    let rate = (1.0 + annual_fraction).powf(1.0 / intervals as f64) - 1.0;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(invalid());
    }
    Decimal::from_f64(rate).ok_or_else(invalid)
}

// ════════════════════════════════════════════════════════════════════════════════
// REWARDS
// ════════════════════════════════════════════════════════════════════════════════

/// Applies `rate` to each balance, capped at `max_balance`, and emits
/// one audit note per balance.
///
/// Zero rewards stay in the result so their notes survive aggregation
/// with other pools; the payout step drops addresses whose round total
/// is zero.
pub fn compute_rewards(
    balances: &[HolderBalance],
    max_balance: u64,
    annual_percent: f64,
    rate: Decimal,
) -> Result<PoolRewards, CalcError> {
    let mut pool = PoolRewards::default();
    for balance in balances {
        let effective = balance.amount.min(max_balance);
        let reward = Decimal::from(effective)
            .checked_mul(rate)
            .map(|v| v.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
            .and_then(|v| v.to_u64())
            .ok_or_else(|| CalcError::RewardOverflow {
                address: balance.address.clone(),
            })?;

        let entry = pool.rewards.entry(balance.address.clone()).or_insert(0);
        *entry = entry.saturating_add(reward);
        pool.notes
            .entry(balance.address.clone())
            .or_default()
            .push(NoteRecord {
                pool_asset_id: balance.asset_id,
                real_balance: effective,
                apy: annual_percent,
                res: reward,
            });
    }
    Ok(pool)
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    // ── Helpers ──

    fn addr(byte: u8) -> Address {
        Address::from_public_key(&[byte; 32])
    }

    fn balance(byte: u8, amount: u64) -> HolderBalance {
        HolderBalance {
            address: addr(byte),
            asset_id: 77,
            amount,
            frozen: false,
        }
    }

    // ── Rate ──

    #[test]
    fn hourly_rate_for_ten_percent_matches_published_value() {
        let rate = rate_per_interval(10.0, 3_600).unwrap_or_else(|e| panic!("rate: {}", e));
        let expected: Decimal = "0.0000108802".parse().unwrap_or_else(|e| panic!("parse: {}", e));
        assert_eq!(rate.round_dp(10), expected);
    }

    #[test]
    fn rate_compounds_back_to_the_annual_rate() {
        let interval_secs = 86_400u64;
        let rate = rate_per_interval(10.0, interval_secs).unwrap_or_else(|e| panic!("rate: {}", e));
        let rate = rate.to_f64().unwrap_or_else(|| panic!("rate out of f64 range"));

        let intervals = intervals_per_year(interval_secs);
        let compounded = (1.0 + rate).powi(intervals as i32) - 1.0;
        assert!((compounded - 0.10).abs() < 1e-9, "compounded to {}", compounded);
    }

    #[test]
    fn longer_intervals_carry_higher_rates() {
        let hourly = rate_per_interval(10.0, 3_600).unwrap_or_else(|e| panic!("rate: {}", e));
        let daily = rate_per_interval(10.0, 86_400).unwrap_or_else(|e| panic!("rate: {}", e));
        assert!(daily > hourly);
    }

    #[test]
    fn rejects_unusable_rates_and_intervals() {
        assert!(rate_per_interval(0.0, 3_600).is_err());
        assert!(rate_per_interval(-5.0, 3_600).is_err());
        assert!(rate_per_interval(f64::NAN, 3_600).is_err());
        assert!(rate_per_interval(f64::INFINITY, 3_600).is_err());
        assert!(rate_per_interval(10.0, 0).is_err());
        // Interval longer than a year: intervals_per_year truncates to 0.
        assert!(rate_per_interval(10.0, 40_000_000).is_err());
    }

    // ── Rewards ──

    #[test]
    fn caps_effective_balance_before_applying_rate() {
        let rate = Decimal::new(1, 1); // 0.1
        let pool = compute_rewards(&[balance(1, 2_000)], 1_000, 10.0, rate)
            .unwrap_or_else(|e| panic!("rewards: {}", e));

        assert_eq!(pool.rewards.get(&addr(1)), Some(&100));
        let notes = &pool.notes[&addr(1)];
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].real_balance, 1_000);
        assert_eq!(notes[0].res, 100);
        assert_eq!(notes[0].pool_asset_id, 77);
    }

    #[test]
    fn reward_midpoints_round_away_from_zero() {
        let rate = Decimal::new(1, 1); // 0.1
        let pool = compute_rewards(&[balance(1, 25)], 1_000, 10.0, rate)
            .unwrap_or_else(|e| panic!("rewards: {}", e));

        // 25 × 0.1 = 2.5 rounds to 3.
        assert_eq!(pool.rewards.get(&addr(1)), Some(&3));
    }

    #[test]
    fn zero_rewards_keep_their_audit_note() {
        let rate = Decimal::new(1, 1); // 0.1
        let pool = compute_rewards(&[balance(1, 3)], 1_000, 10.0, rate)
            .unwrap_or_else(|e| panic!("rewards: {}", e));

        assert_eq!(pool.rewards.get(&addr(1)), Some(&0));
        assert_eq!(pool.notes[&addr(1)][0].res, 0);
    }

    #[test]
    fn rewards_stay_proportional_to_balances() {
        let rate = rate_per_interval(10.0, 86_400).unwrap_or_else(|e| panic!("rate: {}", e));
        let balances = [balance(1, 250_000_000), balance(2, 750_000_000)];
        let pool = compute_rewards(&balances, u64::MAX, 10.0, rate)
            .unwrap_or_else(|e| panic!("rewards: {}", e));

        let a = pool.rewards[&addr(1)];
        let b = pool.rewards[&addr(2)];
        assert!(a > 0);
        // A 1:3 balance split pays out 1:3, up to rounding.
        assert!(b.abs_diff(3 * a) <= 2, "rewards {} and {} not 1:3", a, b);
    }

    #[test]
    fn identical_inputs_produce_identical_outputs() {
        let rate = rate_per_interval(7.5, 3_600).unwrap_or_else(|e| panic!("rate: {}", e));
        let balances = [balance(1, 123_456), balance(2, 999_999_999)];

        let first = compute_rewards(&balances, 500_000_000, 7.5, rate)
            .unwrap_or_else(|e| panic!("rewards: {}", e));
        let second = compute_rewards(&balances, 500_000_000, 7.5, rate)
            .unwrap_or_else(|e| panic!("rewards: {}", e));

        assert_eq!(first, second);
    }
}
