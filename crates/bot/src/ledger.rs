//! # RewardLedger — Round-Scoped Accumulation
//!
//! One ledger is created per distribution round and thrown away after
//! payment. Pools contribute [`PoolRewards`]; merging sums amounts per
//! address (never overwrites) and appends audit notes, so a holder
//! staking in several pools receives exactly one payout whose note
//! explains every contribution.
//!
//! [`NoteRecord`] is the audit entry embedded in the payout
//! transaction's note field. Its JSON keys are part of the published
//! `rewards/v1:j` note format and must not change; readers of historic
//! notes depend on them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use asb_common::Address;

// ════════════════════════════════════════════════════════════════════════════════
// NOTE RECORD
// ════════════════════════════════════════════════════════════════════════════════

/// One audit entry: which pool, what effective balance, at what rate,
/// and the resulting reward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteRecord {
    /// Asset the balance was held in (the staking asset itself in
    /// pool-less mode).
    #[serde(rename = "PoolAssetId")]
    pub pool_asset_id: u64,
    /// Effective balance the reward was computed from, after capping.
    #[serde(rename = "RealBalance")]
    pub real_balance: u64,
    /// Annual rate in percent, as configured.
    #[serde(rename = "APY")]
    pub apy: f64,
    /// Reward in base units.
    #[serde(rename = "Res")]
    pub res: u64,
}

// ════════════════════════════════════════════════════════════════════════════════
// POOL REWARDS
// ════════════════════════════════════════════════════════════════════════════════

/// One pool asset's contribution to the round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PoolRewards {
    pub rewards: BTreeMap<Address, u64>,
    pub notes: BTreeMap<Address, Vec<NoteRecord>>,
}

impl PoolRewards {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// LEDGER
// ════════════════════════════════════════════════════════════════════════════════

/// Accumulated rewards and notes for one round.
#[derive(Debug, Clone, Default)]
pub struct RewardLedger {
    rewards: BTreeMap<Address, u64>,
    notes: BTreeMap<Address, Vec<NoteRecord>>,
}

impl RewardLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one pool's contribution in: amounts add up, notes append.
    pub fn merge(&mut self, pool: PoolRewards) {
        for (address, amount) in pool.rewards {
            let entry = self.rewards.entry(address).or_insert(0);
            *entry = entry.saturating_add(amount);
        }
        for (address, mut records) in pool.notes {
            self.notes.entry(address).or_default().append(&mut records);
        }
    }

    /// Per-address rewards, deterministically ordered.
    #[must_use]
    pub fn rewards(&self) -> &BTreeMap<Address, u64> {
        &self.rewards
    }

    /// Audit notes for one address; empty when it earned nothing.
    #[must_use]
    pub fn notes_for(&self, address: &Address) -> &[NoteRecord] {
        self.notes.get(address).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Number of addresses with a ledger entry (zero-reward entries
    /// included; the payout step filters those).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Sum of all rewards in base units.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.rewards.values().fold(0u64, |acc, r| acc.saturating_add(*r))
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(byte: u8) -> Address {
        Address::from_public_key(&[byte; 32])
    }

    fn note(pool_asset_id: u64, res: u64) -> NoteRecord {
        NoteRecord {
            pool_asset_id,
            real_balance: 1_000,
            apy: 10.0,
            res,
        }
    }

    fn pool(entries: &[(u8, u64)], pool_asset_id: u64) -> PoolRewards {
        let mut rewards = BTreeMap::new();
        let mut notes: BTreeMap<Address, Vec<NoteRecord>> = BTreeMap::new();
        for &(byte, amount) in entries {
            rewards.insert(addr(byte), amount);
            notes.entry(addr(byte)).or_default().push(note(pool_asset_id, amount));
        }
        PoolRewards { rewards, notes }
    }

    #[test]
    fn merge_sums_amounts_per_address() {
        let mut ledger = RewardLedger::new();
        ledger.merge(pool(&[(1, 100), (2, 50)], 77));
        ledger.merge(pool(&[(1, 25)], 88));

        assert_eq!(ledger.rewards().get(&addr(1)), Some(&125));
        assert_eq!(ledger.rewards().get(&addr(2)), Some(&50));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.total(), 175);
    }

    #[test]
    fn merge_appends_notes() {
        let mut ledger = RewardLedger::new();
        ledger.merge(pool(&[(1, 100)], 77));
        ledger.merge(pool(&[(1, 25)], 88));

        let notes = ledger.notes_for(&addr(1));
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].pool_asset_id, 77);
        assert_eq!(notes[1].pool_asset_id, 88);
    }

    #[test]
    fn merge_order_does_not_matter() {
        let a = pool(&[(1, 100), (2, 50)], 77);
        let b = pool(&[(1, 25), (3, 7)], 88);

        let mut forward = RewardLedger::new();
        forward.merge(a.clone());
        forward.merge(b.clone());

        let mut backward = RewardLedger::new();
        backward.merge(b);
        backward.merge(a);

        assert_eq!(forward.rewards(), backward.rewards());
        assert_eq!(forward.total(), backward.total());
    }

    #[test]
    fn empty_ledger_reports_empty() {
        let ledger = RewardLedger::new();
        assert!(ledger.is_empty());
        assert_eq!(ledger.len(), 0);
        assert_eq!(ledger.total(), 0);
        assert!(ledger.notes_for(&addr(9)).is_empty());
    }

    #[test]
    fn note_record_uses_published_keys() {
        let json = serde_json::to_string(&note(77, 42)).unwrap_or_else(|e| panic!("json: {}", e));
        assert!(json.contains("\"PoolAssetId\":77"));
        assert!(json.contains("\"RealBalance\":1000"));
        assert!(json.contains("\"APY\":10.0"));
        assert!(json.contains("\"Res\":42"));
    }
}
