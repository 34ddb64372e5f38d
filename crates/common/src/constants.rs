//! # Protocol & Payout Constants
//!
//! Single source of truth for the chain-level and payout-level constants
//! shared by the distribution pipeline. Other modules reference these
//! instead of redefining them.

// ════════════════════════════════════════════════════════════════════════════════
// TIME
// ════════════════════════════════════════════════════════════════════════════════

/// Seconds in a (non-leap) year. Denominator for per-interval rates.
pub const SECONDS_PER_YEAR: u64 = 31_536_000;

/// Number of whole distribution intervals in a year (integer division).
///
/// Returns 0 when the interval exceeds a year; callers must reject that
/// during configuration validation.
#[must_use]
#[inline]
pub const fn intervals_per_year(interval_secs: u64) -> u64 {
    if interval_secs == 0 {
        0
    } else {
        SECONDS_PER_YEAR / interval_secs
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TRANSACTIONS
// ════════════════════════════════════════════════════════════════════════════════

/// Flat fee attached to every payout transaction, in base units.
pub const MIN_TX_FEE: u64 = 1_000;

/// Width of the validity window: a payout is valid from the round it was
/// built at until this many rounds later.
pub const TX_VALIDITY_ROUNDS: u64 = 1_000;

/// Upper bound on the number of transactions in one atomic group.
pub const MAX_GROUP_SIZE: usize = 16;

// ════════════════════════════════════════════════════════════════════════════════
// NOTES
// ════════════════════════════════════════════════════════════════════════════════

/// Prefix identifying a reward note payload (versioned, JSON-encoded).
pub const NOTE_PREFIX: &str = "rewards/v1:j";

/// Maximum byte length of a transaction note field.
pub const NOTE_MAX_BYTES: usize = 1_000;

// ════════════════════════════════════════════════════════════════════════════════
// INDEXER
// ════════════════════════════════════════════════════════════════════════════════

/// Page size requested from the indexer when listing asset balances.
pub const INDEXER_PAGE_LIMIT: u64 = 1_000;

/// How many recent outgoing transactions are inspected when classifying
/// an account. One is sufficient: the signature shape of the most recent
/// outgoing transaction decides the class.
pub const TXN_SEARCH_LIMIT: u64 = 1;

// ════════════════════════════════════════════════════════════════════════════════
// ADDRESSES
// ════════════════════════════════════════════════════════════════════════════════

/// Encoded form of the all-zero public key. Assets whose reserve is unset
/// on-chain report this sentinel; the creator account stands in for it.
pub const ZERO_ADDRESS: &str =
    "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAY5HFKQ";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_per_year_daily() {
        assert_eq!(intervals_per_year(86_400), 365);
    }

    #[test]
    fn intervals_per_year_hourly() {
        assert_eq!(intervals_per_year(3_600), 8_760);
    }

    #[test]
    fn intervals_per_year_guards_zero() {
        assert_eq!(intervals_per_year(0), 0);
        assert_eq!(intervals_per_year(SECONDS_PER_YEAR + 1), 0);
    }
}
