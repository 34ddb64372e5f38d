//! # asb-bot — LP Staking Reward Distribution
//!
//! Periodically weighs LP-token holdings against each pool's reserve,
//! filters out program-controlled holders, computes compounding
//! per-interval rewards, and pays them from the dispenser account in
//! atomic transaction pages.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   DistributionScheduler                      │
//! │         one round per interval bucket, per pool asset        │
//! ├──────────────────────────────────────────────────────────────┤
//! │                                                              │
//! │  ┌───────────────┐    ┌─────────────────┐    ┌────────────┐  │
//! │  │ BalanceSource │───▶│ ReserveWeighter │───▶│ admission  │  │
//! │  │ paced pages   │    │ LP ─→ effective │    │ min/excl.  │  │
//! │  └───────┬───────┘    └─────────────────┘    └─────┬──────┘  │
//! │          │                                         ▼         │
//! │          │            ┌───────────────────────────────────┐  │
//! │          └───────────▶│ AccountClassifier (cache + retry) │  │
//! │                       └─────────────────┬─────────────────┘  │
//! │                                         ▼                    │
//! │  ┌──────────────────┐    ┌────────────────────────────────┐  │
//! │  │ RewardCalculator │───▶│ RewardLedger (merged per pool) │  │
//! │  └──────────────────┘    └───────────────┬────────────────┘  │
//! │                                          ▼                   │
//! │                       ┌──────────────────────────────────┐   │
//! │                       │ PayoutBatcher (signed pages)     │   │
//! │                       └──────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **One logical thread**: every fetch, classification, and payout in
//!   a round runs sequentially, respecting indexer rate limits; the
//!   caches need no locking.
//! - **Degrade, never die**: a failing pool contributes zero rewards, a
//!   failing page skips to the next page; only startup configuration
//!   errors are fatal.
//! - **Conservative classification**: any doubt about whether an
//!   address is program-controlled excludes it from payout. A missed
//!   payout recovers next round; a payment into a program does not.

pub mod balance_source;
pub mod batcher;
pub mod calculator;
pub mod classifier;
pub mod ledger;
pub mod scheduler;
pub mod shutdown;
pub mod weighter;

pub use balance_source::{BalanceSource, HolderBalance, SourceError};
pub use batcher::{PageOutcome, PayError, PayoutBatcher};
pub use calculator::{compute_rewards, rate_per_interval, CalcError};
pub use classifier::AccountClassifier;
pub use ledger::{NoteRecord, PoolRewards, RewardLedger};
pub use scheduler::{DistributionScheduler, RoundOutcome};
pub use shutdown::ShutdownToken;
pub use weighter::{ReserveWeighter, WeightError};
