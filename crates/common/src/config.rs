//! # Configuration
//!
//! TOML-backed configuration for the distribution service. The layout
//! mirrors how deployments are actually described: node and indexer
//! endpoints, then one `[staking]` table carrying the schedule, the
//! dispenser credential, and the pool list.
//!
//! Two pool layouts are accepted and merged by [`StakingConfig::effective_pools`]:
//! the `[[staking.pools]]` list, plus the older flat fields
//! (`pool_assets`, `min_balance`, `max_balance`, `annual_rate_percent`)
//! directly on `[staking]`, which count as one more pool when the flat
//! rate is positive. Existing deployments keep working unchanged.
//!
//! `validate()` is called once at startup and is fatal: a service that
//! signs real transactions must not come up on a half-usable config.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::address::Address;
use crate::constants::{MAX_GROUP_SIZE, SECONDS_PER_YEAR};
use crate::keys::DispenserAccount;

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {message}")]
    Read { path: String, message: String },
    #[error("cannot parse config file {path}: {message}")]
    Parse { path: String, message: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ════════════════════════════════════════════════════════════════════════════════
// SECTIONS
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub algod: AlgodConfig,
    pub indexer: IndexerConfig,
    pub staking: StakingConfig,
}

/// Node (write-side) endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AlgodConfig {
    pub host: String,
    #[serde(default = "default_algod_header")]
    pub auth_header: String,
    #[serde(default)]
    pub token: String,
}

/// Indexer (read-side) endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    pub host: String,
    #[serde(default = "default_indexer_header")]
    pub auth_header: String,
    #[serde(default)]
    pub token: String,
    /// Pause before every indexer request, in milliseconds. Public
    /// indexers rate-limit aggressively; 0 disables pacing.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// The distribution schedule, dispenser credential, and pool list.
#[derive(Debug, Clone, Deserialize)]
pub struct StakingConfig {
    /// Asset rewards are paid in (and staked in, for pool-less pools).
    pub asset_id: u64,
    /// Distribution interval in seconds.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Shift applied to the clock before bucketing, so rounds fire a
    /// little past the wall-clock boundary.
    #[serde(default = "default_offset_secs")]
    pub offset_secs: u64,
    /// Hex-encoded 32-byte Ed25519 seed of the dispenser account.
    pub dispenser_seed: String,
    /// Recipients per atomic payout group.
    #[serde(default = "default_payout_page_size")]
    pub payout_page_size: usize,
    /// Addresses never paid, regardless of holdings.
    #[serde(default)]
    pub excluded_accounts: Vec<Address>,
    /// Addresses known to be program-controlled; skips their lookup.
    #[serde(default)]
    pub known_logicsig_accounts: Vec<Address>,
    /// Addresses known to be key-controlled; skips their lookup.
    #[serde(default)]
    pub known_non_logicsig_accounts: Vec<Address>,

    // Flat single-pool fields (older layout); active iff the rate is
    // positive. See effective_pools().
    #[serde(default)]
    pub pool_assets: Vec<u64>,
    #[serde(default = "default_min_balance")]
    pub min_balance: u64,
    #[serde(default = "default_max_balance")]
    pub max_balance: u64,
    #[serde(default)]
    pub annual_rate_percent: f64,

    #[serde(default)]
    pub pools: Vec<PoolConfig>,
}

/// One staking pool: which LP assets participate and at what terms.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PoolConfig {
    /// LP assets to weigh against the reserve. Empty means pool-less
    /// mode: holders of the staking asset itself are rewarded directly.
    #[serde(default)]
    pub pool_assets: Vec<u64>,
    /// Effective balance required for admission, in base units.
    #[serde(default = "default_min_balance")]
    pub min_balance: u64,
    /// Effective balance is capped here before reward computation.
    #[serde(default = "default_max_balance")]
    pub max_balance: u64,
    /// Annual interest in percent (10.0 means 10% APY).
    pub annual_rate_percent: f64,
}

fn default_algod_header() -> String {
    "X-Algo-API-Token".to_string()
}

fn default_indexer_header() -> String {
    "X-Indexer-API-Token".to_string()
}

fn default_delay_ms() -> u64 {
    1_000
}

fn default_interval_secs() -> u64 {
    86_400
}

fn default_offset_secs() -> u64 {
    30
}

fn default_payout_page_size() -> usize {
    1
}

fn default_min_balance() -> u64 {
    1_000_000_000
}

fn default_max_balance() -> u64 {
    10_000_000_000
}

// ════════════════════════════════════════════════════════════════════════════════
// LOADING & VALIDATION
// ════════════════════════════════════════════════════════════════════════════════

/// Loads configuration from a TOML file.
pub fn load_from_file(path: impl AsRef<Path>) -> Result<BotConfig, ConfigError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

impl StakingConfig {
    /// The pool list plus the flat fields as one more pool when the flat
    /// rate is positive.
    #[must_use]
    pub fn effective_pools(&self) -> Vec<PoolConfig> {
        let mut pools = self.pools.clone();
        if self.annual_rate_percent > 0.0 {
            pools.push(PoolConfig {
                pool_assets: self.pool_assets.clone(),
                min_balance: self.min_balance,
                max_balance: self.max_balance,
                annual_rate_percent: self.annual_rate_percent,
            });
        }
        pools
    }
}

impl BotConfig {
    /// Validates everything a round depends on. Errors here are fatal at
    /// startup; nothing is validated again at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.algod.host.is_empty() {
            return Err(ConfigError::Invalid("algod.host is empty".into()));
        }
        if self.indexer.host.is_empty() {
            return Err(ConfigError::Invalid("indexer.host is empty".into()));
        }
        if self.algod.auth_header.is_empty() || self.indexer.auth_header.is_empty() {
            return Err(ConfigError::Invalid("auth_header is empty".into()));
        }
        if self.indexer.delay_ms > 60_000 {
            return Err(ConfigError::Invalid(format!(
                "indexer.delay_ms {} exceeds 60000",
                self.indexer.delay_ms
            )));
        }

        let staking = &self.staking;
        if staking.interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "staking.interval_secs must be positive".into(),
            ));
        }
        if staking.interval_secs > SECONDS_PER_YEAR {
            return Err(ConfigError::Invalid(format!(
                "staking.interval_secs {} exceeds one year",
                staking.interval_secs
            )));
        }
        if staking.payout_page_size == 0 || staking.payout_page_size > MAX_GROUP_SIZE {
            return Err(ConfigError::Invalid(format!(
                "staking.payout_page_size {} must be in 1..={}",
                staking.payout_page_size, MAX_GROUP_SIZE
            )));
        }

        if let Err(e) = DispenserAccount::from_seed_hex(&staking.dispenser_seed) {
            return Err(ConfigError::Invalid(format!(
                "staking.dispenser_seed: {}",
                e
            )));
        }

        let pools = staking.effective_pools();
        if pools.is_empty() {
            return Err(ConfigError::Invalid(
                "no pools configured: add [[staking.pools]] or a flat annual_rate_percent".into(),
            ));
        }
        for (i, pool) in pools.iter().enumerate() {
            if !pool.annual_rate_percent.is_finite() || pool.annual_rate_percent <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "pool {}: annual_rate_percent {} must be a positive finite number",
                    i, pool.annual_rate_percent
                )));
            }
            if pool.min_balance > pool.max_balance {
                return Err(ConfigError::Invalid(format!(
                    "pool {}: min_balance {} exceeds max_balance {}",
                    i, pool.min_balance, pool.max_balance
                )));
            }
        }

        for (list, name) in [
            (&staking.excluded_accounts, "excluded_accounts"),
            (&staking.known_logicsig_accounts, "known_logicsig_accounts"),
            (&staking.known_non_logicsig_accounts, "known_non_logicsig_accounts"),
        ] {
            for addr in list.iter() {
                if let Err(e) = addr.public_key() {
                    return Err(ConfigError::Invalid(format!(
                        "staking.{}: {}: {}",
                        name, addr, e
                    )));
                }
            }
        }

        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_HEX: &str =
        "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

    fn minimal_toml() -> String {
        format!(
            r#"
            [algod]
            host = "https://node.example.net"

            [indexer]
            host = "https://idx.example.net"

            [staking]
            asset_id = 452399768
            dispenser_seed = "{SEED_HEX}"

            [[staking.pools]]
            pool_assets = [552647097]
            annual_rate_percent = 10.0
            "#
        )
    }

    fn parse(toml_text: &str) -> BotConfig {
        toml::from_str(toml_text).unwrap_or_else(|e| panic!("parse: {}", e))
    }

    #[test]
    fn defaults_fill_in() {
        let cfg = parse(&minimal_toml());
        assert_eq!(cfg.algod.auth_header, "X-Algo-API-Token");
        assert_eq!(cfg.indexer.auth_header, "X-Indexer-API-Token");
        assert_eq!(cfg.indexer.delay_ms, 1_000);
        assert_eq!(cfg.staking.interval_secs, 86_400);
        assert_eq!(cfg.staking.offset_secs, 30);
        assert_eq!(cfg.staking.payout_page_size, 1);
        assert_eq!(cfg.staking.pools[0].min_balance, 1_000_000_000);
        assert_eq!(cfg.staking.pools[0].max_balance, 10_000_000_000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_from_file_round_trip() {
        use std::io::Write;
        let tmp = tempfile::NamedTempFile::new().expect("temp file");
        let mut f = tmp.reopen().expect("reopen");
        write!(f, "{}", minimal_toml()).expect("write");
        let cfg = load_from_file(tmp.path()).expect("load");
        assert_eq!(cfg.staking.asset_id, 452_399_768);
        assert_eq!(cfg.staking.pools.len(), 1);
    }

    #[test]
    fn load_from_file_missing_is_read_error() {
        let err = load_from_file("/nonexistent/bot.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn flat_fields_count_as_a_pool() {
        let toml_text = format!(
            r#"
            [algod]
            host = "https://node.example.net"

            [indexer]
            host = "https://idx.example.net"

            [staking]
            asset_id = 452399768
            dispenser_seed = "{SEED_HEX}"
            pool_assets = [123, 456]
            annual_rate_percent = 7.5
            min_balance = 5
            max_balance = 50

            [[staking.pools]]
            annual_rate_percent = 10.0
            "#
        );
        let cfg = parse(&toml_text);
        let pools = cfg.staking.effective_pools();
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[1].pool_assets, vec![123, 456]);
        assert_eq!(pools[1].annual_rate_percent, 7.5);
        assert_eq!(pools[1].min_balance, 5);
    }

    #[test]
    fn flat_fields_ignored_without_rate() {
        let cfg = parse(&minimal_toml());
        assert_eq!(cfg.staking.effective_pools().len(), 1);
    }

    #[test]
    fn validate_rejects_zero_interval() {
        let mut cfg = parse(&minimal_toml());
        cfg.staking.interval_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_interval_over_a_year() {
        let mut cfg = parse(&minimal_toml());
        cfg.staking.interval_secs = SECONDS_PER_YEAR + 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_page_size() {
        let mut cfg = parse(&minimal_toml());
        cfg.staking.payout_page_size = 0;
        assert!(cfg.validate().is_err());
        cfg.staking.payout_page_size = MAX_GROUP_SIZE + 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_seed() {
        let mut cfg = parse(&minimal_toml());
        cfg.staking.dispenser_seed = "deadbeef".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_min_over_max() {
        let mut cfg = parse(&minimal_toml());
        cfg.staking.pools[0].min_balance = 100;
        cfg.staking.pools[0].max_balance = 10;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_nonpositive_rate() {
        let mut cfg = parse(&minimal_toml());
        cfg.staking.pools[0].annual_rate_percent = 0.0;
        assert!(cfg.validate().is_err());
        cfg.staking.pools[0].annual_rate_percent = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_no_pools() {
        let mut cfg = parse(&minimal_toml());
        cfg.staking.pools.clear();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_malformed_address() {
        let json = "\"NOTANADDRESS\"";
        let addr: Address = serde_json::from_str(json).expect("transparent parse");
        let mut cfg = parse(&minimal_toml());
        cfg.staking.excluded_accounts = vec![addr];
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_excessive_delay() {
        let mut cfg = parse(&minimal_toml());
        cfg.indexer.delay_ms = 60_001;
        assert!(cfg.validate().is_err());
    }
}
