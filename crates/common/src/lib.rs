//! # asb-common — Shared Primitives
//!
//! Chain primitives, wire types, transports, and configuration shared by
//! the distribution service.
//!
//! ## Modules
//! - `address`: checksummed account address codec
//! - `api`: wire types and the `IndexerApi` / `AlgodApi` transport traits
//! - `config`: TOML configuration with startup validation
//! - `constants`: protocol and payout constants
//! - `http`: REST implementations of the transport traits
//! - `keys`: dispenser Ed25519 signing identity
//! - `mock`: scripted transports for tests
//! - `txn`: asset-transfer construction, grouping, and signing
//!
//! ## Transport Architecture
//! ```text
//! ┌────────────┐   ┌───────────┐
//! │ IndexerApi │   │ AlgodApi  │   <- abstract traits
//! └─────┬──────┘   └─────┬─────┘
//!    ┌──┴───────┐     ┌──┴────────┐
//! ┌──▼──────┐ ┌─▼─────▼──┐ ┌──────▼──┐
//! │HttpIndexer│ │  mocks  │ │HttpAlgod│
//! └───────────┘ └─────────┘ └─────────┘
//! ```

pub mod address;
pub mod api;
pub mod config;
pub mod constants;
pub mod http;
pub mod keys;
pub mod mock;
pub mod txn;

pub use address::{Address, AddressError};
pub use api::{
    AlgodApi, AssetInfo, BalancePage, ClientError, IndexerApi, LogicSignature, MiniBalance,
    SubmitResponse, TransactionParams, TxnRecord, TxnSignature,
};
pub use config::{
    load_from_file, AlgodConfig, BotConfig, ConfigError, IndexerConfig, PoolConfig, StakingConfig,
};
pub use http::{HttpAlgod, HttpIndexer};
pub use keys::{DispenserAccount, KeyError};
pub use mock::{MockAlgod, MockIndexer};
pub use txn::{assign_group, AssetTransfer, SignedTransfer, TxnError};
