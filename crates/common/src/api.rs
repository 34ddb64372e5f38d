//! # Chain API — Wire Types & Transport Traits
//!
//! The pipeline talks to two services: an **indexer** (read side: asset
//! balances, asset metadata, transaction search) and a **node** (write
//! side: transaction parameters and submission). Both are abstracted
//! behind async traits so the pipeline can run against HTTP clients in
//! production and scripted mocks in tests.
//!
//! ## Contract
//!
//! - Implementations MUST NOT retry internally; retry policy belongs to
//!   the callers that own it.
//! - Implementations MUST NOT panic.
//! - Errors are [`ClientError`]: transport failures, non-2xx statuses,
//!   and undecodable bodies, with no client-library types leaking out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::address::Address;
use crate::txn::SignedTransfer;

// ════════════════════════════════════════════════════════════════════════════════
// ERROR
// ════════════════════════════════════════════════════════════════════════════════

/// Errors from indexer or node requests.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, mid-body disconnect).
    #[error("network error: {0}")]
    Network(String),
    /// The service answered with a non-success status.
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },
    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

// ════════════════════════════════════════════════════════════════════════════════
// WIRE TYPES — INDEXER
// ════════════════════════════════════════════════════════════════════════════════

/// One holder's position in an asset balance listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniBalance {
    pub address: Address,
    pub amount: u64,
    #[serde(rename = "is-frozen", default)]
    pub is_frozen: bool,
}

/// One page of an asset balance listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancePage {
    #[serde(default)]
    pub balances: Vec<MiniBalance>,
    /// Cursor for the next page; absent on the last page.
    #[serde(rename = "next-token", default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

/// The asset metadata the weighting step needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub asset_id: u64,
    pub creator: Address,
    /// Unset or sentinel-valued when the asset has no reserve account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve: Option<Address>,
}

/// A transaction as returned by the indexer's search endpoint. Only the
/// fields account classification looks at are modeled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnRecord {
    pub sender: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<TxnSignature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnSignature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logicsig: Option<LogicSignature>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicSignature {
    /// Base64-encoded approval program.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
}

impl TxnRecord {
    /// True when the transaction carries a non-empty logic-signature
    /// program, i.e. it was authorized by a program rather than a key.
    #[must_use]
    pub fn has_logic_program(&self) -> bool {
        self.signature
            .as_ref()
            .and_then(|s| s.logicsig.as_ref())
            .and_then(|l| l.logic.as_deref())
            .is_some_and(|program| !program.is_empty())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// WIRE TYPES — NODE
// ════════════════════════════════════════════════════════════════════════════════

/// Suggested transaction parameters, fetched once per distribution round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionParams {
    #[serde(rename = "last-round")]
    pub last_round: u64,
    #[serde(rename = "genesis-id")]
    pub genesis_id: String,
    #[serde(rename = "genesis-hash")]
    pub genesis_hash: String,
    #[serde(rename = "min-fee", default)]
    pub min_fee: u64,
}

/// Acknowledgement of a submitted transaction group; the id is the
/// first transaction's id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "txId")]
    pub tx_id: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// TRANSPORT TRAITS
// ════════════════════════════════════════════════════════════════════════════════

/// Read-side chain access (balances, asset metadata, transaction search).
#[async_trait]
pub trait IndexerApi: Send + Sync {
    /// One page of holders of `asset_id`, at most `limit` entries,
    /// starting at the `next` cursor (first page when `None`).
    async fn asset_balances(
        &self,
        asset_id: u64,
        limit: u64,
        next: Option<&str>,
    ) -> Result<BalancePage, ClientError>;

    /// Creator and reserve of `asset_id`.
    async fn asset_info(&self, asset_id: u64) -> Result<AssetInfo, ClientError>;

    /// The most recent transactions *sent by* `sender`, newest first.
    async fn transactions_by_sender(
        &self,
        sender: &Address,
        limit: u64,
    ) -> Result<Vec<TxnRecord>, ClientError>;
}

/// Write-side chain access (parameters and submission).
#[async_trait]
pub trait AlgodApi: Send + Sync {
    /// Current suggested parameters.
    async fn transaction_params(&self) -> Result<TransactionParams, ClientError>;

    /// Submits one atomic group. All-or-nothing: either every member
    /// commits or the whole group is rejected.
    async fn submit_group(&self, txns: &[SignedTransfer]) -> Result<SubmitResponse, ClientError>;
}

// ════════════════════════════════════════════════════════════════════════════════
// COMPILE-TIME ASSERTIONS
// ════════════════════════════════════════════════════════════════════════════════

const _: () = {
    fn assert_object_safe(_: &dyn IndexerApi, _: &dyn AlgodApi) {}
    let _ = assert_object_safe;
};

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
