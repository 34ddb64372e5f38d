//! # Mock Transports
//!
//! Scripted, in-memory implementations of [`IndexerApi`] and [`AlgodApi`]
//! for tests. Responses are pre-loaded per key (asset id or address) and
//! consumed in FIFO order; an exhausted queue yields
//! `ClientError::Network("no mock response")`. Every call is recorded so
//! tests can assert on pagination cursors, cache behavior, and retry
//! counts.
//!
//! Uses `std::sync::Mutex` for interior mutability; poisoned locks are
//! mapped to `ClientError::Network` without panicking.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::address::Address;
use crate::api::{
    AlgodApi, AssetInfo, BalancePage, ClientError, IndexerApi, SubmitResponse, TransactionParams,
    TxnRecord,
};
use crate::txn::SignedTransfer;

fn poisoned(e: impl std::fmt::Display) -> ClientError {
    ClientError::Network(format!("mutex poisoned: {}", e))
}

fn no_response() -> ClientError {
    ClientError::Network("no mock response".to_string())
}

fn pop_front<T>(queue: &mut Vec<T>) -> Result<T, ClientError> {
    if queue.is_empty() {
        return Err(no_response());
    }
    // FIFO: remove from front.
    Ok(queue.remove(0))
}

// ════════════════════════════════════════════════════════════════════════════════
// MOCK INDEXER
// ════════════════════════════════════════════════════════════════════════════════

/// Scripted indexer. Balance pages and asset infos are queued per asset
/// id, transaction lookups per address.
#[derive(Default)]
pub struct MockIndexer {
    balance_pages: Mutex<HashMap<u64, Vec<Result<BalancePage, ClientError>>>>,
    asset_infos: Mutex<HashMap<u64, Vec<Result<AssetInfo, ClientError>>>>,
    txn_lookups: Mutex<HashMap<Address, Vec<Result<Vec<TxnRecord>, ClientError>>>>,
    balance_calls: Mutex<Vec<(u64, Option<String>)>>,
    asset_info_calls: Mutex<Vec<u64>>,
    txn_calls: Mutex<Vec<Address>>,
}

impl MockIndexer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next balance page returned for `asset_id`.
    pub fn push_balance_page(&self, asset_id: u64, page: BalancePage) {
        if let Ok(mut queues) = self.balance_pages.lock() {
            queues.entry(asset_id).or_default().push(Ok(page));
        }
    }

    /// Queues a balance listing failure for `asset_id`.
    pub fn push_balance_error(&self, asset_id: u64, error: ClientError) {
        if let Ok(mut queues) = self.balance_pages.lock() {
            queues.entry(asset_id).or_default().push(Err(error));
        }
    }

    /// Queues the next asset info returned for `asset_id`.
    pub fn push_asset_info(&self, info: AssetInfo) {
        if let Ok(mut queues) = self.asset_infos.lock() {
            queues.entry(info.asset_id).or_default().push(Ok(info));
        }
    }

    /// Queues an asset info failure for `asset_id`.
    pub fn push_asset_info_error(&self, asset_id: u64, error: ClientError) {
        if let Ok(mut queues) = self.asset_infos.lock() {
            queues.entry(asset_id).or_default().push(Err(error));
        }
    }

    /// Queues the next transaction lookup result for `sender`.
    pub fn push_transactions(&self, sender: &Address, txns: Vec<TxnRecord>) {
        if let Ok(mut queues) = self.txn_lookups.lock() {
            queues.entry(sender.clone()).or_default().push(Ok(txns));
        }
    }

    /// Queues a transaction lookup failure for `sender`.
    pub fn push_transactions_error(&self, sender: &Address, error: ClientError) {
        if let Ok(mut queues) = self.txn_lookups.lock() {
            queues.entry(sender.clone()).or_default().push(Err(error));
        }
    }

    /// Every `asset_balances` call as `(asset_id, cursor)`, in order.
    #[must_use]
    pub fn balance_calls(&self) -> Vec<(u64, Option<String>)> {
        self.balance_calls.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Every `asset_info` call, in order.
    #[must_use]
    pub fn asset_info_calls(&self) -> Vec<u64> {
        self.asset_info_calls.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Every `transactions_by_sender` call, in order.
    #[must_use]
    pub fn txn_calls(&self) -> Vec<Address> {
        self.txn_calls.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl IndexerApi for MockIndexer {
    async fn asset_balances(
        &self,
        asset_id: u64,
        _limit: u64,
        next: Option<&str>,
    ) -> Result<BalancePage, ClientError> {
        self.balance_calls
            .lock()
            .map_err(poisoned)?
            .push((asset_id, next.map(str::to_string)));
        let mut queues = self.balance_pages.lock().map_err(poisoned)?;
        pop_front(queues.entry(asset_id).or_default())?
    }

    async fn asset_info(&self, asset_id: u64) -> Result<AssetInfo, ClientError> {
        self.asset_info_calls.lock().map_err(poisoned)?.push(asset_id);
        let mut queues = self.asset_infos.lock().map_err(poisoned)?;
        pop_front(queues.entry(asset_id).or_default())?
    }

    async fn transactions_by_sender(
        &self,
        sender: &Address,
        _limit: u64,
    ) -> Result<Vec<TxnRecord>, ClientError> {
        self.txn_calls.lock().map_err(poisoned)?.push(sender.clone());
        let mut queues = self.txn_lookups.lock().map_err(poisoned)?;
        pop_front(queues.entry(sender.clone()).or_default())?
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// MOCK ALGOD
// ════════════════════════════════════════════════════════════════════════════════

/// Scripted node. Parameter fetches and submissions are queued FIFO;
/// every submitted group is captured for assertions.
#[derive(Default)]
pub struct MockAlgod {
    params: Mutex<Vec<Result<TransactionParams, ClientError>>>,
    submit_results: Mutex<Vec<Result<SubmitResponse, ClientError>>>,
    submitted: Mutex<Vec<Vec<SignedTransfer>>>,
}

impl MockAlgod {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the next parameter fetch result.
    pub fn push_params(&self, params: TransactionParams) {
        if let Ok(mut queue) = self.params.lock() {
            queue.push(Ok(params));
        }
    }

    /// Queues a parameter fetch failure.
    pub fn push_params_error(&self, error: ClientError) {
        if let Ok(mut queue) = self.params.lock() {
            queue.push(Err(error));
        }
    }

    /// Queues the next submission result.
    pub fn push_submit_response(&self, response: SubmitResponse) {
        if let Ok(mut queue) = self.submit_results.lock() {
            queue.push(Ok(response));
        }
    }

    /// Queues a submission failure.
    pub fn push_submit_error(&self, error: ClientError) {
        if let Ok(mut queue) = self.submit_results.lock() {
            queue.push(Err(error));
        }
    }

    /// Every group that reached `submit_group`, in submission order.
    /// Failed submissions are captured too.
    #[must_use]
    pub fn submitted(&self) -> Vec<Vec<SignedTransfer>> {
        self.submitted.lock().map(|log| log.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AlgodApi for MockAlgod {
    async fn transaction_params(&self) -> Result<TransactionParams, ClientError> {
        let mut queue = self.params.lock().map_err(poisoned)?;
        pop_front(&mut queue)?
    }

    async fn submit_group(&self, txns: &[SignedTransfer]) -> Result<SubmitResponse, ClientError> {
        self.submitted.lock().map_err(poisoned)?.push(txns.to_vec());
        let mut queue = self.submit_results.lock().map_err(poisoned)?;
        pop_front(&mut queue)?
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// COMPILE-TIME ASSERTIONS
// ════════════════════════════════════════════════════════════════════════════════

const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn check() {
        assert_send_sync::<MockIndexer>();
        assert_send_sync::<MockAlgod>();
    }
    let _ = check;
};

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
