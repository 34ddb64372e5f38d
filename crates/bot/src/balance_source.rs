//! # BalanceSource — Paced Indexer Ingestion
//!
//! Every read the pipeline does against the indexer goes through here:
//! cursor pagination for balance listings, a process-lifetime cache for
//! asset metadata, and the sender-transaction lookup classification
//! uses. A configured pause runs before *every* request — public
//! indexers rate-limit, and a distribution round can issue hundreds of
//! lookups back to back.
//!
//! ```text
//! list_balances(asset)           pace ▶ page ▶ pace ▶ page ▶ … until short page
//! asset_info(asset)              cache hit? ──else── pace ▶ fetch ▶ insert
//! recent_sender_transactions(a)  pace ▶ fetch        (retry policy is the caller's)
//! ```
//!
//! The pacing sleeps observe the shutdown token; a request() during a
//! sleep surfaces as [`SourceError::Cancelled`] so the round can stop
//! before anything is paid.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use asb_common::api::{AssetInfo, ClientError, IndexerApi, TxnRecord};
use asb_common::constants::INDEXER_PAGE_LIMIT;
use asb_common::Address;

use crate::shutdown::ShutdownToken;

// ════════════════════════════════════════════════════════════════════════════════
// TYPES
// ════════════════════════════════════════════════════════════════════════════════

/// One holder's position, tagged with the asset it was listed for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HolderBalance {
    pub address: Address,
    pub asset_id: u64,
    pub amount: u64,
    pub frozen: bool,
}

/// Errors from ingestion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("indexer request failed: {0}")]
    Client(#[from] ClientError),
    #[error("shutdown requested")]
    Cancelled,
}

// ════════════════════════════════════════════════════════════════════════════════
// SOURCE
// ════════════════════════════════════════════════════════════════════════════════

/// Paced, caching read access to the indexer.
pub struct BalanceSource {
    api: Arc<dyn IndexerApi>,
    delay: Duration,
    page_limit: u64,
    shutdown: ShutdownToken,
    /// Reserve/creator rarely change; cached for the process lifetime.
    asset_cache: HashMap<u64, AssetInfo>,
}

impl BalanceSource {
    #[must_use]
    pub fn new(api: Arc<dyn IndexerApi>, delay_ms: u64, shutdown: ShutdownToken) -> Self {
        Self {
            api,
            delay: Duration::from_millis(delay_ms),
            page_limit: INDEXER_PAGE_LIMIT,
            shutdown,
            asset_cache: HashMap::new(),
        }
    }

    /// Overrides the page size requested per balance listing call.
    /// Production uses the default; tests use small pages.
    #[must_use]
    pub fn with_page_limit(mut self, page_limit: u64) -> Self {
        self.page_limit = page_limit;
        self
    }

    /// The pause before every request. Cancellation during the pause
    /// (or already requested) aborts the caller's operation.
    async fn pace(&self) -> Result<(), SourceError> {
        if self.shutdown.is_requested() {
            return Err(SourceError::Cancelled);
        }
        if self.delay.is_zero() {
            return Ok(());
        }
        if self.shutdown.sleep(self.delay).await {
            Ok(())
        } else {
            Err(SourceError::Cancelled)
        }
    }

    /// All holders of `asset_id`, joined across pages.
    ///
    /// Pagination advances while a page came back full *and* carried a
    /// next cursor; anything else is the last page.
    pub async fn list_balances(&mut self, asset_id: u64) -> Result<Vec<HolderBalance>, SourceError> {
        let mut holders = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            self.pace().await?;
            let page = self
                .api
                .asset_balances(asset_id, self.page_limit, cursor.as_deref())
                .await?;
            let page_len = page.balances.len();
            holders.extend(page.balances.into_iter().map(|b| HolderBalance {
                address: b.address,
                asset_id,
                amount: b.amount,
                frozen: b.is_frozen,
            }));
            cursor = page.next_token;
            if (page_len as u64) < self.page_limit || cursor.is_none() {
                break;
            }
        }
        debug!("asset {}: {} holder(s) listed", asset_id, holders.len());
        Ok(holders)
    }

    /// Creator and reserve of `asset_id`, cached after the first fetch.
    pub async fn asset_info(&mut self, asset_id: u64) -> Result<AssetInfo, SourceError> {
        if let Some(info) = self.asset_cache.get(&asset_id) {
            return Ok(info.clone());
        }
        self.pace().await?;
        let info = self.api.asset_info(asset_id).await?;
        self.asset_cache.insert(asset_id, info.clone());
        Ok(info)
    }

    /// Most recent transactions sent by `address`, newest first.
    pub async fn recent_sender_transactions(
        &mut self,
        address: &Address,
        limit: u64,
    ) -> Result<Vec<TxnRecord>, SourceError> {
        self.pace().await?;
        Ok(self.api.transactions_by_sender(address, limit).await?)
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
