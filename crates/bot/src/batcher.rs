//! # PayoutBatcher — Signed Group Submission
//!
//! Turns a round's [`RewardLedger`] into pages of signed asset
//! transfers and submits each page as one atomic group. Page size is a
//! deliberate throttle (default one recipient per page) against group
//! size and node rate limits.
//!
//! A page either lands whole or not at all; a failed page is logged
//! and skipped so the remaining pages still pay out. There is no
//! cross-page atomicity and no durable record of which pages landed.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use asb_common::constants::{MIN_TX_FEE, NOTE_MAX_BYTES, NOTE_PREFIX, TX_VALIDITY_ROUNDS};
use asb_common::{
    assign_group, Address, AlgodApi, AssetTransfer, ClientError, DispenserAccount,
    TransactionParams, TxnError,
};

use crate::ledger::{NoteRecord, RewardLedger};

// ════════════════════════════════════════════════════════════════════════════════
// ERRORS
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum PayError {
    #[error("note serialization failed: {0}")]
    Note(String),
    #[error(transparent)]
    Txn(#[from] TxnError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

// ════════════════════════════════════════════════════════════════════════════════
// OUTCOMES
// ════════════════════════════════════════════════════════════════════════════════

/// Result of one submitted (or attempted) page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub page: usize,
    pub recipients: usize,
    /// Total reward carried by this page, in base units.
    pub amount: u64,
    /// `None` when submission failed and the page was skipped.
    pub tx_id: Option<String>,
}

// ════════════════════════════════════════════════════════════════════════════════
// BATCHER
// ════════════════════════════════════════════════════════════════════════════════

pub struct PayoutBatcher {
    algod: Arc<dyn AlgodApi>,
    dispenser: DispenserAccount,
    staking_asset: u64,
    page_size: usize,
}

impl PayoutBatcher {
    #[must_use]
    pub fn new(
        algod: Arc<dyn AlgodApi>,
        dispenser: DispenserAccount,
        staking_asset: u64,
        page_size: usize,
    ) -> Self {
        Self {
            algod,
            dispenser,
            staking_asset,
            page_size,
        }
    }

    /// Pays every positive ledger entry, largest rewards first.
    ///
    /// Returns one outcome per attempted page; a failed page carries
    /// no transaction id and never blocks the pages after it.
    pub async fn pay(
        &self,
        ledger: &RewardLedger,
        params: &TransactionParams,
    ) -> Vec<PageOutcome> {
        let mut recipients: Vec<(Address, u64)> = ledger
            .rewards()
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(address, amount)| (address.clone(), *amount))
            .collect();
        if recipients.is_empty() {
            return Vec::new();
        }
        // Largest first for log readability; the map's address order
        // breaks ties.
        recipients.sort_by(|a, b| b.1.cmp(&a.1));

        let total = recipients.iter().fold(0u64, |acc, (_, r)| acc.saturating_add(*r));
        info!(
            recipients = recipients.len(),
            total_amount = total,
            "paying out rewards"
        );

        let mut outcomes = Vec::new();
        for (page, chunk) in recipients.chunks(self.page_size.max(1)).enumerate() {
            let amount = chunk.iter().fold(0u64, |acc, (_, r)| acc.saturating_add(*r));
            let tx_id = match self.submit_page(chunk, ledger, params).await {
                Ok(tx_id) => {
                    debug!(page, recipients = chunk.len(), amount, %tx_id, "payout page submitted");
                    Some(tx_id)
                }
                Err(error) => {
                    error!(page, recipients = chunk.len(), %error, "payout page failed, continuing");
                    None
                }
            };
            outcomes.push(PageOutcome {
                page,
                recipients: chunk.len(),
                amount,
                tx_id,
            });
        }
        outcomes
    }

    async fn submit_page(
        &self,
        chunk: &[(Address, u64)],
        ledger: &RewardLedger,
        params: &TransactionParams,
    ) -> Result<String, PayError> {
        let fee = MIN_TX_FEE.max(params.min_fee);
        let first_valid = params.last_round;
        let last_valid = params.last_round + TX_VALIDITY_ROUNDS;

        let mut txns = Vec::with_capacity(chunk.len());
        for (address, amount) in chunk {
            txns.push(AssetTransfer {
                sender: self.dispenser.address().clone(),
                receiver: address.clone(),
                asset_id: self.staking_asset,
                amount: *amount,
                fee,
                first_valid,
                last_valid,
                genesis_id: params.genesis_id.clone(),
                genesis_hash: params.genesis_hash.clone(),
                note: build_note(ledger.notes_for(address))?,
                group: None,
            });
        }
        assign_group(&mut txns)?;

        let mut signed = Vec::with_capacity(txns.len());
        for txn in txns {
            signed.push(txn.sign(&self.dispenser)?);
        }
        let response = self.algod.submit_group(&signed).await?;
        Ok(response.tx_id)
    }
}

/// Audit note: fixed prefix, then the JSON note records, hard-capped
/// at the on-chain note budget.
fn build_note(records: &[NoteRecord]) -> Result<Vec<u8>, PayError> {
    let json = serde_json::to_string(records).map_err(|e| PayError::Note(e.to_string()))?;
    let mut note = Vec::with_capacity(NOTE_PREFIX.len() + json.len());
    note.extend_from_slice(NOTE_PREFIX.as_bytes());
    note.extend_from_slice(json.as_bytes());
    note.truncate(NOTE_MAX_BYTES);
    Ok(note)
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════
