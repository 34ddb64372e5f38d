//! # AccountClassifier — Logic-Account Detection
//!
//! Program-controlled ("logic") accounts must never receive rewards:
//! most are escrows that cannot meaningfully hold them, and paying one
//! is effectively burning funds. Classification looks at the shape of
//! an account's most recent outgoing transaction:
//!
//! | Observation                              | Class     |
//! |------------------------------------------|-----------|
//! | no outgoing transaction at all           | logic     |
//! | sender matches, non-empty logicsig       | logic     |
//! | sender matches, key signature            | non-logic |
//! | sender differs (grouped/inner txn)       | logic     |
//! | lookup failed twice                      | logic     |
//!
//! Unknown addresses cost one indexer query (two on a transient
//! failure); every verdict is cached for the process lifetime, and the
//! cache is seeded from configuration so well-known accounts are never
//! looked up at all. The failure direction is deliberate: wrongly
//! excluding a real holder costs one round of rewards, wrongly paying a
//! contract is unrecoverable.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use asb_common::api::TxnRecord;
use asb_common::constants::TXN_SEARCH_LIMIT;
use asb_common::Address;

use crate::balance_source::{BalanceSource, SourceError};

/// Classifies holder accounts as program- or key-controlled.
pub struct AccountClassifier {
    known_logic: HashSet<Address>,
    known_non_logic: HashSet<Address>,
}

impl AccountClassifier {
    /// Creates a classifier seeded with operator-curated address lists.
    #[must_use]
    pub fn new(
        known_logic: impl IntoIterator<Item = Address>,
        known_non_logic: impl IntoIterator<Item = Address>,
    ) -> Self {
        Self {
            known_logic: known_logic.into_iter().collect(),
            known_non_logic: known_non_logic.into_iter().collect(),
        }
    }

    /// Whether `address` is already cached as a logic account.
    #[must_use]
    pub fn is_known_logic(&self, address: &Address) -> bool {
        self.known_logic.contains(address)
    }

    /// Classifies every address, true meaning logic-controlled. Cached
    /// addresses are answered without queries; fresh verdicts enter the
    /// cache before returning.
    ///
    /// Only cancellation aborts the pass; lookup failures degrade to a
    /// per-address logic verdict after one retry.
    pub async fn classify(
        &mut self,
        source: &mut BalanceSource,
        addresses: &[Address],
    ) -> Result<BTreeMap<Address, bool>, SourceError> {
        let mut verdicts = BTreeMap::new();
        for address in addresses {
            if self.known_logic.contains(address) {
                verdicts.insert(address.clone(), true);
                continue;
            }
            if self.known_non_logic.contains(address) {
                verdicts.insert(address.clone(), false);
                continue;
            }

            let is_logic = self.probe(source, address).await?;
            if is_logic {
                self.known_logic.insert(address.clone());
            } else {
                self.known_non_logic.insert(address.clone());
            }
            verdicts.insert(address.clone(), is_logic);
        }
        Ok(verdicts)
    }

    /// One lookup with a single retry on transient failure. Bounded by
    /// construction: the loop body runs at most twice.
    async fn probe(
        &self,
        source: &mut BalanceSource,
        address: &Address,
    ) -> Result<bool, SourceError> {
        let mut last_error = None;
        for attempt in 0..=1u8 {
            match source
                .recent_sender_transactions(address, TXN_SEARCH_LIMIT)
                .await
            {
                Ok(txns) => {
                    let is_logic = judge(address, &txns);
                    debug!(
                        "classified {} as {} (attempt {})",
                        address,
                        if is_logic { "logic" } else { "non-logic" },
                        attempt
                    );
                    return Ok(is_logic);
                }
                Err(SourceError::Cancelled) => return Err(SourceError::Cancelled),
                Err(e) => last_error = Some(e),
            }
        }
        warn!(
            "classification lookup failed twice for {}, treating as logic account: {}",
            address,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        );
        Ok(true)
    }
}

/// Verdict from an account's most recent outgoing transactions.
fn judge(address: &Address, txns: &[TxnRecord]) -> bool {
    match txns.first() {
        // Zero outgoing activity: nothing proves a key controls it.
        None => true,
        Some(txn) if txn.sender == *address => txn.has_logic_program(),
        // The newest record was sent by somebody else entirely.
        Some(_) => true,
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// TESTS
// ════════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use asb_common::api::{ClientError, LogicSignature, TxnSignature};
    use asb_common::MockIndexer;

    use crate::shutdown::ShutdownToken;

    fn addr(byte: u8) -> Address {
        Address::from_public_key(&[byte; 32])
    }

    fn keyed_txn(sender: &Address) -> TxnRecord {
        TxnRecord {
            sender: sender.clone(),
            signature: Some(TxnSignature { logicsig: None }),
        }
    }

    fn logicsig_txn(sender: &Address) -> TxnRecord {
        TxnRecord {
            sender: sender.clone(),
            signature: Some(TxnSignature {
                logicsig: Some(LogicSignature {
                    logic: Some("AiABASI=".to_string()),
                }),
            }),
        }
    }

    fn source(mock: Arc<MockIndexer>) -> BalanceSource {
        BalanceSource::new(mock, 0, ShutdownToken::new())
    }

    // ── Verdict table ────────────────────────────────────────────────────

    #[test]
    fn no_activity_is_logic() {
        assert!(judge(&addr(1), &[]));
    }

    #[test]
    fn keyed_sender_is_not_logic() {
        let a = addr(1);
        assert!(!judge(&a, &[keyed_txn(&a)]));
    }

    #[test]
    fn logicsig_sender_is_logic() {
        let a = addr(1);
        assert!(judge(&a, &[logicsig_txn(&a)]));
    }

    #[test]
    fn empty_program_is_not_logic() {
        let a = addr(1);
        let txn = TxnRecord {
            sender: a.clone(),
            signature: Some(TxnSignature {
                logicsig: Some(LogicSignature {
                    logic: Some(String::new()),
                }),
            }),
        };
        assert!(!judge(&a, &[txn]));
    }

    #[test]
    fn foreign_sender_is_logic() {
        assert!(judge(&addr(1), &[keyed_txn(&addr(2))]));
    }

    // ── Caching & retries ────────────────────────────────────────────────

    #[tokio::test]
    async fn seeded_addresses_skip_lookup() {
        let mock = Arc::new(MockIndexer::new());
        let mut source = source(mock.clone());
        let mut classifier =
            AccountClassifier::new(vec![addr(1)], vec![addr(2)]);

        let verdicts = classifier
            .classify(&mut source, &[addr(1), addr(2)])
            .await
            .unwrap_or_else(|e| panic!("classify: {}", e));

        assert_eq!(verdicts.get(&addr(1)), Some(&true));
        assert_eq!(verdicts.get(&addr(2)), Some(&false));
        assert!(mock.txn_calls().is_empty());
    }

    #[tokio::test]
    async fn fresh_verdicts_enter_the_cache() {
        let mock = Arc::new(MockIndexer::new());
        let a = addr(3);
        mock.push_transactions(&a, vec![keyed_txn(&a)]);

        let mut source = source(mock.clone());
        let mut classifier = AccountClassifier::new(Vec::new(), Vec::new());

        let first = classifier.classify(&mut source, &[a.clone()]).await.unwrap();
        let second = classifier.classify(&mut source, &[a.clone()]).await.unwrap();

        assert_eq!(first.get(&a), Some(&false));
        assert_eq!(second.get(&a), Some(&false));
        // Second pass answered from cache.
        assert_eq!(mock.txn_calls().len(), 1);
    }

    #[tokio::test]
    async fn transient_failure_retries_once_then_succeeds() {
        let mock = Arc::new(MockIndexer::new());
        let a = addr(4);
        mock.push_transactions_error(&a, ClientError::Network("flaky".to_string()));
        mock.push_transactions(&a, vec![keyed_txn(&a)]);

        let mut source = source(mock.clone());
        let mut classifier = AccountClassifier::new(Vec::new(), Vec::new());

        let verdicts = classifier.classify(&mut source, &[a.clone()]).await.unwrap();
        assert_eq!(verdicts.get(&a), Some(&false));
        assert_eq!(mock.txn_calls().len(), 2);
    }

    #[tokio::test]
    async fn double_failure_degrades_to_logic() {
        let mock = Arc::new(MockIndexer::new());
        let a = addr(5);
        mock.push_transactions_error(&a, ClientError::Network("down".to_string()));
        mock.push_transactions_error(&a, ClientError::Network("down".to_string()));

        let mut source = source(mock.clone());
        let mut classifier = AccountClassifier::new(Vec::new(), Vec::new());

        let verdicts = classifier.classify(&mut source, &[a.clone()]).await.unwrap();
        assert_eq!(verdicts.get(&a), Some(&true));
        assert_eq!(mock.txn_calls().len(), 2);
        // The degraded verdict is cached like any other.
        assert!(classifier.is_known_logic(&a));
    }

    #[tokio::test]
    async fn cancellation_propagates_without_retry() {
        let mock = Arc::new(MockIndexer::new());
        let shutdown = ShutdownToken::new();
        shutdown.request();

        let mut source = BalanceSource::new(mock.clone(), 0, shutdown);
        let mut classifier = AccountClassifier::new(Vec::new(), Vec::new());

        let result = classifier.classify(&mut source, &[addr(6)]).await;
        assert_eq!(result, Err(SourceError::Cancelled));
        assert!(mock.txn_calls().is_empty());
    }
}
