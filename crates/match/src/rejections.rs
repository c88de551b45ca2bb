use std::collections::HashSet;
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use acquit_core::{ReceiptId, Transaction};

/// One "not a match" verdict from review. Keyed on the transaction's
/// fingerprint rather than its row id, so the verdict survives re-imports
/// that renumber the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectionRecord {
    pub date: Option<NaiveDate>,
    /// Normalized merchant key at the time of rejection.
    pub merchant_key: String,
    pub amount_cents: i64,
    pub receipt: ReceiptId,
}

impl RejectionRecord {
    pub fn for_pair(tx: &Transaction, merchant_key: &str, receipt: ReceiptId) -> Self {
        RejectionRecord {
            date: tx.date,
            merchant_key: merchant_key.to_string(),
            amount_cents: tx.amount.to_cents(),
            receipt,
        }
    }

    fn key(&self) -> String {
        let date = self
            .date
            .map_or_else(|| "unknown".to_string(), |d| d.to_string());
        format!(
            "{date}|{}|{}|{}",
            self.merchant_key, self.amount_cents, self.receipt
        )
    }
}

/// Thread-safe set of rejected pairings, consulted during candidate ranking
/// so a dismissed suggestion is never raised again.
#[derive(Debug, Default)]
pub struct RejectionCache {
    keys: RwLock<HashSet<String>>,
}

impl RejectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = RejectionRecord>,
    {
        let keys = records.into_iter().map(|r| r.key()).collect();
        RejectionCache {
            keys: RwLock::new(keys),
        }
    }

    pub fn insert(&self, record: &RejectionRecord) {
        self.keys.write().unwrap().insert(record.key());
    }

    pub fn is_rejected(&self, tx: &Transaction, merchant_key: &str, receipt: ReceiptId) -> bool {
        let key = RejectionRecord::for_pair(tx, merchant_key, receipt).key();
        self.keys.read().unwrap().contains(&key)
    }

    pub fn len(&self) -> usize {
        self.keys.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acquit_core::{Money, TransactionId};

    fn tx(id: i64, merchant: &str, cents: i64) -> Transaction {
        Transaction::new(
            TransactionId(id),
            merchant,
            Money::from_cents(cents),
            NaiveDate::from_ymd_opt(2024, 3, 1),
        )
    }

    #[test]
    fn rejection_survives_transaction_renumbering() {
        let cache = RejectionCache::new();
        let original = tx(1, "SQ *JOES COFFEE", -475);
        cache.insert(&RejectionRecord::for_pair(&original, "joes coffee", ReceiptId(9)));

        // Same purchase re-imported under a new row id.
        let reimported = tx(9001, "SQ *JOES COFFEE", -475);
        assert!(cache.is_rejected(&reimported, "joes coffee", ReceiptId(9)));
    }

    #[test]
    fn different_receipt_is_not_rejected() {
        let cache = RejectionCache::new();
        let t = tx(1, "SQ *JOES COFFEE", -475);
        cache.insert(&RejectionRecord::for_pair(&t, "joes coffee", ReceiptId(9)));
        assert!(!cache.is_rejected(&t, "joes coffee", ReceiptId(10)));
    }

    #[test]
    fn undated_transactions_key_consistently() {
        let cache = RejectionCache::new();
        let mut t = tx(1, "JOES COFFEE", -475);
        t.date = None;
        cache.insert(&RejectionRecord::for_pair(&t, "joes coffee", ReceiptId(9)));
        assert!(cache.is_rejected(&t, "joes coffee", ReceiptId(9)));
    }

    #[test]
    fn from_records_preloads_the_set() {
        let t = tx(1, "JOES COFFEE", -475);
        let records = vec![
            RejectionRecord::for_pair(&t, "joes coffee", ReceiptId(1)),
            RejectionRecord::for_pair(&t, "joes coffee", ReceiptId(2)),
        ];
        let cache = RejectionCache::from_records(records);
        assert_eq!(cache.len(), 2);
        assert!(cache.is_rejected(&t, "joes coffee", ReceiptId(1)));
    }
}
