use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::{ReceiptId, TransactionId};
use super::money::Money;

/// A card transaction as it arrives from a bank feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Raw merchant descriptor from the card network, e.g. "SQ *JOES COFFEE".
    pub merchant: String,
    /// Signed amount; exports typically sign purchases negative.
    pub amount: Money,
    /// None when the feed carried a date the importer could not parse.
    pub date: Option<NaiveDate>,
    /// Card-network category hint, when the feed provides one.
    pub category: Option<String>,
    pub business_type: Option<String>,
    pub status: MatchStatus,
    pub receipt: Option<ReceiptId>,
}

impl Transaction {
    pub fn new(id: TransactionId, merchant: &str, amount: Money, date: Option<NaiveDate>) -> Self {
        Transaction {
            id,
            merchant: merchant.to_string(),
            amount,
            date,
            category: None,
            business_type: None,
            status: MatchStatus::Unmatched,
            receipt: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Unmatched,
    Matched,
    ManualReview,
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchStatus::Unmatched => write!(f, "unmatched"),
            MatchStatus::Matched => write!(f, "matched"),
            MatchStatus::ManualReview => write!(f, "manual_review"),
        }
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unmatched" => Ok(MatchStatus::Unmatched),
            "matched" => Ok(MatchStatus::Matched),
            "manual_review" => Ok(MatchStatus::ManualReview),
            other => Err(format!("Unknown match status: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_transaction_starts_unmatched() {
        let tx = Transaction::new(
            TransactionId(1),
            "SQ *JOES COFFEE",
            Money::from_cents(-475),
            Some(date(2024, 3, 1)),
        );
        assert_eq!(tx.status, MatchStatus::Unmatched);
        assert!(tx.receipt.is_none());
        assert!(tx.business_type.is_none());
    }

    #[test]
    fn match_status_roundtrip() {
        use std::str::FromStr;
        for status in [
            MatchStatus::Unmatched,
            MatchStatus::Matched,
            MatchStatus::ManualReview,
        ] {
            assert_eq!(MatchStatus::from_str(&status.to_string()).unwrap(), status);
        }
        assert!(MatchStatus::from_str("bogus").is_err());
    }

    #[test]
    fn serde_uses_snake_case_status() {
        let tx = Transaction::new(
            TransactionId(7),
            "DELTA AIR",
            Money::from_cents(-32000),
            None,
        );
        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"unmatched\""));
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, TransactionId(7));
        assert!(back.date.is_none());
    }
}
