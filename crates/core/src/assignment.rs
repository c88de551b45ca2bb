use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::{ReceiptId, TransactionId};
use super::money::Money;

/// Why a pairing scored the way it did. Display produces the stable tags
/// surfaced in review queues and audit logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    ExactAmount,
    CloseAmount,
    AmountWithinTolerance,
    ExactDate,
    DateDays(i64),
    DateUnknown,
    Merchant(u8),
    OrderNumber,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::ExactAmount => write!(f, "exact_amount"),
            MatchReason::CloseAmount => write!(f, "close_amount"),
            MatchReason::AmountWithinTolerance => write!(f, "amount_within_tolerance"),
            MatchReason::ExactDate => write!(f, "exact_date"),
            MatchReason::DateDays(d) => write!(f, "date_{d}day"),
            MatchReason::DateUnknown => write!(f, "date_unknown"),
            MatchReason::Merchant(sim) => write!(f, "merchant_{sim}"),
            MatchReason::OrderNumber => write!(f, "order_number_match"),
        }
    }
}

/// One scored transaction/receipt pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub transaction: TransactionId,
    pub receipt: ReceiptId,
    /// Composite score, 0–100.
    pub score: u8,
    /// Token-set similarity of the normalized merchants, 0–100.
    pub merchant_similarity: u8,
    pub amount_diff: Money,
    /// Whole days between the two dates; None when either side is unknown.
    pub date_diff: Option<i64>,
    pub reasons: Vec<MatchReason>,
    pub auto_approve: bool,
}

/// A winning pairing chosen during a reconciliation run, ready to hand to
/// the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchAssignment {
    pub transaction: TransactionId,
    pub receipt: ReceiptId,
    pub confidence: u8,
    pub auto_approve: bool,
    pub reasons: Vec<MatchReason>,
}

impl MatchAssignment {
    pub fn from_candidate(candidate: &MatchCandidate) -> Self {
        MatchAssignment {
            transaction: candidate.transaction,
            receipt: candidate.receipt,
            confidence: candidate.score,
            auto_approve: candidate.auto_approve,
            reasons: candidate.reasons.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_tags_are_stable() {
        assert_eq!(MatchReason::ExactAmount.to_string(), "exact_amount");
        assert_eq!(MatchReason::CloseAmount.to_string(), "close_amount");
        assert_eq!(
            MatchReason::AmountWithinTolerance.to_string(),
            "amount_within_tolerance"
        );
        assert_eq!(MatchReason::ExactDate.to_string(), "exact_date");
        assert_eq!(MatchReason::DateDays(1).to_string(), "date_1day");
        assert_eq!(MatchReason::DateDays(3).to_string(), "date_3day");
        assert_eq!(MatchReason::DateUnknown.to_string(), "date_unknown");
        assert_eq!(MatchReason::Merchant(95).to_string(), "merchant_95");
        assert_eq!(MatchReason::OrderNumber.to_string(), "order_number_match");
    }

    #[test]
    fn assignment_carries_candidate_fields() {
        let candidate = MatchCandidate {
            transaction: TransactionId(3),
            receipt: ReceiptId(9),
            score: 92,
            merchant_similarity: 100,
            amount_diff: Money::zero(),
            date_diff: Some(0),
            reasons: vec![MatchReason::ExactAmount, MatchReason::ExactDate],
            auto_approve: true,
        };
        let a = MatchAssignment::from_candidate(&candidate);
        assert_eq!(a.transaction, TransactionId(3));
        assert_eq!(a.receipt, ReceiptId(9));
        assert_eq!(a.confidence, 92);
        assert!(a.auto_approve);
        assert_eq!(a.reasons.len(), 2);
    }
}
