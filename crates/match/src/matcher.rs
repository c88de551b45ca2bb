use std::collections::HashSet;

use acquit_core::{
    MatchAssignment, MatchCandidate, MatchStatus, Receipt, ReceiptId, ReceiptState, Transaction,
    TransactionId,
};

use crate::rejections::RejectionCache;
use crate::scorer::MatchScorer;

/// Pairs transactions with receipts: ranks candidates per transaction, then
/// claims winners serially so no receipt is handed to two transactions.
pub struct AutoMatcher {
    scorer: MatchScorer,
}

impl AutoMatcher {
    pub fn new(scorer: MatchScorer) -> Self {
        Self { scorer }
    }

    pub fn scorer(&self) -> &MatchScorer {
        &self.scorer
    }

    /// All viable candidates for one transaction, best first. Consumed and
    /// duplicate receipts are skipped, as are previously rejected pairings
    /// and anything below the viability floor. Ties break toward the closer
    /// date, then the closer amount, then the lower receipt id, so ranking
    /// is deterministic for identical inputs.
    pub fn rank_candidates(
        &self,
        tx: &Transaction,
        receipts: &[Receipt],
        rejections: &RejectionCache,
    ) -> Vec<MatchCandidate> {
        let merchant_key = self.scorer.normalizer().normalize(&tx.merchant);
        let mut candidates: Vec<MatchCandidate> = receipts
            .iter()
            .filter(|r| r.state == ReceiptState::Available)
            .filter(|r| !rejections.is_rejected(tx, &merchant_key, r.id))
            .filter_map(|r| self.scorer.score(tx, r))
            .filter(|c| c.score >= self.scorer.config().min_viable_score)
            .collect();
        candidates.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| date_rank(a.date_diff).cmp(&date_rank(b.date_diff)))
                .then_with(|| a.amount_diff.cmp(&b.amount_diff))
                .then_with(|| a.receipt.cmp(&b.receipt))
        });
        candidates
    }

    /// Serial claim pass over pre-ranked candidate lists, in input order.
    /// The first free receipt on each transaction's list wins; a receipt
    /// claimed earlier in the batch is skipped, and the transaction falls
    /// through to its next-best candidate.
    pub fn assign_winners(
        ranked: &[(TransactionId, Vec<MatchCandidate>)],
    ) -> Vec<MatchAssignment> {
        let mut claimed: HashSet<ReceiptId> = HashSet::new();
        let mut assignments = Vec::new();
        for (_, candidates) in ranked {
            if let Some(winner) = candidates.iter().find(|c| !claimed.contains(&c.receipt)) {
                claimed.insert(winner.receipt);
                assignments.push(MatchAssignment::from_candidate(winner));
            }
        }
        assignments
    }

    /// One-shot reconciliation of a batch: rank every unmatched transaction,
    /// then claim winners. Running it twice on the same inputs yields the
    /// same assignments.
    pub fn reconcile(
        &self,
        transactions: &[Transaction],
        receipts: &[Receipt],
        rejections: &RejectionCache,
    ) -> Vec<MatchAssignment> {
        let ranked: Vec<(TransactionId, Vec<MatchCandidate>)> = transactions
            .iter()
            .filter(|t| t.status != MatchStatus::Matched)
            .map(|t| (t.id, self.rank_candidates(t, receipts, rejections)))
            .collect();
        Self::assign_winners(&ranked)
    }
}

fn date_rank(diff: Option<i64>) -> i64 {
    diff.unwrap_or(i64::MAX)
}
