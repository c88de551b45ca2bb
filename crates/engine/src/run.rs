use std::collections::{HashMap, HashSet};

use rayon::prelude::*;

use acquit_classify::ClassificationResult;
use acquit_core::{
    MatchAssignment, MatchCandidate, MatchStatus, Receipt, ReceiptId, ReceiptState, RecordError,
    RecordRef, Transaction, TransactionId,
};
use acquit_match::AutoMatcher;

use crate::context::ReconciliationContext;

/// One transaction's business type as decided this run.
#[derive(Debug, Clone)]
pub struct ClassificationAssignment {
    pub transaction: TransactionId,
    pub result: ClassificationResult,
}

/// Outcome of screening a batch of incoming receipts against the pool.
#[derive(Debug, Clone, Default)]
pub struct IntakeReport {
    pub admitted: Vec<ReceiptId>,
    /// (duplicate, original) pairs.
    pub duplicates: Vec<(ReceiptId, ReceiptId)>,
    pub issues: Vec<RecordError>,
}

/// Everything one reconciliation run decided, for the caller to persist and
/// surface.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub assignments: Vec<MatchAssignment>,
    pub classifications: Vec<ClassificationAssignment>,
    /// Transactions that ended the run with no receipt, matched or suggested.
    pub unmatched: Vec<TransactionId>,
    pub issues: Vec<RecordError>,
    /// True when any input, provider or store failed along the way.
    pub degraded: bool,
}

// ── Receipt intake ───────────────────────────────────────────────────────────

/// Screens incoming receipts against the stored pool and against each other,
/// in order. Duplicates are marked in place and attributed to the receipt
/// they repeat; a receipt with no fingerprint at all cannot be vetted and is
/// not admitted.
pub fn screen_receipts(
    ctx: &ReconciliationContext,
    incoming: &mut [Receipt],
    pool: &[Receipt],
) -> IntakeReport {
    let mut report = IntakeReport::default();
    let mut seen: Vec<Receipt> = Vec::new();

    for receipt in incoming.iter_mut() {
        if receipt.state != ReceiptState::Available {
            continue;
        }
        if receipt.content_hash.is_empty() && receipt.perceptual_hash.is_none() {
            report.issues.push(RecordError::MissingField {
                record: RecordRef::Receipt(receipt.id),
                field: "content_hash",
            });
            continue;
        }
        let original = ctx
            .detector()
            .find_duplicate(receipt, pool)
            .or_else(|| ctx.detector().find_duplicate(receipt, &seen));
        match original {
            Some(original) => {
                receipt.state = ReceiptState::Duplicate;
                report.duplicates.push((receipt.id, original));
            }
            None => {
                report.admitted.push(receipt.id);
                seen.push(receipt.clone());
            }
        }
    }

    tracing::info!(
        "Screened {} receipts: {} admitted, {} duplicates, {} rejected",
        incoming.len(),
        report.admitted.len(),
        report.duplicates.len(),
        report.issues.len()
    );
    report
}

// ── Reconciliation ───────────────────────────────────────────────────────────

/// Runs the full pipeline over one batch: validate, rank candidates in
/// parallel, claim winners serially, then classify in parallel. Transactions
/// and receipts are updated in place; the summary reports what changed.
/// Running the same batch twice leaves it untouched the second time.
pub fn reconcile_batch(
    ctx: &ReconciliationContext,
    transactions: &mut [Transaction],
    receipts: &mut [Receipt],
) -> RunSummary {
    let mut issues: Vec<RecordError> = ctx.degraded_inputs().to_vec();
    let input_degraded = !issues.is_empty();

    // Records that cannot be processed at all are flagged and skipped;
    // records with a missing date are flagged and processed degraded.
    let mut skip: HashSet<TransactionId> = HashSet::new();
    for tx in transactions.iter() {
        if tx.merchant.trim().is_empty() {
            issues.push(RecordError::MissingField {
                record: RecordRef::Transaction(tx.id),
                field: "merchant",
            });
            skip.insert(tx.id);
            continue;
        }
        if tx.date.is_none() {
            issues.push(RecordError::MalformedDate {
                record: RecordRef::Transaction(tx.id),
            });
        }
    }
    for receipt in receipts.iter() {
        if receipt.state != ReceiptState::Available {
            continue;
        }
        if receipt.amount.is_none() {
            issues.push(RecordError::MissingField {
                record: RecordRef::Receipt(receipt.id),
                field: "amount",
            });
        }
        if receipt.date.is_none() {
            issues.push(RecordError::MalformedDate {
                record: RecordRef::Receipt(receipt.id),
            });
        }
    }

    // Scoring is independent per transaction; ranking fans out across the
    // batch. Claiming stays serial so first match wins deterministically.
    let ranked: Vec<(TransactionId, Vec<MatchCandidate>)> = {
        let pool: &[Receipt] = receipts;
        transactions
            .par_iter()
            .filter(|t| t.status != MatchStatus::Matched && !skip.contains(&t.id))
            .map(|t| (t.id, ctx.matcher().rank_candidates(t, pool, ctx.rejections())))
            .collect()
    };
    let assignments = AutoMatcher::assign_winners(&ranked);

    let tx_slot: HashMap<TransactionId, usize> = transactions
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id, i))
        .collect();
    let receipt_slot: HashMap<ReceiptId, usize> = receipts
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id, i))
        .collect();

    for assignment in &assignments {
        let Some(&slot) = tx_slot.get(&assignment.transaction) else {
            continue;
        };
        transactions[slot].receipt = Some(assignment.receipt);
        if assignment.auto_approve {
            transactions[slot].status = MatchStatus::Matched;
            if let Some(&r) = receipt_slot.get(&assignment.receipt) {
                receipts[r].state = ReceiptState::Consumed;
            }
        } else {
            // The suggestion goes to review; the receipt stays available
            // until a human confirms it.
            transactions[slot].status = MatchStatus::ManualReview;
        }
    }

    let unmatched: Vec<TransactionId> = transactions
        .iter()
        .filter(|t| t.status == MatchStatus::Unmatched && !skip.contains(&t.id))
        .map(|t| t.id)
        .collect();

    // Classification is independent per transaction as well. Transactions
    // that already carry a business type keep it.
    let by_id: HashMap<ReceiptId, &Receipt> = receipts.iter().map(|r| (r.id, r)).collect();
    let classifications: Vec<ClassificationAssignment> = transactions
        .par_iter_mut()
        .filter(|t| !skip.contains(&t.id) && t.business_type.is_none())
        .map(|t| {
            let receipt = t.receipt.and_then(|id| by_id.get(&id).copied());
            let result = ctx.classifier().classify(
                t,
                receipt,
                ctx.calendar(),
                ctx.contacts(),
                ctx.patterns(),
            );
            t.business_type = Some(result.business_type.clone());
            ClassificationAssignment {
                transaction: t.id,
                result,
            }
        })
        .collect();

    let partial = classifications
        .iter()
        .filter(|c| c.result.degraded)
        .count();
    if partial > 0 {
        issues.push(RecordError::ContextUnavailable {
            detail: format!("{partial} classifications ran on partial context"),
        });
    }

    let auto = assignments.iter().filter(|a| a.auto_approve).count();
    tracing::info!(
        "Reconciled {} transactions: {} auto-matched, {} sent to review, {} unmatched, {} classified",
        transactions.len(),
        auto,
        assignments.len() - auto,
        unmatched.len(),
        classifications.len()
    );

    RunSummary {
        assignments,
        classifications,
        unmatched,
        issues,
        degraded: input_degraded || partial > 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EngineConfig, ReconciliationContext};
    use acquit_classify::{InMemoryPatternStore, UnavailableCalendar, UnavailableStore};
    use acquit_core::Money;
    use chrono::NaiveDate;

    fn tx(id: i64, date: (i32, u32, u32), merchant: &str, cents: i64) -> Transaction {
        Transaction::new(
            TransactionId(id),
            merchant,
            Money::from_cents(cents),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2),
        )
    }

    fn receipt(id: i64, date: (i32, u32, u32), merchant: &str, cents: i64, hash: &str) -> Receipt {
        Receipt::new(
            ReceiptId(id),
            merchant,
            Some(Money::from_cents(cents)),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            hash,
        )
    }

    fn ctx() -> ReconciliationContext {
        ReconciliationContext::new(
            EngineConfig::default(),
            Box::new(InMemoryPatternStore::new()),
        )
    }

    #[test]
    fn clean_batch_auto_matches_and_classifies() {
        let ctx = ctx();
        let mut txs = vec![tx(1, (2026, 3, 1), "SQ *JOES COFFEE", -475).with_category("Restaurants")];
        let mut receipts = vec![receipt(10, (2026, 3, 1), "Joe's Coffee", 475, "h1")];

        let summary = reconcile_batch(&ctx, &mut txs, &mut receipts);

        assert_eq!(summary.assignments.len(), 1);
        assert!(summary.assignments[0].auto_approve);
        assert_eq!(txs[0].status, MatchStatus::Matched);
        assert_eq!(txs[0].receipt, Some(ReceiptId(10)));
        assert_eq!(receipts[0].state, ReceiptState::Consumed);
        // No explicit rule for the merchant, so the card category decides.
        assert_eq!(txs[0].business_type.as_deref(), Some("Meals"));
        assert!(summary.unmatched.is_empty());
        assert!(summary.issues.is_empty());
        assert!(!summary.degraded);
    }

    #[test]
    fn uncertain_match_goes_to_review_and_keeps_the_receipt_free() {
        let ctx = ctx();
        // 80 cents off: scores well below the auto-approve line.
        let mut txs = vec![tx(1, (2026, 3, 1), "JOES COFFEE", -555)];
        let mut receipts = vec![receipt(10, (2026, 3, 1), "Joes Coffee", 475, "h1")];

        let summary = reconcile_batch(&ctx, &mut txs, &mut receipts);

        assert_eq!(summary.assignments.len(), 1);
        assert!(!summary.assignments[0].auto_approve);
        assert_eq!(txs[0].status, MatchStatus::ManualReview);
        assert_eq!(txs[0].receipt, Some(ReceiptId(10)));
        assert_eq!(receipts[0].state, ReceiptState::Available);
        assert!(summary.unmatched.is_empty());
    }

    #[test]
    fn blank_merchant_is_flagged_and_skipped() {
        let ctx = ctx();
        let mut txs = vec![tx(1, (2026, 3, 1), "   ", -475)];
        let mut receipts = vec![receipt(10, (2026, 3, 1), "Joes Coffee", 475, "h1")];

        let summary = reconcile_batch(&ctx, &mut txs, &mut receipts);

        assert!(summary.assignments.is_empty());
        assert_eq!(txs[0].status, MatchStatus::Unmatched);
        assert!(txs[0].business_type.is_none());
        // Skipped, so not reported as unmatched work either.
        assert!(summary.unmatched.is_empty());
        assert_eq!(summary.issues.len(), 1);
        assert!(summary.issues[0].skips_record());
    }

    #[test]
    fn bad_record_does_not_abort_the_batch() {
        let ctx = ctx();
        let mut txs = vec![
            tx(1, (2026, 3, 1), "   ", -1200),
            tx(2, (2026, 3, 1), "SQ *JOES COFFEE", -475),
        ];
        let mut receipts = vec![receipt(10, (2026, 3, 1), "Joe's Coffee", 475, "h1")];

        let summary = reconcile_batch(&ctx, &mut txs, &mut receipts);

        // The healthy transaction still matches; the broken one is reported.
        assert_eq!(summary.assignments.len(), 1);
        assert_eq!(summary.assignments[0].transaction, TransactionId(2));
        assert_eq!(summary.issues.len(), 1);
        assert!(!summary.degraded);
    }

    #[test]
    fn undated_transaction_is_flagged_but_still_matched() {
        let ctx = ctx();
        let mut undated = tx(1, (2026, 3, 1), "JOES COFFEE", -475);
        undated.date = None;
        let mut txs = vec![undated];
        let mut receipts = vec![receipt(10, (2026, 3, 1), "Joes Coffee", 475, "h1")];

        let summary = reconcile_batch(&ctx, &mut txs, &mut receipts);

        assert!(summary
            .issues
            .iter()
            .any(|e| matches!(e, RecordError::MalformedDate { record } if *record == RecordRef::Transaction(TransactionId(1)))));
        // Without date points the score tops out at 80: review, not auto.
        assert_eq!(txs[0].status, MatchStatus::ManualReview);
    }

    #[test]
    fn unmatched_transactions_still_get_classified() {
        let ctx = ctx();
        let mut txs = vec![tx(1, (2026, 3, 1), "ACME WIDGETS", -475)];
        let mut receipts = vec![];

        let summary = reconcile_batch(&ctx, &mut txs, &mut receipts);

        assert_eq!(summary.unmatched, vec![TransactionId(1)]);
        assert_eq!(txs[0].business_type.as_deref(), Some("General"));
        assert_eq!(summary.classifications.len(), 1);
    }

    #[test]
    fn second_run_changes_nothing() {
        let ctx = ctx();
        let mut txs = vec![tx(1, (2026, 3, 1), "SQ *JOES COFFEE", -475)];
        let mut receipts = vec![receipt(10, (2026, 3, 1), "Joe's Coffee", 475, "h1")];

        let first = reconcile_batch(&ctx, &mut txs, &mut receipts);
        assert_eq!(first.assignments.len(), 1);

        let second = reconcile_batch(&ctx, &mut txs, &mut receipts);
        assert!(second.assignments.is_empty());
        assert!(second.classifications.is_empty());
        assert_eq!(txs[0].status, MatchStatus::Matched);
        assert_eq!(receipts[0].state, ReceiptState::Consumed);
    }

    #[test]
    fn rejected_pairing_is_never_suggested_again() {
        let ctx = ctx();
        let mut txs = vec![tx(1, (2026, 3, 1), "JOES COFFEE", -555)];
        let mut receipts = vec![receipt(10, (2026, 3, 1), "Joes Coffee", 475, "h1")];

        let first = reconcile_batch(&ctx, &mut txs, &mut receipts);
        assert_eq!(first.assignments.len(), 1);
        assert_eq!(txs[0].status, MatchStatus::ManualReview);

        // Reviewer dismisses the suggestion.
        ctx.reject_pairing(&txs[0], ReceiptId(10));
        txs[0].status = MatchStatus::Unmatched;
        txs[0].receipt = None;

        let second = reconcile_batch(&ctx, &mut txs, &mut receipts);
        assert!(second.assignments.is_empty());
        assert_eq!(second.unmatched, vec![TransactionId(1)]);
    }

    #[test]
    fn learned_correction_applies_on_the_next_run() {
        let mut ctx = ctx();
        ctx.learn_correction("SQ *JOES COFFEE", "Client Meals");

        let mut txs = vec![tx(1, (2026, 3, 1), "JOES COFFEE INC", -475)];
        let mut receipts = vec![];
        let summary = reconcile_batch(&ctx, &mut txs, &mut receipts);

        assert_eq!(txs[0].business_type.as_deref(), Some("Client Meals"));
        assert_eq!(summary.classifications[0].result.confidence, 100);
    }

    #[test]
    fn failing_providers_degrade_the_run() {
        let ctx = ReconciliationContext::new(EngineConfig::default(), Box::new(UnavailableStore))
            .with_calendar(Box::new(UnavailableCalendar));
        let mut txs = vec![tx(1, (2026, 3, 1), "Corner Store", -475)];
        let mut receipts = vec![];

        let summary = reconcile_batch(&ctx, &mut txs, &mut receipts);

        assert!(summary.degraded);
        assert!(summary
            .issues
            .iter()
            .any(|e| matches!(e, RecordError::ContextUnavailable { .. })));
        // Still labeled, just from thin evidence.
        assert_eq!(txs[0].business_type.as_deref(), Some("General"));
    }

    #[test]
    fn degraded_inputs_carry_into_every_summary() {
        let mut ctx = ctx();
        ctx.mark_degraded_input(RecordError::StorageUnavailable {
            detail: "rejection store offline".to_string(),
        });
        let mut txs = vec![];
        let mut receipts = vec![];

        let summary = reconcile_batch(&ctx, &mut txs, &mut receipts);
        assert!(summary.degraded);
        assert_eq!(summary.issues.len(), 1);
    }

    #[test]
    fn screening_marks_duplicates_within_batch_and_against_pool() {
        let ctx = ctx();
        let pool = vec![receipt(1, (2026, 3, 1), "Joes Coffee", 475, "h1")];
        let mut incoming = vec![
            receipt(2, (2026, 3, 2), "Joes Coffee", 475, "h1"),
            receipt(3, (2026, 3, 5), "Delta Air", 28000, "h2"),
            receipt(4, (2026, 3, 5), "Delta Air", 28000, "h2"),
        ];

        let report = screen_receipts(&ctx, &mut incoming, &pool);

        assert_eq!(report.admitted, vec![ReceiptId(3)]);
        assert_eq!(
            report.duplicates,
            vec![(ReceiptId(2), ReceiptId(1)), (ReceiptId(4), ReceiptId(3))]
        );
        assert_eq!(incoming[0].state, ReceiptState::Duplicate);
        assert_eq!(incoming[2].state, ReceiptState::Duplicate);
    }

    #[test]
    fn unfingerprinted_receipt_is_rejected_at_intake() {
        let ctx = ctx();
        let mut incoming = vec![receipt(2, (2026, 3, 2), "Joes Coffee", 475, "")];

        let report = screen_receipts(&ctx, &mut incoming, &[]);

        assert!(report.admitted.is_empty());
        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].skips_record());
        // Left available so it can be re-submitted once repaired.
        assert_eq!(incoming[0].state, ReceiptState::Available);
    }

    #[test]
    fn duplicate_receipts_never_reach_matching() {
        let ctx = ctx();
        let pool = vec![receipt(1, (2026, 3, 1), "Joes Coffee", 475, "h1")];
        let mut incoming = vec![receipt(2, (2026, 3, 1), "Joes Coffee", 475, "h1")];
        screen_receipts(&ctx, &mut incoming, &pool);

        let mut txs = vec![tx(1, (2026, 3, 1), "JOES COFFEE", -475)];
        let summary = reconcile_batch(&ctx, &mut txs, &mut incoming);
        assert!(summary.assignments.is_empty());
        assert_eq!(summary.unmatched, vec![TransactionId(1)]);
    }
}
