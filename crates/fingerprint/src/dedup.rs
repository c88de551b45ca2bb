use acquit_core::{Receipt, ReceiptId};
use serde::{Deserialize, Serialize};

use crate::perceptual::hamming;

/// Windows and threshold for duplicate screening. Amounts are in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    pub date_window_days: i64,
    pub amount_window_cents: i64,
    /// Maximum perceptual-hash distance still considered the same image.
    pub max_hamming_distance: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            date_window_days: 3,
            amount_window_cents: 50,
            max_hamming_distance: 5,
        }
    }
}

/// Screens an incoming receipt against already-stored ones. The date/amount
/// window runs first so hashes are only compared for plausible pairs; inside
/// the window an identical content fingerprint is an immediate duplicate,
/// and otherwise a perceptual near-match with a confirmed amount fit is.
#[derive(Debug, Default)]
pub struct DuplicateDetector {
    config: DedupConfig,
}

impl DuplicateDetector {
    pub fn new(config: DedupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DedupConfig {
        &self.config
    }

    /// Returns the id of the first stored receipt the incoming one
    /// duplicates, or None when it is genuinely new.
    pub fn find_duplicate(&self, incoming: &Receipt, existing: &[Receipt]) -> Option<ReceiptId> {
        for candidate in existing {
            if candidate.id == incoming.id {
                continue;
            }
            if !self.dates_within_window(incoming, candidate) {
                continue;
            }

            let amount_fit = match (incoming.amount, candidate.amount) {
                (Some(a), Some(b)) => {
                    Some(a.abs_diff(b).to_cents() <= self.config.amount_window_cents)
                }
                _ => None,
            };
            // A confirmed amount gap beyond the window rules the pair out.
            if amount_fit == Some(false) {
                continue;
            }

            if !incoming.content_hash.is_empty()
                && incoming.content_hash == candidate.content_hash
            {
                return Some(candidate.id);
            }

            // The perceptual path additionally requires a confirmed amount
            // fit; a missing amount is not evidence of similarity.
            if amount_fit == Some(true) {
                if let (Some(a), Some(b)) = (incoming.perceptual_hash, candidate.perceptual_hash) {
                    if hamming(a, b) <= self.config.max_hamming_distance {
                        return Some(candidate.id);
                    }
                }
            }
        }
        None
    }

    fn dates_within_window(&self, a: &Receipt, b: &Receipt) -> bool {
        match (a.date, b.date) {
            (Some(x), Some(y)) => (x - y).num_days().abs() <= self.config.date_window_days,
            // An unknown date widens the window rather than vetoing the check.
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use acquit_core::Money;
    use chrono::NaiveDate;

    fn receipt(id: i64, date: (i32, u32, u32), cents: i64, hash: &str) -> Receipt {
        Receipt::new(
            ReceiptId(id),
            "Joes Coffee",
            Some(Money::from_cents(cents)),
            NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            hash,
        )
    }

    #[test]
    fn identical_content_within_window_is_a_duplicate() {
        let d = DuplicateDetector::default();
        let incoming = receipt(2, (2024, 3, 2), 475, "aabb");
        let existing = vec![receipt(1, (2024, 3, 1), 475, "aabb")];
        assert_eq!(d.find_duplicate(&incoming, &existing), Some(ReceiptId(1)));
    }

    #[test]
    fn identical_content_survives_a_missing_amount() {
        // Same bytes uploaded twice; extraction lost the total on one copy.
        let d = DuplicateDetector::default();
        let mut incoming = receipt(2, (2024, 3, 1), 0, "aabb");
        incoming.amount = None;
        let existing = vec![receipt(1, (2024, 3, 1), 475, "aabb")];
        assert_eq!(d.find_duplicate(&incoming, &existing), Some(ReceiptId(1)));
    }

    #[test]
    fn window_runs_before_any_hash_comparison() {
        let d = DuplicateDetector::default();
        // Same content but dated 10 days apart: outside the window.
        let incoming = receipt(2, (2024, 3, 11), 475, "aabb");
        let existing = vec![receipt(1, (2024, 3, 1), 475, "aabb")];
        assert_eq!(d.find_duplicate(&incoming, &existing), None);
    }

    #[test]
    fn near_perceptual_match_with_amount_fit_is_a_duplicate() {
        let d = DuplicateDetector::default();
        let incoming = receipt(2, (2024, 3, 2), 480, "other").with_perceptual_hash(0b1111_0000);
        let existing =
            vec![receipt(1, (2024, 3, 1), 475, "stored").with_perceptual_hash(0b1111_0001)];
        assert_eq!(d.find_duplicate(&incoming, &existing), Some(ReceiptId(1)));
    }

    #[test]
    fn perceptual_distance_beyond_threshold_is_not_a_duplicate() {
        let d = DuplicateDetector::default();
        // 6 bits apart with a threshold of 5.
        let incoming = receipt(2, (2024, 3, 2), 475, "other").with_perceptual_hash(0b0011_1111);
        let existing = vec![receipt(1, (2024, 3, 1), 475, "stored").with_perceptual_hash(0)];
        assert_eq!(d.find_duplicate(&incoming, &existing), None);
    }

    #[test]
    fn amount_gap_rules_out_visually_similar_receipts() {
        let d = DuplicateDetector::default();
        // 74c apart with a 50c window; identical perceptual hashes.
        let incoming = receipt(2, (2024, 3, 2), 549, "other").with_perceptual_hash(42);
        let existing = vec![receipt(1, (2024, 3, 1), 475, "stored").with_perceptual_hash(42)];
        assert_eq!(d.find_duplicate(&incoming, &existing), None);
    }

    #[test]
    fn missing_amount_disqualifies_the_perceptual_path() {
        let d = DuplicateDetector::default();
        let mut incoming = receipt(2, (2024, 3, 2), 0, "other").with_perceptual_hash(42);
        incoming.amount = None;
        let existing = vec![receipt(1, (2024, 3, 1), 475, "stored").with_perceptual_hash(42)];
        assert_eq!(d.find_duplicate(&incoming, &existing), None);
    }

    #[test]
    fn unknown_dates_pass_the_widest_window() {
        let d = DuplicateDetector::default();
        let mut incoming = receipt(2, (2024, 3, 1), 475, "aabb");
        incoming.date = None;
        let existing = vec![receipt(1, (2024, 3, 1), 475, "aabb")];
        assert_eq!(d.find_duplicate(&incoming, &existing), Some(ReceiptId(1)));
    }

    #[test]
    fn a_receipt_never_duplicates_itself() {
        let d = DuplicateDetector::default();
        let r = receipt(1, (2024, 3, 1), 475, "aabb");
        assert_eq!(d.find_duplicate(&r, std::slice::from_ref(&r)), None);
    }

    #[test]
    fn first_hit_in_pool_order_wins() {
        let d = DuplicateDetector::default();
        let incoming = receipt(3, (2024, 3, 1), 475, "aabb");
        let existing = vec![
            receipt(1, (2024, 3, 1), 475, "aabb"),
            receipt(2, (2024, 3, 1), 475, "aabb"),
        ];
        assert_eq!(d.find_duplicate(&incoming, &existing), Some(ReceiptId(1)));
    }
}
