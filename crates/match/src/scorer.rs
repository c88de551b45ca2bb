use acquit_core::{MatchCandidate, MatchReason, Receipt, Transaction};
use serde::{Deserialize, Serialize};

use crate::normalize::MerchantNormalizer;
use crate::similarity::token_set_ratio;

/// Hard gates and thresholds for pair scoring. All fields have sane
/// defaults; amounts are in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub date_tolerance_days: i64,
    pub amount_tolerance_cents: i64,
    /// Minimum merchant similarity (0-100) for a pair to be considered.
    pub merchant_threshold: u8,
    /// Score at or above which an assignment skips manual review.
    pub auto_approve_threshold: u8,
    /// Candidates below this score are not worth surfacing at all.
    pub min_viable_score: u8,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            date_tolerance_days: 3,
            amount_tolerance_cents: 100,
            merchant_threshold: 80,
            auto_approve_threshold: 90,
            min_viable_score: 50,
        }
    }
}

const MERCHANT_POINTS: f64 = 40.0;
const AMOUNT_POINTS: f64 = 40.0;
const DATE_POINTS: f64 = 20.0;

/// Scores transaction/receipt pairings: three hard gates, then a weighted
/// composite of merchant similarity, amount closeness and date closeness.
pub struct MatchScorer {
    config: MatchConfig,
    normalizer: MerchantNormalizer,
}

impl MatchScorer {
    pub fn new(config: MatchConfig, normalizer: MerchantNormalizer) -> Self {
        Self { config, normalizer }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn normalizer(&self) -> &MerchantNormalizer {
        &self.normalizer
    }

    /// Returns `None` when the pair fails a hard gate (amount beyond
    /// tolerance, dates too far apart, or merchants too dissimilar), or when
    /// the receipt has no extracted amount to compare against.
    pub fn score(&self, tx: &Transaction, receipt: &Receipt) -> Option<MatchCandidate> {
        let receipt_amount = receipt.amount?;
        let amount_diff = tx.amount.abs_diff(receipt_amount);
        let diff_cents = amount_diff.to_cents();
        if diff_cents > self.config.amount_tolerance_cents {
            return None;
        }

        let date_diff = match (tx.date, receipt.date) {
            (Some(t), Some(r)) => {
                let days = (t - r).num_days().abs();
                if days > self.config.date_tolerance_days {
                    return None;
                }
                Some(days)
            }
            // An unknown date passes the widest window but earns no points.
            _ => None,
        };

        let mut reasons = Vec::new();

        let order_hit = order_number_hit(tx, receipt);
        let similarity = if order_hit {
            100
        } else {
            token_set_ratio(
                &self.normalizer.normalize(&tx.merchant),
                &self.normalizer.normalize(&receipt.merchant),
            )
        };
        if similarity < self.config.merchant_threshold {
            return None;
        }
        if order_hit {
            reasons.push(MatchReason::OrderNumber);
        }
        reasons.push(MatchReason::Merchant(similarity));

        // Amount: full marks at zero difference, linear toward zero at the
        // tolerance boundary, with floors for the common tip/rounding bands.
        let amount_points = if diff_cents == 0 {
            reasons.push(MatchReason::ExactAmount);
            AMOUNT_POINTS
        } else {
            let linear =
                AMOUNT_POINTS * (1.0 - diff_cents as f64 / self.config.amount_tolerance_cents as f64);
            if diff_cents <= 1 {
                reasons.push(MatchReason::CloseAmount);
                linear.max(38.0)
            } else if diff_cents <= 50 {
                reasons.push(MatchReason::CloseAmount);
                linear.max(30.0)
            } else {
                reasons.push(MatchReason::AmountWithinTolerance);
                linear.max(0.0)
            }
        };

        let date_points = match date_diff {
            Some(0) => {
                reasons.push(MatchReason::ExactDate);
                DATE_POINTS
            }
            Some(days) => {
                reasons.push(MatchReason::DateDays(days));
                DATE_POINTS * (1.0 - days as f64 / self.config.date_tolerance_days as f64)
            }
            None => {
                reasons.push(MatchReason::DateUnknown);
                0.0
            }
        };

        let merchant_points = MERCHANT_POINTS * f64::from(similarity) / 100.0;
        let score = (merchant_points + amount_points + date_points)
            .round()
            .clamp(0.0, 100.0) as u8;

        Some(MatchCandidate {
            transaction: tx.id,
            receipt: receipt.id,
            score,
            merchant_similarity: similarity,
            amount_diff,
            date_diff,
            reasons,
            auto_approve: score >= self.config.auto_approve_threshold,
        })
    }
}

/// An order number from the receipt appearing verbatim in the card
/// descriptor pins the merchant comparison regardless of naming.
fn order_number_hit(tx: &Transaction, receipt: &Receipt) -> bool {
    receipt
        .order_number
        .as_deref()
        .is_some_and(|n| n.len() >= 4 && tx.merchant.to_lowercase().contains(&n.to_lowercase()))
}
