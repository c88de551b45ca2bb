use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ids::ReceiptId;
use super::money::Money;

/// A purchase receipt after extraction, carrying fingerprints and whatever
/// context the extraction pipeline recovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    pub merchant: String,
    /// None when extraction failed to find a total.
    pub amount: Option<Money>,
    pub date: Option<NaiveDate>,
    /// Hex-encoded SHA-256 of the receipt image bytes.
    pub content_hash: String,
    /// 64-bit average hash of the receipt image, when one was computed.
    pub perceptual_hash: Option<u64>,
    pub order_number: Option<String>,
    /// Suggested business type from the extraction pipeline, if any.
    pub business_hint: Option<String>,
    /// Confidence in the hint (0.0 = guessed, 1.0 = certain).
    pub hint_confidence: f32,
    pub metadata: ReceiptMetadata,
    pub state: ReceiptState,
}

impl Receipt {
    pub fn new(
        id: ReceiptId,
        merchant: &str,
        amount: Option<Money>,
        date: Option<NaiveDate>,
        content_hash: &str,
    ) -> Self {
        Receipt {
            id,
            merchant: merchant.to_string(),
            amount,
            date,
            content_hash: content_hash.to_string(),
            perceptual_hash: None,
            order_number: None,
            business_hint: None,
            hint_confidence: 0.0,
            metadata: ReceiptMetadata::default(),
            state: ReceiptState::Available,
        }
    }

    pub fn with_hint(mut self, label: &str, confidence: f32) -> Self {
        self.business_hint = Some(label.to_string());
        self.hint_confidence = confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_perceptual_hash(mut self, hash: u64) -> Self {
        self.perceptual_hash = Some(hash);
        self
    }
}

/// Side-channel context captured alongside the receipt itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReceiptMetadata {
    /// Names listed on the receipt (e.g. a reservation confirmation).
    pub attendees: Vec<String>,
    /// Domain of the email address that delivered the receipt.
    pub sender_domain: Option<String>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptState {
    Available,
    Consumed,
    Duplicate,
}

impl std::fmt::Display for ReceiptState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReceiptState::Available => write!(f, "available"),
            ReceiptState::Consumed => write!(f, "consumed"),
            ReceiptState::Duplicate => write!(f, "duplicate"),
        }
    }
}

impl std::str::FromStr for ReceiptState {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ReceiptState::Available),
            "consumed" => Ok(ReceiptState::Consumed),
            "duplicate" => Ok(ReceiptState::Duplicate),
            other => Err(format!("Unknown receipt state: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_receipt_is_available() {
        let r = Receipt::new(ReceiptId(1), "Joe's Coffee Shop", None, None, "abc123");
        assert_eq!(r.state, ReceiptState::Available);
        assert!(r.amount.is_none());
        assert!(r.perceptual_hash.is_none());
    }

    #[test]
    fn hint_confidence_is_clamped() {
        let r = Receipt::new(ReceiptId(1), "Uber", None, None, "h").with_hint("Transport", 1.7);
        assert_eq!(r.hint_confidence, 1.0);
        let r = Receipt::new(ReceiptId(2), "Uber", None, None, "h").with_hint("Transport", -0.2);
        assert_eq!(r.hint_confidence, 0.0);
    }

    #[test]
    fn receipt_state_roundtrip() {
        use std::str::FromStr;
        for state in [
            ReceiptState::Available,
            ReceiptState::Consumed,
            ReceiptState::Duplicate,
        ] {
            assert_eq!(ReceiptState::from_str(&state.to_string()).unwrap(), state);
        }
    }
}
