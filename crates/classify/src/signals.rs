use serde::{Deserialize, Serialize};
use std::fmt;

/// One vote cast during classification. Every variant carries the label it
/// votes for, its weight, and the raw observation behind it, so a reviewer
/// can see exactly why a transaction was labelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSignal {
    ExplicitRule {
        rule: String,
        label: String,
        weight: u32,
    },
    ReceiptMetadata {
        observation: String,
        label: String,
        weight: u32,
    },
    CalendarContext {
        event: String,
        label: String,
        weight: u32,
    },
    ContactContext {
        contact: String,
        label: String,
        weight: u32,
    },
    HistoricalPattern {
        merchant: String,
        label: String,
        share: f32,
        samples: u32,
        weight: u32,
    },
    DefaultFallback {
        observation: String,
        label: String,
        weight: u32,
    },
}

impl ClassificationSignal {
    pub fn label(&self) -> &str {
        match self {
            ClassificationSignal::ExplicitRule { label, .. }
            | ClassificationSignal::ReceiptMetadata { label, .. }
            | ClassificationSignal::CalendarContext { label, .. }
            | ClassificationSignal::ContactContext { label, .. }
            | ClassificationSignal::HistoricalPattern { label, .. }
            | ClassificationSignal::DefaultFallback { label, .. } => label,
        }
    }

    pub fn weight(&self) -> u32 {
        match self {
            ClassificationSignal::ExplicitRule { weight, .. }
            | ClassificationSignal::ReceiptMetadata { weight, .. }
            | ClassificationSignal::CalendarContext { weight, .. }
            | ClassificationSignal::ContactContext { weight, .. }
            | ClassificationSignal::HistoricalPattern { weight, .. }
            | ClassificationSignal::DefaultFallback { weight, .. } => *weight,
        }
    }

    pub fn source(&self) -> SignalSource {
        match self {
            ClassificationSignal::ExplicitRule { .. } => SignalSource::ExplicitRule,
            ClassificationSignal::ReceiptMetadata { .. } => SignalSource::ReceiptMetadata,
            ClassificationSignal::CalendarContext { .. } => SignalSource::CalendarContext,
            ClassificationSignal::ContactContext { .. } => SignalSource::ContactContext,
            ClassificationSignal::HistoricalPattern { .. } => SignalSource::HistoricalPattern,
            ClassificationSignal::DefaultFallback { .. } => SignalSource::DefaultFallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSource {
    ExplicitRule,
    ReceiptMetadata,
    CalendarContext,
    ContactContext,
    HistoricalPattern,
    DefaultFallback,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::ExplicitRule => write!(f, "explicit_rule"),
            SignalSource::ReceiptMetadata => write!(f, "receipt_metadata"),
            SignalSource::CalendarContext => write!(f, "calendar_context"),
            SignalSource::ContactContext => write!(f, "contact_context"),
            SignalSource::HistoricalPattern => write!(f, "historical_pattern"),
            SignalSource::DefaultFallback => write!(f, "default_fallback"),
        }
    }
}
