use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::ids::{ReceiptId, TransactionId};

/// Which input record a problem is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordRef {
    Transaction(TransactionId),
    Receipt(ReceiptId),
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordRef::Transaction(id) => write!(f, "transaction {id}"),
            RecordRef::Receipt(id) => write!(f, "receipt {id}"),
        }
    }
}

/// A problem with one input record or one external input. A missing field
/// skips the record; a malformed date degrades it; unavailable stores and
/// context providers degrade the run as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing required field '{field}' on {record}")]
    MissingField {
        record: RecordRef,
        field: &'static str,
    },
    #[error("date missing or unparseable on {record}")]
    MalformedDate { record: RecordRef },
    #[error("context provider unavailable: {detail}")]
    ContextUnavailable { detail: String },
    #[error("store unavailable: {detail}")]
    StorageUnavailable { detail: String },
}

impl RecordError {
    /// The record this error points at, when it points at one.
    pub fn record(&self) -> Option<RecordRef> {
        match self {
            RecordError::MissingField { record, .. } => Some(*record),
            RecordError::MalformedDate { record } => Some(*record),
            RecordError::ContextUnavailable { .. } => None,
            RecordError::StorageUnavailable { .. } => None,
        }
    }

    /// Whether the record is dropped from the run entirely, as opposed to
    /// processed in a degraded mode.
    pub fn skips_record(&self) -> bool {
        matches!(self, RecordError::MissingField { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_record() {
        let e = RecordError::MissingField {
            record: RecordRef::Receipt(ReceiptId(4)),
            field: "amount",
        };
        assert_eq!(e.to_string(), "missing required field 'amount' on receipt 4");

        let e = RecordError::MalformedDate {
            record: RecordRef::Transaction(TransactionId(17)),
        };
        assert_eq!(e.to_string(), "date missing or unparseable on transaction 17");
    }

    #[test]
    fn only_missing_fields_skip() {
        let skip = RecordError::MissingField {
            record: RecordRef::Transaction(TransactionId(1)),
            field: "merchant",
        };
        assert!(skip.skips_record());

        let degrade = RecordError::MalformedDate {
            record: RecordRef::Transaction(TransactionId(1)),
        };
        assert!(!degrade.skips_record());

        let run_level = RecordError::StorageUnavailable {
            detail: "rejection store offline".to_string(),
        };
        assert!(!run_level.skips_record());
        assert!(run_level.record().is_none());
    }
}
