pub mod assignment;
pub mod error;
pub mod ids;
pub mod money;
pub mod receipt;
pub mod transaction;

pub use assignment::{MatchAssignment, MatchCandidate, MatchReason};
pub use error::{RecordError, RecordRef};
pub use ids::{ReceiptId, TransactionId};
pub use money::Money;
pub use receipt::{Receipt, ReceiptMetadata, ReceiptState};
pub use transaction::{MatchStatus, Transaction};
