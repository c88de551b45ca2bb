pub mod content;
pub mod dedup;
pub mod perceptual;

pub use content::{content_hash, sha256_bytes, to_hex};
pub use dedup::{DedupConfig, DuplicateDetector};
pub use perceptual::{average_hash, average_hash_bytes, hamming, FingerprintError};
