//! The reconciliation pipeline: receipt intake screening, candidate scoring,
//! serial claiming and business-type classification over one batch.
//!
//! Scoring and classification fan out with rayon; the claim pass between
//! them stays serial so results are deterministic for identical inputs.

pub mod context;
pub mod run;

pub use context::{ConfigError, EngineConfig, ReconciliationContext};
pub use run::{
    reconcile_batch, screen_receipts, ClassificationAssignment, IntakeReport, RunSummary,
};
