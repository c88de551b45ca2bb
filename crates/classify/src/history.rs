use std::collections::HashMap;
use std::sync::RwLock;

use chrono::NaiveDate;
use thiserror::Error;

/// Dominant business type observed for a merchant across past runs.
#[derive(Debug, Clone, PartialEq)]
pub struct MerchantProfile {
    pub label: String,
    /// Fraction of observations carrying `label`, in 0.0..=1.0.
    pub share: f32,
    pub samples: u32,
    pub last_seen: Option<NaiveDate>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Pattern store unavailable: {0}")]
    Unavailable(String),
}

/// Source of historical classification patterns, keyed by normalized
/// merchant. Backends that cannot answer return `StoreError` so callers can
/// degrade instead of mislabeling.
pub trait PatternStore: Send + Sync {
    fn merchant_profile(&self, merchant_key: &str) -> Result<Option<MerchantProfile>, StoreError>;
}

/// Pattern store backed by a map of raw observations.
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    observations: RwLock<HashMap<String, Vec<(String, Option<NaiveDate>)>>>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, merchant_key: &str, label: &str, date: Option<NaiveDate>) {
        self.observations
            .write()
            .unwrap()
            .entry(merchant_key.to_lowercase())
            .or_default()
            .push((label.to_string(), date));
    }
}

impl PatternStore for InMemoryPatternStore {
    fn merchant_profile(&self, merchant_key: &str) -> Result<Option<MerchantProfile>, StoreError> {
        let observations = self.observations.read().unwrap();
        let Some(entries) = observations.get(&merchant_key.to_lowercase()) else {
            return Ok(None);
        };
        if entries.is_empty() {
            return Ok(None);
        }

        let mut counts: HashMap<&str, u32> = HashMap::new();
        for (label, _) in entries {
            *counts.entry(label.as_str()).or_insert(0) += 1;
        }
        // Dominant label; ties go to the lexicographically smaller one so
        // profiles are stable across runs.
        let (label, count) = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(label, count)| (label.to_string(), *count))
            .ok_or_else(|| StoreError::Unavailable("empty observation set".to_string()))?;

        let samples = entries.len() as u32;
        let last_seen = entries.iter().filter_map(|(_, d)| *d).max();
        Ok(Some(MerchantProfile {
            label,
            share: count as f32 / samples as f32,
            samples,
            last_seen,
        }))
    }
}

/// Store that always fails, for exercising degraded-mode paths.
#[derive(Debug, Default)]
pub struct UnavailableStore;

impl PatternStore for UnavailableStore {
    fn merchant_profile(&self, _merchant_key: &str) -> Result<Option<MerchantProfile>, StoreError> {
        Err(StoreError::Unavailable("store offline".to_string()))
    }
}
