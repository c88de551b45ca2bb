use serde::{Deserialize, Serialize};
use thiserror::Error;

use acquit_classify::{
    BusinessClassifier, CalendarSource, ClassifyConfig, ContactSource, MerchantRuleTable,
    PatternStore,
};
use acquit_core::{RecordError, ReceiptId, Transaction};
use acquit_fingerprint::{DedupConfig, DuplicateDetector};
use acquit_match::{
    AutoMatcher, MatchConfig, MatchScorer, MerchantNormalizer, NormalizerConfig, RejectionCache,
    RejectionRecord,
};

/// Every tunable for one reconciliation run, in one TOML-loadable place.
/// All sections default, so a config file only needs the overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matching: MatchConfig,
    pub dedup: DedupConfig,
    pub normalizer: NormalizerConfig,
    pub classify: ClassifyConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

impl EngineConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

/// Long-lived run state: the matcher, detector and classifier built from one
/// config, the rejection cache, and whatever context providers the host
/// wired in. One context serves many batches.
pub struct ReconciliationContext {
    matcher: AutoMatcher,
    detector: DuplicateDetector,
    classifier: BusinessClassifier,
    rejections: RejectionCache,
    patterns: Box<dyn PatternStore>,
    calendar: Option<Box<dyn CalendarSource>>,
    contacts: Option<Box<dyn ContactSource>>,
    degraded_inputs: Vec<RecordError>,
}

impl ReconciliationContext {
    pub fn new(config: EngineConfig, patterns: Box<dyn PatternStore>) -> Self {
        let normalizer = MerchantNormalizer::new(config.normalizer);
        let matcher = AutoMatcher::new(MatchScorer::new(config.matching, normalizer.clone()));
        let detector = DuplicateDetector::new(config.dedup);
        let classifier =
            BusinessClassifier::new(config.classify, MerchantRuleTable::default(), normalizer);
        Self {
            matcher,
            detector,
            classifier,
            rejections: RejectionCache::new(),
            patterns,
            calendar: None,
            contacts: None,
            degraded_inputs: Vec::new(),
        }
    }

    pub fn with_rules(mut self, rules: MerchantRuleTable) -> Self {
        self.classifier.set_rules(rules);
        self
    }

    pub fn with_rejections(mut self, rejections: RejectionCache) -> Self {
        self.rejections = rejections;
        self
    }

    pub fn with_calendar(mut self, calendar: Box<dyn CalendarSource>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn with_contacts(mut self, contacts: Box<dyn ContactSource>) -> Self {
        self.contacts = Some(contacts);
        self
    }

    /// Record that an upstream input failed to load. Every run from this
    /// context carries the issue and reports itself degraded.
    pub fn mark_degraded_input(&mut self, issue: RecordError) {
        self.degraded_inputs.push(issue);
    }

    /// A human dismissed this pairing; never suggest it again.
    pub fn reject_pairing(&self, tx: &Transaction, receipt: ReceiptId) {
        let key = self.matcher.scorer().normalizer().normalize(&tx.merchant);
        self.rejections
            .insert(&RejectionRecord::for_pair(tx, &key, receipt));
    }

    /// A human corrected a business type; pin it for the merchant.
    pub fn learn_correction(&mut self, merchant: &str, business_type: &str) {
        self.classifier.learn(merchant, business_type);
    }

    pub fn matcher(&self) -> &AutoMatcher {
        &self.matcher
    }

    pub fn detector(&self) -> &DuplicateDetector {
        &self.detector
    }

    pub fn classifier(&self) -> &BusinessClassifier {
        &self.classifier
    }

    pub fn rejections(&self) -> &RejectionCache {
        &self.rejections
    }

    pub fn patterns(&self) -> &dyn PatternStore {
        self.patterns.as_ref()
    }

    pub fn calendar(&self) -> Option<&dyn CalendarSource> {
        self.calendar.as_deref()
    }

    pub fn contacts(&self) -> Option<&dyn ContactSource> {
        self.contacts.as_deref()
    }

    pub fn degraded_inputs(&self) -> &[RecordError] {
        &self.degraded_inputs
    }
}
