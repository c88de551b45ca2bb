//! Business-type classification for reconciled transactions.
//!
//! Explicit merchant rules decide outright; otherwise receipt metadata,
//! calendar and contact context, and historical patterns vote by weight.

pub mod classifier;
pub mod context;
pub mod history;
pub mod rules;
pub mod signals;

pub use classifier::{BusinessClassifier, ClassificationResult, ClassifyConfig, KeywordRule};
pub use context::{
    CalendarEvent, CalendarSource, ContactHit, ContactSource, ContextError, MockCalendar,
    MockContacts, UnavailableCalendar, UnavailableContacts,
};
pub use history::{
    InMemoryPatternStore, MerchantProfile, PatternStore, StoreError, UnavailableStore,
};
pub use rules::{ConfigError, MerchantRule, MerchantRuleTable, RuleMatch};
pub use signals::{ClassificationSignal, SignalSource};
