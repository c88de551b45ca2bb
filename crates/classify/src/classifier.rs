use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use acquit_core::{Receipt, Transaction};
use acquit_match::MerchantNormalizer;

use crate::context::{CalendarEvent, CalendarSource, ContactSource};
use crate::history::PatternStore;
use crate::rules::{MerchantRuleTable, RuleMatch};
use crate::signals::{ClassificationSignal, SignalSource};

// ── Vote weights ─────────────────────────────────────────────────────────────

const ATTENDEE_WEIGHT: u32 = 15;
const DOMAIN_WEIGHT: u32 = 10;
const VENUE_WEIGHT: u32 = 10;
/// Extractor hints scale by their own confidence, up to this.
const HINT_WEIGHT: u32 = 10;
/// Same-day calendar events; events on adjacent days inside the window earn
/// `CALENDAR_ADJACENT_WEIGHT` instead.
const CALENDAR_WEIGHT: u32 = 20;
const CALENDAR_ADJACENT_WEIGHT: u32 = 12;
const CONTACT_WEIGHT: u32 = 15;
/// Historical patterns scale by label share and sample depth, up to this.
const HISTORY_WEIGHT: u32 = 30;
const FALLBACK_WEIGHT: u32 = 10;

/// Sum of every source's maximum weight for a single label. Confidence is the
/// winning label's share of this ceiling.
const MAX_VOTE_WEIGHT: u32 = 110;
/// Vote-derived confidence stays below the explicit-rule band.
const MAX_VOTE_CONFIDENCE: u8 = 90;
const MIN_CONFIDENCE: u8 = 5;
/// Sample count at which a historical pattern carries its full weight.
const HISTORY_FULL_SAMPLES: u32 = 10;

// ── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub label: String,
}

fn kw(keyword: &str, label: &str) -> KeywordRule {
    KeywordRule {
        keyword: keyword.to_string(),
        label: label.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    pub rule_exact_confidence: u8,
    pub rule_contains_confidence: u8,
    pub calendar_window_days: i64,
    /// Calendar event titles to business types.
    pub event_keywords: Vec<KeywordRule>,
    /// Card-network categories to business types, used by the fallback.
    pub category_keywords: Vec<KeywordRule>,
    /// Receipt venue text to business types.
    pub venue_keywords: Vec<KeywordRule>,
    /// Receipt sender domains to business types.
    pub domain_labels: Vec<KeywordRule>,
    /// Label voted by attendee lists and same-day contact interactions.
    pub attendee_label: String,
    pub default_label: String,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        ClassifyConfig {
            rule_exact_confidence: 100,
            rule_contains_confidence: 95,
            calendar_window_days: 1,
            event_keywords: vec![
                kw("lunch", "Meals"),
                kw("dinner", "Meals"),
                kw("breakfast", "Meals"),
                kw("coffee", "Meals"),
                kw("conference", "Travel"),
                kw("summit", "Travel"),
                kw("offsite", "Travel"),
            ],
            category_keywords: vec![
                kw("restaurant", "Meals"),
                kw("dining", "Meals"),
                kw("fast food", "Meals"),
                kw("coffee", "Meals"),
                kw("airline", "Travel"),
                kw("air travel", "Travel"),
                kw("hotel", "Lodging"),
                kw("lodging", "Lodging"),
                kw("taxi", "Transport"),
                kw("rideshare", "Transport"),
                kw("parking", "Transport"),
                kw("software", "Software"),
                kw("office supplies", "Office"),
                kw("shipping", "Office"),
            ],
            venue_keywords: vec![
                kw("restaurant", "Meals"),
                kw("cafe", "Meals"),
                kw("grill", "Meals"),
                kw("steakhouse", "Meals"),
                kw("hotel", "Lodging"),
                kw("airport", "Travel"),
                kw("conference center", "Travel"),
            ],
            domain_labels: vec![
                kw("github", "Software"),
                kw("atlassian", "Software"),
                kw("aws", "Software"),
                kw("lyft", "Transport"),
                kw("airbnb", "Lodging"),
                kw("marriott", "Lodging"),
                kw("hilton", "Lodging"),
                kw("delta", "Travel"),
                kw("united", "Travel"),
                kw("doordash", "Meals"),
                kw("grubhub", "Meals"),
            ],
            attendee_label: "Meals".to_string(),
            default_label: "General".to_string(),
        }
    }
}

fn match_keyword<'a>(rules: &'a [KeywordRule], text: &str) -> Option<&'a KeywordRule> {
    let text = text.to_lowercase();
    rules.iter().find(|r| text.contains(&r.keyword.to_lowercase()))
}

// ── Classifier ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    pub business_type: String,
    /// 0..=100. Explicit rules sit at the top of the range; weighted votes
    /// cap out at 90.
    pub confidence: u8,
    pub signals: Vec<ClassificationSignal>,
    /// Set when a context provider or the pattern store failed, so the label
    /// was produced from partial evidence.
    pub degraded: bool,
}

/// Assigns a business type to a transaction by combining explicit merchant
/// rules with weaker contextual evidence. Rules win outright; everything else
/// votes by weight.
#[derive(Debug, Clone, Default)]
pub struct BusinessClassifier {
    config: ClassifyConfig,
    rules: MerchantRuleTable,
    normalizer: MerchantNormalizer,
}

impl BusinessClassifier {
    pub fn new(
        config: ClassifyConfig,
        rules: MerchantRuleTable,
        normalizer: MerchantNormalizer,
    ) -> Self {
        Self {
            config,
            rules,
            normalizer,
        }
    }

    pub fn config(&self) -> &ClassifyConfig {
        &self.config
    }

    pub fn rules(&self) -> &MerchantRuleTable {
        &self.rules
    }

    /// Replace the rule table, e.g. after reloading a rule file.
    pub fn set_rules(&mut self, rules: MerchantRuleTable) {
        self.rules = rules;
    }

    /// Record a user correction as a top-priority rule under the merchant's
    /// canonical key.
    pub fn learn(&mut self, merchant: &str, business_type: &str) {
        let key = self.normalizer.normalize(merchant);
        if key.is_empty() {
            return;
        }
        self.rules.learn(&key, business_type);
    }

    pub fn classify(
        &self,
        transaction: &Transaction,
        receipt: Option<&Receipt>,
        calendar: Option<&dyn CalendarSource>,
        contacts: Option<&dyn ContactSource>,
        store: &dyn PatternStore,
    ) -> ClassificationResult {
        let merchant_key = self.normalizer.normalize(&transaction.merchant);

        // Explicit rules decide alone. Context providers are never consulted.
        if let Some(rule) = self.rules.find(&merchant_key) {
            let confidence = match rule.match_type {
                RuleMatch::Exact => self.config.rule_exact_confidence,
                RuleMatch::Contains => self.config.rule_contains_confidence,
            };
            return ClassificationResult {
                business_type: rule.business_type.clone(),
                confidence,
                signals: vec![ClassificationSignal::ExplicitRule {
                    rule: rule.name.clone(),
                    label: rule.business_type.clone(),
                    weight: MAX_VOTE_WEIGHT,
                }],
                degraded: false,
            };
        }

        let mut signals = Vec::new();
        let mut degraded = false;

        if let Some(receipt) = receipt {
            self.receipt_signals(receipt, &mut signals);
        }

        if let (Some(date), Some(calendar)) = (transaction.date, calendar) {
            match calendar.events_near(date, self.config.calendar_window_days) {
                Ok(events) => {
                    if let Some(signal) = self.calendar_signal(date, &events) {
                        signals.push(signal);
                    }
                }
                Err(e) => {
                    tracing::warn!("Calendar lookup failed for '{merchant_key}': {e}");
                    degraded = true;
                }
            }
        }

        if let (Some(date), Some(contacts)) = (transaction.date, contacts) {
            match contacts.contacts_near(date) {
                Ok(hits) => {
                    if let Some(hit) = hits.first() {
                        let contact = match &hit.organization {
                            Some(org) => format!("{} ({org})", hit.name),
                            None => hit.name.clone(),
                        };
                        signals.push(ClassificationSignal::ContactContext {
                            contact,
                            label: self.config.attendee_label.clone(),
                            weight: CONTACT_WEIGHT,
                        });
                    }
                }
                Err(e) => {
                    tracing::warn!("Contact lookup failed for '{merchant_key}': {e}");
                    degraded = true;
                }
            }
        }

        match store.merchant_profile(&merchant_key) {
            Ok(Some(profile)) => {
                let depth =
                    (profile.samples as f32 / HISTORY_FULL_SAMPLES as f32).min(1.0);
                let weight = (HISTORY_WEIGHT as f32 * profile.share * depth).round() as u32;
                if weight > 0 {
                    signals.push(ClassificationSignal::HistoricalPattern {
                        merchant: merchant_key.clone(),
                        label: profile.label,
                        share: profile.share,
                        samples: profile.samples,
                        weight,
                    });
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("Pattern store lookup failed for '{merchant_key}': {e}");
                degraded = true;
            }
        }

        // No evidence at all: fall back to the card category, then the
        // configured default.
        if signals.is_empty() {
            let category_hit = transaction.category.as_deref().and_then(|category| {
                match_keyword(&self.config.category_keywords, category)
                    .map(|rule| (format!("card category '{category}'"), rule.label.clone()))
            });
            let (observation, label) = category_hit.unwrap_or_else(|| {
                (
                    "no signals available".to_string(),
                    self.config.default_label.clone(),
                )
            });
            signals.push(ClassificationSignal::DefaultFallback {
                observation,
                label,
                weight: FALLBACK_WEIGHT,
            });
        }

        let (business_type, weight) = tally(&signals);
        let confidence = ((100.0 * weight as f32 / MAX_VOTE_WEIGHT as f32).round() as u8)
            .clamp(MIN_CONFIDENCE, MAX_VOTE_CONFIDENCE);

        ClassificationResult {
            business_type,
            confidence,
            signals,
            degraded,
        }
    }

    fn receipt_signals(&self, receipt: &Receipt, signals: &mut Vec<ClassificationSignal>) {
        let metadata = &receipt.metadata;
        if !metadata.attendees.is_empty() {
            signals.push(ClassificationSignal::ReceiptMetadata {
                observation: format!("{} attendees listed", metadata.attendees.len()),
                label: self.config.attendee_label.clone(),
                weight: ATTENDEE_WEIGHT,
            });
        }
        if let Some(rule) = metadata
            .sender_domain
            .as_deref()
            .and_then(|domain| match_keyword(&self.config.domain_labels, domain))
        {
            signals.push(ClassificationSignal::ReceiptMetadata {
                observation: format!("sender domain matches '{}'", rule.keyword),
                label: rule.label.clone(),
                weight: DOMAIN_WEIGHT,
            });
        }
        if let Some(rule) = metadata
            .venue
            .as_deref()
            .and_then(|venue| match_keyword(&self.config.venue_keywords, venue))
        {
            signals.push(ClassificationSignal::ReceiptMetadata {
                observation: format!("venue matches '{}'", rule.keyword),
                label: rule.label.clone(),
                weight: VENUE_WEIGHT,
            });
        }
        if let Some(hint) = receipt.business_hint.as_deref() {
            let weight = (HINT_WEIGHT as f32 * receipt.hint_confidence).round() as u32;
            if weight > 0 {
                signals.push(ClassificationSignal::ReceiptMetadata {
                    observation: format!("extractor hint ({:.0}%)", receipt.hint_confidence * 100.0),
                    label: hint.to_string(),
                    weight,
                });
            }
        }
    }

    /// At most one calendar vote, the heaviest matching event.
    fn calendar_signal(
        &self,
        date: NaiveDate,
        events: &[CalendarEvent],
    ) -> Option<ClassificationSignal> {
        let mut best: Option<(&CalendarEvent, &KeywordRule, u32)> = None;
        for event in events {
            let Some(rule) = match_keyword(&self.config.event_keywords, &event.title) else {
                continue;
            };
            let weight = if event.date == date {
                CALENDAR_WEIGHT
            } else {
                CALENDAR_ADJACENT_WEIGHT
            };
            if best.is_none_or(|(_, _, w)| weight > w) {
                best = Some((event, rule, weight));
            }
        }
        best.map(|(event, rule, weight)| ClassificationSignal::CalendarContext {
            event: event.title.clone(),
            label: rule.label.clone(),
            weight,
        })
    }
}

/// Winning label and its total weight. Ties prefer a history-backed label,
/// then the lexicographically smaller one.
fn tally(signals: &[ClassificationSignal]) -> (String, u32) {
    let mut votes: HashMap<&str, u32> = HashMap::new();
    for signal in signals {
        *votes.entry(signal.label()).or_insert(0) += signal.weight();
    }
    let history_backed: HashSet<&str> = signals
        .iter()
        .filter(|s| s.source() == SignalSource::HistoricalPattern)
        .map(|s| s.label())
        .collect();

    let mut ranked: Vec<(&str, u32)> = votes.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.cmp(&a.1)
            .then_with(|| history_backed.contains(b.0).cmp(&history_backed.contains(a.0)))
            .then_with(|| a.0.cmp(b.0))
    });
    ranked
        .first()
        .map(|(label, weight)| (label.to_string(), *weight))
        .unwrap_or_default()
}
