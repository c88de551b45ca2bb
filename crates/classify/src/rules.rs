use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerchantRule {
    pub name: String,
    pub priority: i32,
    /// Matched against the normalized merchant key, case-insensitively.
    pub pattern: String,
    #[serde(default)]
    pub match_type: RuleMatch,
    pub business_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RuleMatch {
    #[default]
    Contains,
    Exact,
}

impl std::str::FromStr for RuleMatch {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(RuleMatch::Contains),
            "exact" => Ok(RuleMatch::Exact),
            other => Err(format!("Unknown rule match type: '{other}'")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Priority-ordered merchant-to-business-type rules. Explicit rules are the
/// strongest classification signal and the vehicle for user corrections.
#[derive(Debug, Clone)]
pub struct MerchantRuleTable {
    rules: Vec<MerchantRule>,
}

impl MerchantRuleTable {
    pub fn new(mut rules: Vec<MerchantRule>) -> Self {
        // Highest priority first.
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { rules }
    }

    /// Load a `[[rules]]` table from TOML.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        #[derive(Deserialize)]
        struct RuleFile {
            #[serde(default)]
            rules: Vec<MerchantRule>,
        }
        let file: RuleFile = toml::from_str(content)?;
        Ok(Self::new(file.rules))
    }

    pub fn find(&self, merchant_key: &str) -> Option<&MerchantRule> {
        let key = merchant_key.to_lowercase();
        self.rules.iter().find(|r| match r.match_type {
            RuleMatch::Contains => key.contains(&r.pattern.to_lowercase()),
            RuleMatch::Exact => key == r.pattern.to_lowercase(),
        })
    }

    /// Record a user correction as a top-priority exact rule, replacing any
    /// earlier learned rule for the same merchant.
    pub fn learn(&mut self, merchant_key: &str, business_type: &str) {
        self.rules.retain(|r| {
            !(r.match_type == RuleMatch::Exact
                && r.pattern == merchant_key
                && r.name.starts_with("learned:"))
        });
        let top = self.rules.first().map_or(0, |r| r.priority) + 1;
        self.rules.insert(
            0,
            MerchantRule {
                name: format!("learned: {merchant_key}"),
                priority: top,
                pattern: merchant_key.to_string(),
                match_type: RuleMatch::Exact,
                business_type: business_type.to_string(),
            },
        );
    }

    pub fn rules(&self) -> &[MerchantRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub const DEFAULT_MERCHANT_RULES: &[(&str, &str, i32)] = &[
    ("uber eats", "Meals", 60),
    ("doordash", "Meals", 50),
    ("grubhub", "Meals", 50),
    ("starbucks", "Meals", 30),
    ("github", "Software", 50),
    ("aws", "Software", 50),
    ("google cloud", "Software", 50),
    ("digitalocean", "Software", 50),
    ("zoom", "Software", 40),
    ("slack", "Software", 40),
    ("united airlines", "Travel", 50),
    ("delta air", "Travel", 50),
    ("american airlines", "Travel", 50),
    ("southwest", "Travel", 40),
    ("marriott", "Lodging", 50),
    ("hilton", "Lodging", 50),
    ("airbnb", "Lodging", 50),
    ("uber", "Transport", 30),
    ("lyft", "Transport", 40),
    ("fedex", "Office", 40),
    ("usps", "Office", 40),
    ("staples", "Office", 40),
];

impl Default for MerchantRuleTable {
    fn default() -> Self {
        let rules = DEFAULT_MERCHANT_RULES
            .iter()
            .map(|(pattern, business_type, priority)| MerchantRule {
                name: pattern.to_string(),
                priority: *priority,
                pattern: pattern.to_string(),
                match_type: RuleMatch::Contains,
                business_type: business_type.to_string(),
            })
            .collect();
        Self::new(rules)
    }
}
