use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_domain,
    r"(?i)\b([a-z0-9][a-z0-9\-]*)\.(?:com|net|org|io|co|us|ca|uk|tv|fm|ai|app|dev)\b(/[a-z0-9\-]*)?");
re!(re_path_segment, r"(?i)/(?:bill|billing|subscription|pay|payments?)\b");
re!(re_legal_suffix, r"(?i)(?:^|\s)(?:inc|llc|corp|ltd|co)\b\.?");
re!(re_street_address,
    r"(?i)\b\d{1,5}\s+[a-z]+\.?\s+(?:st|str|street|ave|avenue|blvd|boulevard|rd|road|dr|drive|hwy|highway|ln|lane|way|pkwy|parkway|plaza|sq|square)\b\.?");
re!(re_hash_code, r"#\d+");

// ── Configuration ────────────────────────────────────────────────────────────

/// A delivery platform whose descriptors should keep both the platform and
/// the sub-merchant, e.g. "DOORDASH*CHIPOTLE" -> "DoorDash - Chipotle".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorRule {
    pub name: String,
    /// Lowercase descriptor prefixes that identify the platform.
    pub patterns: Vec<String>,
}

/// Substring-to-canonical-name mapping for chains whose descriptors vary
/// per location ("MCDONALD'S F32451" -> "McDonald's").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainAlias {
    pub contains: String,
    pub canonical: String,
}

/// Tables driving [`MerchantNormalizer`]. Sections omitted from a TOML file
/// keep their built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub aggregators: Vec<AggregatorRule>,
    /// Payment-processor prefixes to strip outright ("SQ *", "TST*").
    pub processor_prefixes: Vec<String>,
    pub chain_aliases: Vec<ChainAlias>,
    /// Location words dropped from descriptors ("airport", "terminal").
    pub venue_qualifiers: Vec<String>,
}

impl NormalizerConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Append another config's tables to this one. File entries land after
    /// the built-ins, so built-in alias order still wins on overlap.
    pub fn merge(&mut self, other: NormalizerConfig) {
        self.aggregators.extend(other.aggregators);
        self.processor_prefixes.extend(other.processor_prefixes);
        self.chain_aliases.extend(other.chain_aliases);
        self.venue_qualifiers.extend(other.venue_qualifiers);
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

fn alias(contains: &str, canonical: &str) -> ChainAlias {
    ChainAlias {
        contains: contains.to_string(),
        canonical: canonical.to_string(),
    }
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        NormalizerConfig {
            aggregators: vec![
                AggregatorRule {
                    name: "DoorDash".to_string(),
                    patterns: vec!["doordash".into(), "dd *".into(), "dd*".into()],
                },
                AggregatorRule {
                    name: "Uber Eats".to_string(),
                    patterns: vec!["uber eats".into(), "ubereats".into(), "uber *eats".into()],
                },
                AggregatorRule {
                    name: "Grubhub".to_string(),
                    patterns: vec!["grubhub".into(), "gh *".into()],
                },
                AggregatorRule {
                    name: "Postmates".to_string(),
                    patterns: vec!["postmates".into()],
                },
                AggregatorRule {
                    name: "Instacart".to_string(),
                    patterns: vec!["instacart".into()],
                },
            ],
            processor_prefixes: vec![
                "sq *".into(),
                "sq*".into(),
                "tst* ".into(),
                "tst*".into(),
                "py *".into(),
                "paypal *".into(),
                "pp*".into(),
            ],
            // Order matters: more specific entries go before shorter
            // substrings they contain.
            chain_aliases: vec![
                alias("mcdonald", "McDonald's"),
                alias("starbucks", "Starbucks"),
                alias("amazon mktp", "Amazon"),
                alias("amzn", "Amazon"),
                alias("wal-mart", "Walmart"),
                alias("wal mart", "Walmart"),
                alias("wm supercenter", "Walmart"),
                alias("7-eleven", "7-Eleven"),
                alias("7 eleven", "7-Eleven"),
                alias("chick-fil-a", "Chick-fil-A"),
                alias("chickfila", "Chick-fil-A"),
                alias("dunkin", "Dunkin'"),
                alias("in-n-out", "In-N-Out Burger"),
                alias("trader joe", "Trader Joe's"),
                alias("whole foods", "Whole Foods"),
                alias("wholefds", "Whole Foods"),
                alias("home depot", "The Home Depot"),
                alias("costco whse", "Costco"),
                alias("costco", "Costco"),
                alias("shell oil", "Shell"),
                alias("exxonmobil", "Exxon"),
            ],
            venue_qualifiers: vec![
                "airport".into(),
                "terminal".into(),
                "station".into(),
                "downtown".into(),
                "midtown".into(),
                "uptown".into(),
                "mall".into(),
                "outlet".into(),
                "outlets".into(),
                "suite".into(),
                "ste".into(),
                "unit".into(),
                "bldg".into(),
                "floor".into(),
            ],
        }
    }
}

// ── Normalizer ───────────────────────────────────────────────────────────────

/// Reduces raw card-network descriptors and extracted receipt names to a
/// shared canonical merchant key, so "SQ *JOES COFFEE" and "Joe's Coffee
/// Shop" land close enough to compare.
#[derive(Debug, Clone, Default)]
pub struct MerchantNormalizer {
    config: NormalizerConfig,
}

impl MerchantNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    pub fn normalize(&self, raw: &str) -> String {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return String::new();
        }
        let lower = trimmed.to_lowercase();

        // Delivery platforms keep both halves of the name; everything after
        // the platform prefix is the sub-merchant.
        if let Some((platform, rest)) = self.match_aggregator(&lower) {
            return match self.sub_merchant(rest) {
                Some(sub) => format!("{platform} - {sub}"),
                None => platform.to_string(),
            };
        }

        // Processor prefixes are pure noise; drop them and continue.
        let lower = self.strip_processor_prefix(&lower);

        let mut s = lower.replace(['\'', '\u{2019}'], "");
        if let Some(rest) = s.strip_prefix("the ") {
            s = rest.to_string();
        }
        s = re_legal_suffix().replace_all(&s, " ").to_string();
        s = re_domain().replace_all(&s, "$1").to_string();
        s = re_path_segment().replace_all(&s, " ").to_string();

        // First alias pass runs before address stripping, which would
        // otherwise destroy city-suffixed venue names.
        if let Some(canonical) = self.alias(&s) {
            return canonical;
        }

        s = re_street_address().replace_all(&s, " ").to_string();
        s = re_hash_code().replace_all(&s, " ").to_string();

        let kept: Vec<&str> = s
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .filter(|t| !self.config.venue_qualifiers.iter().any(|q| q == t))
            .filter(|t| !is_reference_code(t))
            .collect();

        // Second alias pass on the cleaned text catches entries the raw
        // descriptor buried under store numbers and city names.
        let cleaned = kept.join(" ");
        if let Some(canonical) = self.alias(&cleaned) {
            return canonical;
        }

        let mut out: Vec<&str> = Vec::new();
        for (i, t) in kept.iter().enumerate() {
            // Two-letter brands ("BP", "GO") survive only in first position.
            if t.len() >= 3 || (i == 0 && t.len() == 2) {
                out.push(t);
                if out.len() == 3 {
                    break;
                }
            }
        }
        out.join(" ")
    }

    fn match_aggregator<'a>(&'a self, lower: &'a str) -> Option<(&'a str, &'a str)> {
        for rule in &self.config.aggregators {
            for pattern in &rule.patterns {
                if let Some(rest) = lower.strip_prefix(pattern.as_str()) {
                    return Some((rule.name.as_str(), rest));
                }
            }
        }
        None
    }

    fn sub_merchant(&self, rest: &str) -> Option<String> {
        let words: Vec<String> = rest
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .filter(|t| !is_reference_code(t))
            .take(3)
            .map(title_case)
            .collect();
        if words.is_empty() {
            None
        } else {
            Some(words.join(" "))
        }
    }

    fn strip_processor_prefix<'a>(&self, lower: &'a str) -> &'a str {
        for prefix in &self.config.processor_prefixes {
            if let Some(rest) = lower.strip_prefix(prefix.as_str()) {
                return rest.trim_start_matches(['*', ' ']);
            }
        }
        lower
    }

    fn alias(&self, text: &str) -> Option<String> {
        self.config
            .chain_aliases
            .iter()
            .find(|a| text.contains(a.contains.as_str()))
            .map(|a| a.canonical.clone())
    }
}

/// Store numbers, confirmation codes and similar per-purchase noise: long
/// mixed alphanumerics, or digit runs of four or more.
fn is_reference_code(token: &str) -> bool {
    let has_digit = token.chars().any(|c| c.is_ascii_digit());
    let has_alpha = token.chars().any(|c| c.is_alphabetic());
    (token.len() >= 6 && has_digit && has_alpha) || (token.len() >= 4 && !has_alpha && has_digit)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
