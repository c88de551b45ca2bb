pub mod matcher;
pub mod normalize;
pub mod rejections;
pub mod scorer;
pub mod similarity;
pub(crate) mod util;

pub use matcher::AutoMatcher;
pub use normalize::{
    AggregatorRule, ChainAlias, ConfigError, MerchantNormalizer, NormalizerConfig,
};
pub use rejections::{RejectionCache, RejectionRecord};
pub use scorer::{MatchConfig, MatchScorer};
pub use similarity::token_set_ratio;
