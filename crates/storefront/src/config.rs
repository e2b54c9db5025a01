use serde::{Deserialize, Serialize};

use vitrine_infra::CatalogConfig;

/// Prefetch settings for one listing. Page size comes from the pages themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Load the next page once fewer than this many pixels remain below the viewport.
    pub threshold_px: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self { threshold_px: 1000 }
    }
}

impl From<&CatalogConfig> for FeedConfig {
    fn from(config: &CatalogConfig) -> Self {
        Self {
            threshold_px: config.scroll_threshold_px,
        }
    }
}
