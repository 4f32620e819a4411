//! Ingestion configuration.
//!
//! Defaults target PokéAPI and the official-artwork sprite mirror.

use std::time::Duration;

use crate::error::{IngestError, Result};

/// PokéAPI list endpoint.
pub const DEFAULT_CATALOG_URL: &str = "https://pokeapi.co/api/v2/pokemon";

/// Artwork source; `{id}` is replaced with the item id.
pub const DEFAULT_ASSET_URL_TEMPLATE: &str = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork/{id}.png";

/// First generation.
pub const DEFAULT_CATALOG_SIZE: u32 = 151;

pub const DEFAULT_CONCURRENCY: usize = 5;

/// Public path prefix recorded in `image_path`.
pub const DEFAULT_IMAGE_PATH_PREFIX: &str = "/pokemon";

/// Retry schedule for a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry (doubles each retry)
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    /// Maximum number of requests a fetch will issue.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// The waits between attempts, in order: `d, 2d, 4d, ...`.
    pub fn delays(&self) -> impl Iterator<Item = Duration> {
        let initial = self.initial_delay;
        (0..self.max_retries).map(move |n| initial.saturating_mul(1u32 << n.min(31)))
    }

    /// Upper bound on time spent waiting when every attempt fails.
    pub fn max_total_wait(&self) -> Duration {
        self.delays().fold(Duration::ZERO, Duration::saturating_add)
    }
}

/// Configuration for one ingestion run.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Catalog list endpoint, without query string
    pub catalog_url: String,
    /// Number of items requested from the catalog
    pub catalog_size: u32,
    /// Maximum items processed at once
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub asset_url_template: String,
    pub image_path_prefix: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            catalog_size: DEFAULT_CATALOG_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            asset_url_template: DEFAULT_ASSET_URL_TEMPLATE.to_string(),
            image_path_prefix: DEFAULT_IMAGE_PATH_PREFIX.to_string(),
        }
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(IngestError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.catalog_size == 0 {
            return Err(IngestError::InvalidConfig(
                "catalog size must be at least 1".to_string(),
            ));
        }
        if !self.asset_url_template.contains("{id}") {
            return Err(IngestError::InvalidConfig(format!(
                "asset URL template has no {{id}} placeholder: {}",
                self.asset_url_template
            )));
        }
        Ok(())
    }

    /// `GET <base>?limit=<total>&offset=0`
    pub fn catalog_list_url(&self) -> String {
        format!(
            "{}?limit={}&offset=0",
            self.catalog_url.trim_end_matches('/'),
            self.catalog_size
        )
    }

    /// Source URL of the artwork for `id`.
    pub fn asset_url(&self, id: i64) -> String {
        self.asset_url_template.replace("{id}", &id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_retry_schedule() {
        let policy = RetryPolicy::default();
        let delays: Vec<_> = policy.delays().collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(2000)
            ]
        );
        assert_eq!(policy.max_attempts(), 4);
        assert_eq!(policy.max_total_wait(), Duration::from_millis(3500));
    }

    #[test]
    fn test_no_retries_means_no_wait() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.delays().count(), 0);
        assert_eq!(policy.max_total_wait(), Duration::ZERO);
    }

    #[test]
    fn test_catalog_list_url() {
        let config = IngestConfig::default();
        assert_eq!(
            config.catalog_list_url(),
            "https://pokeapi.co/api/v2/pokemon?limit=151&offset=0"
        );

        let config = IngestConfig {
            catalog_url: "http://localhost:8080/api/".to_string(),
            catalog_size: 3,
            ..IngestConfig::default()
        };
        assert_eq!(config.catalog_list_url(), "http://localhost:8080/api?limit=3&offset=0");
    }

    #[test]
    fn test_asset_url_substitutes_id() {
        let config = IngestConfig::default();
        assert_eq!(
            config.asset_url(1),
            "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork/1.png"
        );
    }

    #[test]
    fn test_validate() {
        assert!(IngestConfig::default().validate().is_ok());

        let zero_concurrency = IngestConfig {
            concurrency: 0,
            ..IngestConfig::default()
        };
        assert!(matches!(
            zero_concurrency.validate(),
            Err(IngestError::InvalidConfig(_))
        ));

        let empty_catalog = IngestConfig {
            catalog_size: 0,
            ..IngestConfig::default()
        };
        assert!(empty_catalog.validate().is_err());

        let no_placeholder = IngestConfig {
            asset_url_template: "https://example.com/art.png".to_string(),
            ..IngestConfig::default()
        };
        assert!(no_placeholder.validate().is_err());
    }
}
