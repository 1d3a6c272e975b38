use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::model::SourceId;

/// Main configuration structure for Repo-Sync
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub registry: RegistryConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    pub http: HttpConfig,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceEntry>,
}

impl Config {
    /// Returns the enabled source entries, in file order
    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceEntry> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Looks up the entry configured for `source`
    pub fn source_entry(&self, source: SourceId) -> Option<&SourceEntry> {
        self.sources.iter().find(|s| s.id == source.as_tag())
    }
}

/// Connection settings for the link/record registry
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the Directus instance
    pub url: String,

    /// Bearer token sent with every request
    pub token: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_registry_timeout")]
    pub timeout_secs: u64,

    /// How many times the primary write of a save/update is retried
    #[serde(rename = "write-retries", default = "default_write_retries")]
    pub write_retries: u32,
}

/// Scrape pipeline tuning
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Number of detail pages scraped concurrently per batch
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Delay between consecutive catalog page fetches (milliseconds)
    #[serde(rename = "page-delay-ms", default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    #[serde(rename = "listing-timeout-secs", default = "default_listing_timeout")]
    pub listing_timeout_secs: u64,

    #[serde(rename = "detail-timeout-secs", default = "default_detail_timeout")]
    pub detail_timeout_secs: u64,

    /// Upper bound on catalog pages visited per entry point
    #[serde(rename = "max-pages", default = "default_max_pages")]
    pub max_pages: u32,

    /// Consecutive failed catalog pages tolerated before an entry point is abandoned
    #[serde(
        rename = "max-consecutive-page-errors",
        default = "default_max_consecutive_page_errors"
    )]
    pub max_consecutive_page_errors: u32,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            page_delay_ms: default_page_delay_ms(),
            listing_timeout_secs: default_listing_timeout(),
            detail_timeout_secs: default_detail_timeout(),
            max_pages: default_max_pages(),
            max_consecutive_page_errors: default_max_consecutive_page_errors(),
        }
    }
}

impl ScraperConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn listing_timeout(&self) -> Duration {
        Duration::from_secs(self.listing_timeout_secs)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_secs(self.detail_timeout_secs)
    }
}

/// Request identity sent to the bank websites
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    #[serde(rename = "accept-language", default)]
    pub accept_language: Option<String>,

    /// Extra headers added to every site request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// One `[[source]]` table
#[derive(Debug, Clone, Deserialize)]
pub struct SourceEntry {
    /// Source tag (e.g. "banesco")
    pub id: String,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Overrides the site's origin, mostly useful for testing against a mirror
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Cookies sent with every request to this source
    #[serde(default)]
    pub cookies: BTreeMap<String, String>,
}

impl SourceEntry {
    /// Parsed source id; validation guarantees this is `Some` for loaded configs
    pub fn source_id(&self) -> Option<SourceId> {
        SourceId::from_tag(&self.id)
    }
}

fn default_registry_timeout() -> u64 {
    30
}

fn default_write_retries() -> u32 {
    3
}

fn default_batch_size() -> usize {
    5
}

fn default_page_delay_ms() -> u64 {
    1000
}

fn default_listing_timeout() -> u64 {
    30
}

fn default_detail_timeout() -> u64 {
    120
}

fn default_max_pages() -> u32 {
    200
}

fn default_max_consecutive_page_errors() -> u32 {
    3
}

fn default_enabled() -> bool {
    true
}
