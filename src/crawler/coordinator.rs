//! Run coordination
//!
//! Wires configuration, the HTTP client, site strategies and the registry into
//! the two entry points of the pipeline:
//!
//! - `sync_source`: discover, reconcile, register, then batch-scrape the
//!   unscraped links of one source
//! - `reprocess_stale`: re-scrape every stale link and update it in place

use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;

use crate::config::Config;
use crate::crawler::{
    build_http_client, discover, register_new_links, BatchRunner, ExtractorSet, SiteExtractor,
    StaleReprocessor,
};
use crate::model::SourceId;
use crate::output::{ReprocessReport, SyncReport};
use crate::registry::Registry;
use crate::sites::{site_for, Site};
use crate::Result;

const RUN_LABEL_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Label identifying one sync run of `source` in the logs
pub fn sync_run_label(source: SourceId) -> String {
    format!(
        "{}_repossessed_assets_{}",
        source,
        Utc::now().format(RUN_LABEL_FORMAT)
    )
}

/// Label identifying one stale reprocessing run in the logs
pub fn stale_run_label() -> String {
    format!("reprocess_stale_links_{}", Utc::now().format(RUN_LABEL_FORMAT))
}

/// Main pipeline coordinator
pub struct Coordinator {
    config: Arc<Config>,
    registry: Arc<dyn Registry>,
    client: Client,
}

impl Coordinator {
    /// Creates a coordinator
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `registry` - Store for links, records and images
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(SyncError)` - The HTTP client could not be built
    pub fn new(config: Config, registry: Arc<dyn Registry>) -> Result<Self> {
        let client = build_http_client(&config.http)?;
        Ok(Self {
            config: Arc::new(config),
            registry,
            client,
        })
    }

    fn site(&self, source: SourceId) -> Result<Arc<dyn Site>> {
        let base_url = self
            .config
            .source_entry(source)
            .and_then(|entry| entry.base_url.as_deref());
        site_for(source, base_url)
    }

    fn extractor(&self, site: Arc<dyn Site>) -> SiteExtractor {
        let cookies = self
            .config
            .source_entry(site.source())
            .map(|entry| entry.cookies.clone())
            .unwrap_or_default();
        SiteExtractor::new(
            self.client.clone(),
            site,
            self.config.scraper.detail_timeout(),
            cookies,
        )
    }

    /// Builds extractors for every source with a detail parser
    pub fn extractor_set(&self) -> Result<ExtractorSet> {
        let mut extractors = ExtractorSet::new();
        for source in SourceId::all() {
            let site = self.site(source)?;
            if site.has_detail_extractor() {
                extractors.insert(Arc::new(self.extractor(site)));
            }
        }
        Ok(extractors)
    }

    /// Runs one full sync cycle for `source`
    ///
    /// # Errors
    ///
    /// Registry reads that the cycle depends on (existing links, unscraped
    /// links) abort it. Catalog page and per-item failures do not.
    pub async fn sync_source(&self, source: SourceId) -> Result<SyncReport> {
        let label = sync_run_label(source);
        tracing::info!("Starting {}", label);

        let site = self.site(source)?;
        let cookies = self
            .config
            .source_entry(source)
            .map(|entry| entry.cookies.clone())
            .unwrap_or_default();

        let discovered = discover(&self.client, site.as_ref(), &self.config.scraper, &cookies).await;
        let new_links = register_new_links(self.registry.as_ref(), source, &discovered).await?;

        let mut report = SyncReport {
            source,
            discovered: discovered.len(),
            new_links: new_links.len(),
            batch: None,
        };

        if !site.has_detail_extractor() {
            tracing::info!("{}: no detail extractor, stopping after registration", source);
            tracing::info!("Finished {}", label);
            return Ok(report);
        }

        let worklist = self.registry.unscraped_links(source).await?;
        let runner = BatchRunner::new(
            Arc::new(self.extractor(site)),
            Arc::clone(&self.registry),
            self.config.scraper.batch_size,
        );
        report.batch = Some(runner.run(worklist).await);

        tracing::info!("Finished {}", label);
        Ok(report)
    }

    /// Re-scrapes every stale link and updates its record in place
    pub async fn reprocess_stale(&self) -> Result<ReprocessReport> {
        let label = stale_run_label();
        tracing::info!("Starting {}", label);

        let reprocessor = StaleReprocessor::new(self.extractor_set()?, Arc::clone(&self.registry));
        let report = reprocessor.run().await?;

        tracing::info!("Finished {}", label);
        Ok(report)
    }
}
