//! Detail-page extractors
//!
//! The orchestrators only see `Extractor`: give it a link, get back a record,
//! nothing, or an error. `SiteExtractor` is the production implementation that
//! fetches the page and hands the HTML to the site's detail parser; tests plug
//! in their own implementations.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::task::JoinError;

use crate::crawler::fetch_page;
use crate::model::{LinkTarget, Record, SourceId};
use crate::sites::Site;
use crate::{Result, SyncError};

/// Turns one registered link into a record
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Source whose detail pages this extractor understands
    fn source(&self) -> SourceId;

    /// Fetches and parses the detail page of `target`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - Usable listing data
    /// * `Ok(None)` - The page had nothing usable
    /// * `Err(_)` - Fetching or parsing failed
    async fn extract(&self, target: &LinkTarget) -> Result<Option<Record>>;
}

/// Fetches detail pages over HTTP and parses them with a `Site`
pub struct SiteExtractor {
    client: Client,
    site: Arc<dyn Site>,
    timeout: Duration,
    cookies: BTreeMap<String, String>,
}

impl SiteExtractor {
    pub fn new(
        client: Client,
        site: Arc<dyn Site>,
        timeout: Duration,
        cookies: BTreeMap<String, String>,
    ) -> Self {
        Self {
            client,
            site,
            timeout,
            cookies,
        }
    }
}

#[async_trait]
impl Extractor for SiteExtractor {
    fn source(&self) -> SourceId {
        self.site.source()
    }

    async fn extract(&self, target: &LinkTarget) -> Result<Option<Record>> {
        let body = fetch_page(&self.client, &target.url, self.timeout, &self.cookies)
            .await
            .into_body(&target.url)?;

        let record = self.site.parse_detail(&body, target);
        if record.is_none() {
            tracing::debug!("No listing data on {}", target.url);
        }
        Ok(record)
    }
}

/// Runs one extraction on its own task
///
/// The task starts immediately. A panic or cancellation inside it comes back as
/// `SyncError::Task` for that item only.
pub(crate) fn spawn_extract(
    extractor: Arc<dyn Extractor>,
    target: LinkTarget,
) -> impl std::future::Future<Output = Result<Option<Record>>> {
    let handle = tokio::spawn(async move { extractor.extract(&target).await });
    async move { handle.await.unwrap_or_else(|e| Err(task_error(e))) }
}

fn task_error(e: JoinError) -> SyncError {
    if e.is_panic() {
        SyncError::Task("extraction task panicked".to_string())
    } else {
        SyncError::Task(format!("extraction task cancelled: {}", e))
    }
}

/// Dispatch table from source to extractor
///
/// Sources without a detail parser simply have no entry.
#[derive(Default, Clone)]
pub struct ExtractorSet {
    extractors: HashMap<SourceId, Arc<dyn Extractor>>,
}

impl ExtractorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an extractor, replacing any previous one for the same source
    pub fn insert(&mut self, extractor: Arc<dyn Extractor>) {
        self.extractors.insert(extractor.source(), extractor);
    }

    pub fn get(&self, source: SourceId) -> Option<Arc<dyn Extractor>> {
        self.extractors.get(&source).cloned()
    }

    /// Looks up the extractor for a raw source tag as stored in the registry
    pub fn for_tag(&self, tag: &str) -> Option<Arc<dyn Extractor>> {
        SourceId::from_tag(tag).and_then(|source| self.get(source))
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}
