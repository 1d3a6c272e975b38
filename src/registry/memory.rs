//! In-process registry
//!
//! Keeps links, records and images in memory. The pipeline tests use the
//! failure switches to exercise the skip-and-continue paths.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::model::{dedup_images, new_images, Image, LinkTarget, Record, SourceId, StaleLink};
use crate::registry::{Registry, RegistryError, RegistryResult};

/// A link row as the in-memory registry stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredLink {
    pub id: String,
    pub url: String,
    pub source: String,
    pub is_scraped: bool,
    pub is_stale: bool,
}

/// An image row as the in-memory registry stores it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub link_id: String,
    pub source_url: String,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    links: Vec<StoredLink>,
    records: BTreeMap<String, Record>,
    images: Vec<StoredImage>,
    add_calls: Vec<Vec<String>>,
    failing_saves: HashSet<String>,
    failing_marks: HashSet<String>,
    failing_updates: HashSet<String>,
    reads_unavailable: bool,
}

impl State {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

/// Registry kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: Mutex<State>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ===== Seeding =====

    /// Registers a link directly and returns its id
    pub fn insert_link(&self, url: &str, source: SourceId, is_scraped: bool) -> String {
        let mut state = self.state();
        let id = state.allocate_id();
        state.links.push(StoredLink {
            id: id.clone(),
            url: url.to_string(),
            source: source.as_tag().to_string(),
            is_scraped,
            is_stale: false,
        });
        id
    }

    /// Seeds a scraped, stale link with a persisted record and images
    ///
    /// # Returns
    ///
    /// `(link_id, record_id)`
    pub fn insert_stale(&self, url: &str, source: &str, image_urls: &[&str]) -> (String, String) {
        let mut state = self.state();
        let link_id = state.allocate_id();
        let record_id = state.allocate_id();

        state.links.push(StoredLink {
            id: link_id.clone(),
            url: url.to_string(),
            source: source.to_string(),
            is_scraped: true,
            is_stale: true,
        });
        state.records.insert(record_id.clone(), Record::new(link_id.clone()));
        for url in image_urls {
            state.images.push(StoredImage {
                link_id: link_id.clone(),
                source_url: url.to_string(),
            });
        }
        (link_id, record_id)
    }

    // ===== Failure Injection =====

    /// Makes `save_record` fail for records owned by `link_id`
    pub fn fail_save_for(&self, link_id: &str) {
        self.state().failing_saves.insert(link_id.to_string());
    }

    /// Makes `mark_scraped` and `mark_fresh` fail for `link_id`
    pub fn fail_mark_for(&self, link_id: &str) {
        self.state().failing_marks.insert(link_id.to_string());
    }

    /// Makes `update_record` fail for `record_id`
    pub fn fail_update_for(&self, record_id: &str) {
        self.state().failing_updates.insert(record_id.to_string());
    }

    /// Makes every read operation return `RegistryError::Unavailable`
    pub fn set_reads_unavailable(&self, unavailable: bool) {
        self.state().reads_unavailable = unavailable;
    }

    // ===== Inspection =====

    pub fn links(&self) -> Vec<StoredLink> {
        self.state().links.clone()
    }

    pub fn link(&self, link_id: &str) -> Option<StoredLink> {
        self.state().links.iter().find(|l| l.id == link_id).cloned()
    }

    pub fn record(&self, record_id: &str) -> Option<Record> {
        self.state().records.get(record_id).cloned()
    }

    /// Records saved or updated for `link_id`
    pub fn records_for(&self, link_id: &str) -> Vec<Record> {
        self.state()
            .records
            .values()
            .filter(|r| r.link_id == link_id)
            .cloned()
            .collect()
    }

    /// Every stored image URL, in insertion order
    pub fn image_urls(&self) -> Vec<String> {
        self.state()
            .images
            .iter()
            .map(|image| image.source_url.clone())
            .collect()
    }

    /// Arguments of every `add_links` call that reached the store
    pub fn add_calls(&self) -> Vec<Vec<String>> {
        self.state().add_calls.clone()
    }

    fn store_images(state: &mut State, link_id: &str, images: Vec<Image>) {
        state.images.extend(images.into_iter().map(|image| StoredImage {
            link_id: link_id.to_string(),
            source_url: image.source_url,
        }));
    }

    fn check_reads(state: &State) -> RegistryResult<()> {
        if state.reads_unavailable {
            Err(RegistryError::Unavailable("reads disabled".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn existing_links(&self, source: SourceId) -> RegistryResult<HashSet<String>> {
        let state = self.state();
        Self::check_reads(&state)?;
        Ok(state
            .links
            .iter()
            .filter(|l| l.source == source.as_tag())
            .map(|l| l.url.clone())
            .collect())
    }

    async fn add_links(&self, urls: &[String], source: SourceId) -> RegistryResult<()> {
        if urls.is_empty() {
            return Ok(());
        }

        let mut state = self.state();
        state.add_calls.push(urls.to_vec());
        for url in urls {
            let duplicate = state
                .links
                .iter()
                .any(|l| l.source == source.as_tag() && &l.url == url);
            if duplicate {
                continue;
            }
            let id = state.allocate_id();
            state.links.push(StoredLink {
                id,
                url: url.clone(),
                source: source.as_tag().to_string(),
                is_scraped: false,
                is_stale: false,
            });
        }
        Ok(())
    }

    async fn unscraped_links(&self, source: SourceId) -> RegistryResult<Vec<LinkTarget>> {
        let state = self.state();
        Self::check_reads(&state)?;
        Ok(state
            .links
            .iter()
            .filter(|l| l.source == source.as_tag() && !l.is_scraped)
            .map(|l| LinkTarget::new(l.id.clone(), l.url.clone()))
            .collect())
    }

    async fn save_record(&self, record: &Record) -> bool {
        let mut state = self.state();
        if state.failing_saves.contains(&record.link_id) {
            return false;
        }

        let record_id = state.allocate_id();
        Self::store_images(&mut state, &record.link_id, dedup_images(&record.images));
        let mut stored = record.clone();
        stored.images.clear();
        state.records.insert(record_id, stored);
        true
    }

    async fn mark_scraped(&self, link_id: &str) -> bool {
        let mut state = self.state();
        if state.failing_marks.contains(link_id) {
            return false;
        }
        match state.links.iter_mut().find(|l| l.id == link_id) {
            Some(link) => {
                link.is_scraped = true;
                true
            }
            None => false,
        }
    }

    async fn stale_links(&self) -> RegistryResult<Vec<StaleLink>> {
        let state = self.state();
        Self::check_reads(&state)?;

        Ok(state
            .links
            .iter()
            .filter(|l| l.is_stale)
            .map(|link| {
                let record_id = state
                    .records
                    .iter()
                    .find(|(_, record)| record.link_id == link.id)
                    .map(|(id, _)| id.clone());
                let image_urls = state
                    .images
                    .iter()
                    .filter(|image| image.link_id == link.id)
                    .map(|image| image.source_url.clone())
                    .collect();
                StaleLink {
                    link_id: Some(link.id.clone()),
                    url: Some(link.url.clone()),
                    source: link.source.clone(),
                    record_id,
                    image_urls,
                }
            })
            .collect())
    }

    async fn mark_fresh(&self, link_id: &str) -> bool {
        let mut state = self.state();
        if state.failing_marks.contains(link_id) {
            return false;
        }
        match state.links.iter_mut().find(|l| l.id == link_id) {
            Some(link) => {
                link.is_stale = false;
                true
            }
            None => false,
        }
    }

    async fn update_record(
        &self,
        record_id: &str,
        record: &Record,
        existing_image_urls: &[String],
    ) -> bool {
        let mut state = self.state();
        if state.failing_updates.contains(record_id) || !state.records.contains_key(record_id) {
            return false;
        }

        let added = new_images(&record.images, existing_image_urls);
        Self::store_images(&mut state, &record.link_id, added);

        let mut stored = record.clone();
        stored.images.clear();
        state.records.insert(record_id.to_string(), stored);
        true
    }
}
