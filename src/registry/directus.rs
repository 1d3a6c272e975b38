//! Directus-backed registry
//!
//! Links, records and images live in three Directus collections. Reads use
//! the REST item endpoints except for stale links, which need the related
//! record id and image URLs and are fetched with a single GraphQL query.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::RegistryConfig;
use crate::model::{dedup_images, new_images, Image, LinkTarget, Record, SourceId, StaleLink};
use crate::registry::wire::{
    image_rows, Envelope, GraphQlRequest, GraphQlResponse, LinkRow, NewLink, RecordPayload,
    ScrapedFlag, StaleFlag, StaleLinksData, UnscrapedRow, DATA_COLLECTION, IMAGES_COLLECTION,
    LINKS_COLLECTION, STALE_LINKS_QUERY,
};
use crate::registry::{Registry, RegistryError, RegistryResult};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Registry client talking to a Directus instance over HTTP
pub struct DirectusRegistry {
    client: Client,
    base_url: String,
    write_retries: u32,
    retry_delay: Duration,
}

impl DirectusRegistry {
    /// Creates a client from the `[registry]` configuration section
    ///
    /// # Errors
    ///
    /// Returns an error if the token cannot be used as a header value or the
    /// HTTP client cannot be built.
    pub fn new(config: &RegistryConfig) -> RegistryResult<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| RegistryError::Unavailable("registry token is not a valid header value".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            write_retries: config.write_retries,
            retry_delay: DEFAULT_RETRY_DELAY,
        })
    }

    /// Overrides the pause between write attempts
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn items_url(&self, collection: &str) -> String {
        format!("{}/items/{}", self.base_url, collection)
    }

    fn item_url(&self, collection: &str, id: &str) -> String {
        format!("{}/items/{}/{}", self.base_url, collection, id)
    }

    async fn get_items<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        query: &[(&str, &str)],
    ) -> RegistryResult<Vec<T>> {
        let response = self
            .client
            .get(self.items_url(LINKS_COLLECTION))
            .query(query)
            .send()
            .await?;
        let response = check_status(operation, response).await?;

        let body = response.text().await?;
        let envelope: Envelope<Vec<T>> =
            serde_json::from_str(&body).map_err(|e| RegistryError::Decode(e.to_string()))?;
        Ok(envelope.data)
    }

    /// Sends a write, retrying transport errors and 5xx responses
    async fn send_with_retry<F>(&self, operation: &'static str, build: F) -> RegistryResult<()>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0;
        loop {
            let result = match build().send().await {
                Ok(response) => check_status(operation, response).await.map(|_| ()),
                Err(e) => Err(RegistryError::from(e)),
            };

            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() && attempt < self.write_retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} failed ({}), retrying ({}/{})",
                        operation,
                        e,
                        attempt,
                        self.write_retries
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        body: &B,
    ) -> RegistryResult<()> {
        let response = request.json(body).send().await?;
        check_status(operation, response).await.map(|_| ())
    }

    /// Inserts images for `link_id`; failures are logged only
    async fn insert_images(&self, link_id: &str, images: &[Image]) {
        if images.is_empty() {
            return;
        }

        let rows = image_rows(link_id, images);
        let request = self.client.post(self.items_url(IMAGES_COLLECTION));
        match self.send_once("save images", request, &rows).await {
            Ok(()) => tracing::debug!("Stored {} images for link {}", rows.len(), link_id),
            Err(e) => tracing::warn!("Failed to save images for link {}: {}", link_id, e),
        }
    }

    async fn patch_link<B: Serialize>(&self, operation: &'static str, link_id: &str, body: &B) -> bool {
        let request = self.client.patch(self.item_url(LINKS_COLLECTION, link_id));
        match self.send_once(operation, request, body).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Failed to {} for link {}: {}", operation, link_id, e);
                false
            }
        }
    }
}

/// Turns a non-2xx response into `RegistryError::Status`, keeping the body for the log
async fn check_status(operation: &'static str, response: Response) -> RegistryResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RegistryError::Status {
        operation,
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Registry for DirectusRegistry {
    async fn existing_links(&self, source: SourceId) -> RegistryResult<HashSet<String>> {
        let rows: Vec<LinkRow> = self
            .get_items(
                "get existing links",
                &[
                    ("filter[company][_eq]", source.as_tag()),
                    ("limit", "-1"),
                    ("fields", "link"),
                ],
            )
            .await?;

        let links: HashSet<String> = rows.into_iter().map(|row| row.link).collect();
        tracing::info!("Found {} existing links for {}", links.len(), source);
        Ok(links)
    }

    async fn add_links(&self, urls: &[String], source: SourceId) -> RegistryResult<()> {
        if urls.is_empty() {
            tracing::info!("No new links to add for {}", source);
            return Ok(());
        }

        let items: Vec<NewLink<'_>> = urls
            .iter()
            .map(|url| NewLink::unscraped(url, source))
            .collect();
        let request = self.client.post(self.items_url(LINKS_COLLECTION));
        self.send_once("add links", request, &items).await?;

        tracing::info!("Added {} new links for {}", items.len(), source);
        Ok(())
    }

    async fn unscraped_links(&self, source: SourceId) -> RegistryResult<Vec<LinkTarget>> {
        let rows: Vec<UnscrapedRow> = self
            .get_items(
                "get unscraped links",
                &[
                    ("filter[company][_eq]", source.as_tag()),
                    ("filter[is_scraped][_eq]", "false"),
                    ("limit", "-1"),
                    ("fields", "id,link"),
                ],
            )
            .await?;

        tracing::info!("Found {} unscraped links for {}", rows.len(), source);
        Ok(rows.into_iter().map(LinkTarget::from).collect())
    }

    async fn save_record(&self, record: &Record) -> bool {
        let payload = RecordPayload::from(record);
        let url = self.items_url(DATA_COLLECTION);

        let saved = self
            .send_with_retry("save record", || self.client.post(&url).json(&payload))
            .await;
        if let Err(e) = saved {
            tracing::error!("Failed to save record for link {}: {}", record.link_id, e);
            return false;
        }

        self.insert_images(&record.link_id, &dedup_images(&record.images))
            .await;
        tracing::info!("Saved record for link {}", record.link_id);
        true
    }

    async fn mark_scraped(&self, link_id: &str) -> bool {
        self.patch_link("mark scraped", link_id, &ScrapedFlag { is_scraped: true })
            .await
    }

    async fn stale_links(&self) -> RegistryResult<Vec<StaleLink>> {
        let response = self
            .client
            .post(format!("{}/graphql", self.base_url))
            .json(&GraphQlRequest {
                query: STALE_LINKS_QUERY,
            })
            .send()
            .await?;
        let response = check_status("get stale links", response).await?;

        let body = response.text().await?;
        let parsed: GraphQlResponse<StaleLinksData> =
            serde_json::from_str(&body).map_err(|e| RegistryError::Decode(e.to_string()))?;

        if let Some(errors) = parsed.errors {
            return Err(RegistryError::GraphQl(errors.to_string()));
        }

        let data = parsed
            .data
            .ok_or_else(|| RegistryError::Decode("GraphQL response has no data".to_string()))?;

        let stale: Vec<StaleLink> = data
            .repossessed_assets_links
            .into_iter()
            .map(StaleLink::from)
            .collect();
        tracing::info!("Found {} stale links", stale.len());
        Ok(stale)
    }

    async fn mark_fresh(&self, link_id: &str) -> bool {
        self.patch_link("mark fresh", link_id, &StaleFlag { is_stale: false })
            .await
    }

    async fn update_record(
        &self,
        record_id: &str,
        record: &Record,
        existing_image_urls: &[String],
    ) -> bool {
        let payload = RecordPayload::from(record);
        let url = self.item_url(DATA_COLLECTION, record_id);

        let updated = self
            .send_with_retry("update record", || self.client.patch(&url).json(&payload))
            .await;
        if let Err(e) = updated {
            tracing::error!("Failed to update record {}: {}", record_id, e);
            return false;
        }

        let added = new_images(&record.images, existing_image_urls);
        if added.is_empty() {
            tracing::debug!("No new images for record {}", record_id);
        } else {
            self.insert_images(&record.link_id, &added).await;
        }

        tracing::info!("Updated record {} for link {}", record_id, record.link_id);
        true
    }
}
