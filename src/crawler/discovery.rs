//! Catalog link discovery
//!
//! Walks every catalog entry point of a site page by page and collects the
//! candidate detail links. Pagination ends on whichever comes first:
//!
//! - the site reports "no results", also when it does so on an error status
//! - a page yields zero links
//! - a next-link catalog has no next control
//! - a single-page catalog has been read
//! - the `max-pages` cap is reached
//!
//! A failed page fetch is soft: it is logged and the next page is tried, until
//! `max-consecutive-page-errors` failures in a row abandon the entry point.
//! Catalogs that cannot address page N directly stop at their first failure.

use std::collections::{BTreeMap, HashSet};

use reqwest::Client;
use url::Url;

use crate::config::ScraperConfig;
use crate::crawler::{fetch_page, FetchResult};
use crate::sites::{Pagination, Site};

/// Discovers every candidate link of `site`
///
/// # Arguments
///
/// * `client` - HTTP client used for catalog pages
/// * `site` - Source strategy providing entry points, pagination and parsing
/// * `config` - Page delay, listing timeout and pagination caps
/// * `cookies` - Cookies configured for the source
///
/// # Returns
///
/// Links in first-seen order with cross-page and cross-category duplicates removed
pub async fn discover(
    client: &Client,
    site: &dyn Site,
    config: &ScraperConfig,
    cookies: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut pager = Pager {
        client,
        config,
        cookies,
        fetched_any: false,
    };

    let mut links = Vec::new();
    for entry in site.entry_points() {
        let found = pager.walk_entry_point(site, &entry).await;
        tracing::info!("{}: {} links from {}", site.source(), found.len(), entry);
        links.extend(found);
    }

    let links = dedup_preserving_order(links);
    tracing::info!("{}: discovered {} unique links", site.source(), links.len());
    links
}

/// Removes repeated links, keeping the first occurrence of each
pub fn dedup_preserving_order<I>(links: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}

struct Pager<'a> {
    client: &'a Client,
    config: &'a ScraperConfig,
    cookies: &'a BTreeMap<String, String>,
    fetched_any: bool,
}

impl Pager<'_> {
    async fn walk_entry_point(&mut self, site: &dyn Site, entry: &Url) -> Vec<String> {
        let pagination = site.pagination();
        let mut links = Vec::new();
        let mut visited = HashSet::new();
        let mut next_url = Some(entry.clone());
        let mut consecutive_errors = 0;
        let mut page = 1;

        while page <= self.config.max_pages {
            let url = match pagination {
                Pagination::NextLink => next_url.take(),
                _ => pagination.page_url(entry, page),
            };
            let Some(url) = url else {
                break;
            };
            if !visited.insert(url.to_string()) {
                tracing::warn!("Catalog page {} was already visited, stopping", url);
                break;
            }

            self.pause().await;
            let fetched = fetch_page(
                self.client,
                url.as_str(),
                self.config.listing_timeout(),
                self.cookies,
            )
            .await;

            if let FetchResult::HttpError {
                status_code,
                body: Some(error_page),
            } = &fetched
            {
                if site.parse_catalog(error_page, &url).no_results {
                    tracing::info!(
                        "No more results at page {} of {} (HTTP {})",
                        page,
                        entry,
                        status_code
                    );
                    break;
                }
            }

            let body = match fetched.into_body(url.as_str()) {
                Ok(body) => body,
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!(
                        "Catalog page {} failed ({}/{}): {}",
                        page,
                        consecutive_errors,
                        self.config.max_consecutive_page_errors,
                        e
                    );
                    if !is_addressable(pagination)
                        || consecutive_errors >= self.config.max_consecutive_page_errors
                    {
                        break;
                    }
                    page += 1;
                    continue;
                }
            };
            consecutive_errors = 0;

            let catalog = site.parse_catalog(&body, &url);
            if catalog.no_results {
                tracing::info!("No more results at page {} of {}", page, entry);
                break;
            }
            if catalog.links.is_empty() {
                tracing::info!("No links on page {} of {}, stopping", page, entry);
                break;
            }

            tracing::debug!("Page {} of {}: {} links", page, entry, catalog.links.len());
            links.extend(catalog.links);

            match pagination {
                Pagination::Single => break,
                Pagination::NextLink => {
                    next_url = catalog.next_url.and_then(|next| Url::parse(&next).ok());
                    if next_url.is_none() {
                        tracing::debug!("No next page after page {} of {}", page, entry);
                        break;
                    }
                }
                Pagination::PathSegment | Pagination::QueryParam(_) => {}
            }
            page += 1;
        }

        if page > self.config.max_pages {
            tracing::warn!(
                "Stopped {} after {} pages (max-pages)",
                entry,
                self.config.max_pages
            );
        }

        links
    }

    /// Sleeps between consecutive catalog fetches; the first fetch goes out immediately
    async fn pause(&mut self) {
        if self.fetched_any {
            tokio::time::sleep(self.config.page_delay()).await;
        }
        self.fetched_any = true;
    }
}

/// Whether page N can be requested without having read page N-1
fn is_addressable(pagination: Pagination) -> bool {
    matches!(
        pagination,
        Pagination::PathSegment | Pagination::QueryParam(_)
    )
}
