//! HTTP fetcher implementation
//!
//! This module handles all requests to the bank websites, including:
//! - Building one HTTP client with the configured identity headers
//! - GET requests with a per-call timeout (listing vs. detail pages)
//! - Per-source cookies
//! - Error classification into HTTP and network failures

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, COOKIE};
use reqwest::Client;

use crate::config::HttpConfig;
use crate::SyncError;

const DEFAULT_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Result of a fetch operation
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched the page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Page body content
        body: String,
    },

    /// The server answered with a non-success status
    HttpError {
        /// The HTTP status code
        status_code: u16,
        /// Error page body, when the server sent one
        body: Option<String>,
    },

    /// Network error (connection refused, timeout, body read failure, etc.)
    NetworkError {
        /// Error description
        error: String,
        /// Whether the per-call timeout elapsed
        timed_out: bool,
    },
}

impl FetchResult {
    /// Converts the result into the page body or a typed error for `url`
    pub fn into_body(self, url: &str) -> Result<String, SyncError> {
        match self {
            Self::Success { body, .. } => Ok(body),
            Self::HttpError { status_code, .. } => Err(SyncError::HttpStatus {
                url: url.to_string(),
                status: status_code,
            }),
            Self::NetworkError { timed_out: true, .. } => Err(SyncError::Timeout {
                url: url.to_string(),
            }),
            Self::NetworkError { error, .. } => Err(SyncError::Network {
                url: url.to_string(),
                message: error,
            }),
        }
    }
}

/// Builds an HTTP client with the configured identity headers
///
/// # Arguments
///
/// * `config` - The `[http]` configuration section
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use std::collections::BTreeMap;
/// use repo_sync::config::HttpConfig;
/// use repo_sync::crawler::build_http_client;
///
/// let config = HttpConfig {
///     user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
///     accept_language: Some("en,es-ES;q=0.5".to_string()),
///     headers: BTreeMap::new(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(DEFAULT_ACCEPT));

    if let Some(language) = &config.accept_language {
        match HeaderValue::from_str(language) {
            Ok(value) => {
                headers.insert(ACCEPT_LANGUAGE, value);
            }
            Err(_) => tracing::warn!("Ignoring invalid accept-language '{}'", language),
        }
    }

    for (name, value) in &config.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!("Ignoring invalid header {}: {}", name, value),
        }
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Renders cookies as a `Cookie` header value (`a=1; b=2`)
pub fn cookie_header(cookies: &BTreeMap<String, String>) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }

    Some(
        cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Fetches a page with a per-call timeout
///
/// A non-2xx status is reported as `HttpError`, keeping the error page body
/// when there is one; transport failures and
/// timeouts as `NetworkError`. Nothing is retried here: discovery treats
/// failures as soft and the batch orchestrator leaves the link for a later run.
///
/// # Arguments
///
/// * `client` - The HTTP client to use
/// * `url` - The URL to fetch
/// * `timeout` - Deadline for the whole request including the body
/// * `cookies` - Cookies to send, if any
///
/// # Returns
///
/// A FetchResult indicating success or the type of failure
pub async fn fetch_page(
    client: &Client,
    url: &str,
    timeout: Duration,
    cookies: &BTreeMap<String, String>,
) -> FetchResult {
    let mut request = client.get(url).timeout(timeout);
    if let Some(cookie) = cookie_header(cookies) {
        request = request.header(COOKIE, cookie);
    }

    tracing::trace!("GET {}", url);

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => return network_error(e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    if !status.is_success() {
        tracing::debug!("HTTP {} for {}", status.as_u16(), url);
        // Catalogs past their last page answer 404 with a "not found" template
        let body = response.text().await.ok().filter(|body| !body.trim().is_empty());
        return FetchResult::HttpError {
            status_code: status.as_u16(),
            body,
        };
    }

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            body,
        },
        Err(e) => network_error(e),
    }
}

fn network_error(e: reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::NetworkError {
            error: "Request timeout".to_string(),
            timed_out: true,
        }
    } else if e.is_connect() {
        FetchResult::NetworkError {
            error: format!("Connection failed: {}", e),
            timed_out: false,
        }
    } else {
        FetchResult::NetworkError {
            error: e.to_string(),
            timed_out: false,
        }
    }
}
