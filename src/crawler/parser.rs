//! Catalog page link extraction
//!
//! This module pulls candidate detail-page links out of catalog HTML:
//! - Anchors matching a site-specific CSS selector
//! - The `rel="next"` pagination control
//! - Resolution of relative hrefs against the page they were found on

use scraper::ElementRef;
use url::Url;

use crate::sites::normalize::select_all;

/// Extracts absolute links from every `<a>` under `scope` matching `css`
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - Anchors without `href` or with the `download` attribute
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only links
/// - Non-HTTP(S) URLs after resolution
///
/// Fragments are stripped so the same listing linked twice with different
/// anchors is recognised as one URL. Order follows the document.
///
/// # Arguments
///
/// * `scope` - Element to search under (usually the document root)
/// * `css` - Selector for the anchors to consider
/// * `page_url` - URL of the page, used to resolve relative links
///
/// # Example
///
/// ```no_run
/// use repo_sync::crawler::extract_links;
/// use repo_sync::sites::normalize::root;
/// use scraper::Html;
/// use url::Url;
///
/// let html = Html::parse_document(r#"<ul><li class="product"><a href="/p/1">1</a></li></ul>"#);
/// let page = Url::parse("https://example.com/catalog/").unwrap();
/// let links = extract_links(root(&html), "li.product a", &page);
/// assert_eq!(links, vec!["https://example.com/p/1".to_string()]);
/// ```
pub fn extract_links(scope: ElementRef<'_>, css: &str, page_url: &Url) -> Vec<String> {
    select_all(scope, css)
        .into_iter()
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, page_url))
        .collect()
}

/// Finds the `rel="next"` pagination control and resolves its target
pub fn extract_next_link(scope: ElementRef<'_>, page_url: &Url) -> Option<String> {
    select_all(scope, r#"a[rel="next"][href]"#)
        .into_iter()
        .filter_map(|element| element.value().attr("href"))
        .find_map(|href| resolve_link(href, page_url))
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only or empty hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_ascii_lowercase();
    if lowered.starts_with("javascript:")
        || lowered.starts_with("mailto:")
        || lowered.starts_with("tel:")
        || lowered.starts_with("data:")
    {
        return None;
    }

    let mut absolute_url = base_url.join(href).ok()?;
    if absolute_url.scheme() != "http" && absolute_url.scheme() != "https" {
        return None;
    }

    absolute_url.set_fragment(None);
    Some(absolute_url.to_string())
}
