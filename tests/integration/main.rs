//! Integration tests
//!
//! These tests use wiremock to stand in for the bank websites and the
//! Directus API, and exercise the pipeline end to end.

mod discovery_tests;
mod registry_tests;
mod sync_tests;

use std::collections::BTreeMap;

use repo_sync::config::{parse_config, Config, HttpConfig, ScraperConfig};

/// Scraper settings with no page delay and short timeouts
pub fn fast_scraper_config() -> ScraperConfig {
    ScraperConfig {
        batch_size: 5,
        page_delay_ms: 0,
        listing_timeout_secs: 5,
        detail_timeout_secs: 5,
        max_pages: 20,
        max_consecutive_page_errors: 2,
    }
}

pub fn test_http_config() -> HttpConfig {
    HttpConfig {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64)".to_string(),
        accept_language: Some("en,es-ES;q=0.5".to_string()),
        headers: BTreeMap::new(),
    }
}

/// Full configuration pointing every listed source at `site_base`
pub fn create_test_config(site_base: &str, sources: &[&str]) -> Config {
    let mut content = String::from(
        r#"
[registry]
url = "https://directus.example.com"
token = "test-token"

[http]
user-agent = "Mozilla/5.0 (X11; Linux x86_64)"
"#,
    );
    for source in sources {
        content.push_str(&format!(
            "\n[[source]]\nid = \"{}\"\nbase-url = \"{}\"\n",
            source, site_base
        ));
    }

    let mut config = parse_config(&content).expect("test config is valid");
    config.scraper = fast_scraper_config();
    config
}

/// A Banesco catalog page listing `hrefs`
pub fn banesco_catalog(hrefs: &[&str]) -> String {
    let items: String = hrefs
        .iter()
        .map(|href| {
            format!(
                r#"<li class="product"><a class="woocommerce-LoopProduct-link" href="{}">x</a></li>"#,
                href
            )
        })
        .collect();
    format!("<html><body><ul class=\"products\">{}</ul></body></html>", items)
}

pub const BANESCO_END: &str = r#"<html><body><div class="error-404 not-found">No encontrado</div></body></html>"#;

/// A Banesco detail page
pub fn banesco_detail(title: &str, images: &[&str]) -> String {
    let gallery: String = images
        .iter()
        .map(|src| {
            format!(
                r#"<div class="woocommerce-product-gallery__image"><a href="{}"><img></a></div>"#,
                src
            )
        })
        .collect();
    format!(
        r#"<html><body>
  <h1 class="product_title entry-title">{}</h1>
  <p class="price"><span class="woocommerce-Price-amount amount"><bdi>B/.99,500.00</bdi></span></p>
  <div class="item-location-oneline">Arraiján, Panamá Oeste</div>
  <div class="wpgs-for">{}</div>
</body></html>"#,
        title, gallery
    )
}
