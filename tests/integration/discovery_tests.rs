//! Catalog discovery and page fetching against mock sites

use std::collections::BTreeMap;
use std::time::Duration;

use repo_sync::crawler::{build_http_client, discover, fetch_page, FetchResult};
use repo_sync::sites::{site_for, Site};
use repo_sync::SourceId;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{banesco_catalog, fast_scraper_config, test_http_config, BANESCO_END};

fn banesco(server: &MockServer) -> std::sync::Arc<dyn Site> {
    site_for(SourceId::Banesco, Some(&server.uri())).unwrap()
}

async fn mount_page(server: &MockServer, page_path: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_paginates_until_no_results_marker() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/banesco-bienes/",
        200,
        banesco_catalog(&["/banesco-bienes/casa-1/", "/banesco-bienes/casa-2/"]),
    )
    .await;
    mount_page(
        &server,
        "/banesco-bienes/page/2/",
        200,
        banesco_catalog(&["/banesco-bienes/casa-2/", "/banesco-bienes/casa-3/"]),
    )
    .await;
    mount_page(&server, "/banesco-bienes/page/3/", 200, BANESCO_END.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/banesco-bienes/page/4/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = build_http_client(&test_http_config()).unwrap();
    let links = discover(&client, banesco(&server).as_ref(), &fast_scraper_config(), &BTreeMap::new()).await;

    assert_eq!(
        links,
        vec![
            format!("{}/banesco-bienes/casa-1/", base),
            format!("{}/banesco-bienes/casa-2/", base),
            format!("{}/banesco-bienes/casa-3/", base),
        ]
    );
}

#[tokio::test]
async fn test_not_found_end_page_stops_without_errors() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/banesco-bienes/",
        200,
        banesco_catalog(&["/banesco-bienes/casa-1/"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/banesco-bienes/page/2/"))
        .respond_with(ResponseTemplate::new(404).set_body_string(BANESCO_END))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/banesco-bienes/page/3/"))
        .respond_with(ResponseTemplate::new(404).set_body_string(BANESCO_END))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = fast_scraper_config();
    config.max_consecutive_page_errors = 3;

    let client = build_http_client(&test_http_config()).unwrap();
    let links = discover(&client, banesco(&server).as_ref(), &config, &BTreeMap::new()).await;

    assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn test_empty_page_ends_pagination() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/banesco-bienes/",
        200,
        banesco_catalog(&["/banesco-bienes/casa-1/"]),
    )
    .await;
    mount_page(&server, "/banesco-bienes/page/2/", 200, banesco_catalog(&[])).await;

    let client = build_http_client(&test_http_config()).unwrap();
    let links = discover(&client, banesco(&server).as_ref(), &fast_scraper_config(), &BTreeMap::new()).await;

    assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn test_failed_page_is_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_page(
        &server,
        "/banesco-bienes/",
        200,
        banesco_catalog(&["/banesco-bienes/casa-1/"]),
    )
    .await;
    mount_page(&server, "/banesco-bienes/page/2/", 500, String::new()).await;
    mount_page(
        &server,
        "/banesco-bienes/page/3/",
        200,
        banesco_catalog(&["/banesco-bienes/casa-3/"]),
    )
    .await;
    mount_page(&server, "/banesco-bienes/page/4/", 200, BANESCO_END.to_string()).await;

    let client = build_http_client(&test_http_config()).unwrap();
    let links = discover(&client, banesco(&server).as_ref(), &fast_scraper_config(), &BTreeMap::new()).await;

    assert_eq!(
        links,
        vec![
            format!("{}/banesco-bienes/casa-1/", base),
            format!("{}/banesco-bienes/casa-3/", base),
        ]
    );
}

#[tokio::test]
async fn test_consecutive_failures_abandon_entry_point() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        "/banesco-bienes/",
        200,
        banesco_catalog(&["/banesco-bienes/casa-1/"]),
    )
    .await;
    mount_page(&server, "/banesco-bienes/page/2/", 503, String::new()).await;
    mount_page(&server, "/banesco-bienes/page/3/", 503, String::new()).await;
    Mock::given(method("GET"))
        .and(path("/banesco-bienes/page/4/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(banesco_catalog(&["/x/"])))
        .expect(0)
        .mount(&server)
        .await;

    let client = build_http_client(&test_http_config()).unwrap();
    let links = discover(&client, banesco(&server).as_ref(), &fast_scraper_config(), &BTreeMap::new()).await;

    assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn test_max_pages_caps_pagination() {
    let server = MockServer::start().await;

    // Every page answers with the same listing, so only the cap ends the walk
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(banesco_catalog(&["/banesco-bienes/casa-1/"])),
        )
        .expect(3)
        .mount(&server)
        .await;

    let mut config = fast_scraper_config();
    config.max_pages = 3;

    let client = build_http_client(&test_http_config()).unwrap();
    let links = discover(&client, banesco(&server).as_ref(), &config, &BTreeMap::new()).await;

    assert_eq!(links.len(), 1);
}

#[tokio::test]
async fn test_next_link_pagination() {
    let server = MockServer::start().await;
    let base = server.uri();
    let catalog = "/bienes-reposeidos/inmueble/catalogo";

    Mock::given(method("GET"))
        .and(path(catalog))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<a href="{}/lote-2">2</a>"#,
            catalog
        )))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(catalog))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<a href="{0}/casa-1">1</a><a rel="next" href="?page=1">Siguiente</a>"#,
            catalog
        )))
        .mount(&server)
        .await;

    let site = site_for(SourceId::GlobalBank, Some(&base)).unwrap();
    let client = build_http_client(&test_http_config()).unwrap();
    let links = discover(&client, site.as_ref(), &fast_scraper_config(), &BTreeMap::new()).await;

    assert_eq!(
        links,
        vec![
            format!("{}{}/casa-1", base, catalog),
            format!("{}{}/lote-2", base, catalog),
        ]
    );
}

#[tokio::test]
async fn test_categories_are_merged_without_duplicates() {
    let server = MockServer::start().await;
    let base = server.uri();

    let listing = |hrefs: &[&str]| -> String {
        hrefs
            .iter()
            .map(|href| format!(r#"<div class="propery-style-6"><a target="_blank" href="{}">x</a></div>"#, href))
            .collect()
    };
    let no_results = r#"<div class="searched-properties">No se encontraron propiedades</div>"#;

    mount_page(
        &server,
        "/clasificados-bg/viviendas-reposeidas/",
        200,
        listing(&["/property/casa-1/", "/property/casa-2/"]),
    )
    .await;
    mount_page(
        &server,
        "/clasificados-bg/viviendas-reposeidas/page/2/",
        200,
        no_results.to_string(),
    )
    .await;
    mount_page(
        &server,
        "/clasificados-bg/comerciales/",
        200,
        listing(&["/property/casa-2/", "/property/local-3/"]),
    )
    .await;
    mount_page(
        &server,
        "/clasificados-bg/comerciales/page/2/",
        200,
        no_results.to_string(),
    )
    .await;

    let site = site_for(SourceId::BancoGeneral, Some(&base)).unwrap();
    let client = build_http_client(&test_http_config()).unwrap();
    let links = discover(&client, site.as_ref(), &fast_scraper_config(), &BTreeMap::new()).await;

    assert_eq!(
        links,
        vec![
            format!("{}/property/casa-1/", base),
            format!("{}/property/casa-2/", base),
            format!("{}/property/local-3/", base),
        ]
    );
}

#[tokio::test]
async fn test_fetch_page_sends_cookies() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/detalle"))
        .and(header("cookie", "pum=true; session=abc"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let cookies = BTreeMap::from([
        ("session".to_string(), "abc".to_string()),
        ("pum".to_string(), "true".to_string()),
    ]);
    let client = build_http_client(&test_http_config()).unwrap();
    let result = fetch_page(
        &client,
        &format!("{}/detalle", server.uri()),
        Duration::from_secs(5),
        &cookies,
    )
    .await;

    match result {
        FetchResult::Success { status_code, body, .. } => {
            assert_eq!(status_code, 200);
            assert_eq!(body, "<html>ok</html>");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_page_classifies_failures() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ended"))
        .respond_with(ResponseTemplate::new(404).set_body_string(BANESCO_END))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = build_http_client(&test_http_config()).unwrap();
    let none = BTreeMap::new();

    let missing = fetch_page(&client, &format!("{}/missing", server.uri()), Duration::from_secs(5), &none).await;
    assert!(matches!(missing, FetchResult::HttpError { status_code: 404, body: None }));

    let end_page = fetch_page(&client, &format!("{}/ended", server.uri()), Duration::from_secs(5), &none).await;
    match end_page {
        FetchResult::HttpError { status_code, body } => {
            assert_eq!(status_code, 404);
            assert_eq!(body.as_deref(), Some(BANESCO_END));
        }
        other => panic!("unexpected result: {:?}", other),
    }

    let slow = fetch_page(&client, &format!("{}/slow", server.uri()), Duration::from_millis(200), &none).await;
    assert!(matches!(slow, FetchResult::NetworkError { timed_out: true, .. }));
}
