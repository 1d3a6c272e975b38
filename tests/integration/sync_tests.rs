//! Full sync and stale reprocessing runs against mock bank sites and an
//! in-memory registry

use std::sync::Arc;

use repo_sync::crawler::Coordinator;
use repo_sync::registry::{MemoryRegistry, Registry};
use repo_sync::SourceId;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::{banesco_catalog, banesco_detail, create_test_config, BANESCO_END};

async fn mount(server: &MockServer, page_path: &str, status: u16, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

fn coordinator(server: &MockServer, sources: &[&str], registry: &Arc<MemoryRegistry>) -> Coordinator {
    let config = create_test_config(&server.uri(), sources);
    let registry: Arc<dyn Registry> = registry.clone();
    Coordinator::new(config, registry).unwrap()
}

#[tokio::test]
async fn test_sync_registers_and_scrapes_new_links() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount(
        &server,
        "/banesco-bienes/",
        200,
        banesco_catalog(&[
            "/banesco-bienes/casa-1/",
            "/banesco-bienes/casa-2/",
            "/banesco-bienes/casa-3/",
        ]),
    )
    .await;
    mount(&server, "/banesco-bienes/page/2/", 200, BANESCO_END.to_string()).await;
    mount(
        &server,
        "/banesco-bienes/casa-2/",
        200,
        banesco_detail("Casa 2", &["https://img.example/2a.jpg", "https://img.example/2a.jpg"]),
    )
    .await;
    mount(&server, "/banesco-bienes/casa-3/", 500, String::new()).await;
    mount(
        &server,
        "/banesco-bienes/casa-4/",
        200,
        banesco_detail("Casa 4", &["https://img.example/4a.jpg"]),
    )
    .await;

    let registry = Arc::new(MemoryRegistry::new());
    // Already captured on an earlier run
    registry.insert_link(&format!("{}/banesco-bienes/casa-1/", base), SourceId::Banesco, true);
    // Registered earlier but never scraped, no longer listed
    let leftover = registry.insert_link(&format!("{}/banesco-bienes/casa-4/", base), SourceId::Banesco, false);

    let report = coordinator(&server, &["banesco"], &registry)
        .sync_source(SourceId::Banesco)
        .await
        .unwrap();

    assert_eq!(report.discovered, 3);
    assert_eq!(report.new_links, 2);
    let batch = report.batch.unwrap();
    assert_eq!(batch.total, 3);
    assert_eq!(batch.processed, 2);
    assert_eq!(batch.failed, 1);

    assert_eq!(
        registry.add_calls(),
        vec![vec![
            format!("{}/banesco-bienes/casa-2/", base),
            format!("{}/banesco-bienes/casa-3/", base),
        ]]
    );

    let links = registry.links();
    let casa_2 = links.iter().find(|l| l.url.ends_with("casa-2/")).unwrap();
    let casa_3 = links.iter().find(|l| l.url.ends_with("casa-3/")).unwrap();
    assert!(casa_2.is_scraped);
    assert!(!casa_3.is_scraped);
    assert!(registry.link(&leftover).unwrap().is_scraped);

    let saved = registry.records_for(&casa_2.id);
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].title.as_deref(), Some("Casa 2"));
    assert_eq!(saved[0].price, Some(99500.0));

    // Duplicate gallery entries collapse to one image row
    let images = registry.image_urls();
    assert_eq!(images.iter().filter(|u| u.ends_with("2a.jpg")).count(), 1);
    assert!(images.iter().any(|u| u.ends_with("4a.jpg")));
}

#[tokio::test]
async fn test_rerun_only_retries_unscraped() {
    let server = MockServer::start().await;

    mount(
        &server,
        "/banesco-bienes/",
        200,
        banesco_catalog(&["/banesco-bienes/casa-1/"]),
    )
    .await;
    mount(&server, "/banesco-bienes/page/2/", 200, BANESCO_END.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/banesco-bienes/casa-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(banesco_detail("Casa 1", &[])))
        .expect(1)
        .mount(&server)
        .await;

    let registry = Arc::new(MemoryRegistry::new());
    let coordinator = coordinator(&server, &["banesco"], &registry);

    let first = coordinator.sync_source(SourceId::Banesco).await.unwrap();
    assert_eq!(first.new_links, 1);
    assert_eq!(first.batch.unwrap().processed, 1);

    let second = coordinator.sync_source(SourceId::Banesco).await.unwrap();
    assert_eq!(second.discovered, 1);
    assert_eq!(second.new_links, 0);
    assert_eq!(second.batch.unwrap().total, 0);
    assert_eq!(registry.add_calls().len(), 1);
}

#[tokio::test]
async fn test_sync_aborts_when_registry_is_unreadable() {
    let server = MockServer::start().await;

    mount(
        &server,
        "/banesco-bienes/",
        200,
        banesco_catalog(&["/banesco-bienes/casa-1/"]),
    )
    .await;
    mount(&server, "/banesco-bienes/page/2/", 200, BANESCO_END.to_string()).await;
    Mock::given(method("GET"))
        .and(path("/banesco-bienes/casa-1/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let registry = Arc::new(MemoryRegistry::new());
    registry.set_reads_unavailable(true);

    let result = coordinator(&server, &["banesco"], &registry)
        .sync_source(SourceId::Banesco)
        .await;

    assert!(result.is_err());
    assert!(registry.links().is_empty());
}

#[tokio::test]
async fn test_discovery_only_source_stops_after_registration() {
    let server = MockServer::start().await;
    let base = server.uri();
    let catalog = "/bienes-reposeidos/inmueble/catalogo";

    mount(
        &server,
        catalog,
        200,
        format!(r#"<a href="{0}/casa-1">1</a><a href="{0}/lote-2">2</a>"#, catalog),
    )
    .await;

    let registry = Arc::new(MemoryRegistry::new());
    let report = coordinator(&server, &["global-bank"], &registry)
        .sync_source(SourceId::GlobalBank)
        .await
        .unwrap();

    assert_eq!(report.discovered, 2);
    assert_eq!(report.new_links, 2);
    assert!(report.batch.is_none());

    let links = registry.links();
    assert_eq!(links.len(), 2);
    assert!(links.iter().all(|l| !l.is_scraped && l.source == "global-bank"));
    assert!(links[0].url.starts_with(&base));
}

#[tokio::test]
async fn test_reprocess_stale_updates_in_place() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount(
        &server,
        "/banesco-bienes/casa-9/",
        200,
        banesco_detail(
            "Casa 9 actualizada",
            &["https://img.example/9a.jpg", "https://img.example/9b.jpg"],
        ),
    )
    .await;
    mount(&server, "/banesco-bienes/casa-10/", 404, String::new()).await;

    let registry = Arc::new(MemoryRegistry::new());
    let (link_id, record_id) = registry.insert_stale(
        &format!("{}/banesco-bienes/casa-9/", base),
        "banesco",
        &["https://img.example/9a.jpg"],
    );
    let (gone_link, _) = registry.insert_stale(
        &format!("{}/banesco-bienes/casa-10/", base),
        "banesco",
        &[],
    );
    let (unsupported_link, _) = registry.insert_stale("https://globalbank.example/x", "global-bank", &[]);

    let report = coordinator(&server, &["banesco"], &registry)
        .reprocess_stale()
        .await
        .unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(report.processed, 1);
    assert_eq!(report.failed, 2);

    let record = registry.record(&record_id).unwrap();
    assert_eq!(record.title.as_deref(), Some("Casa 9 actualizada"));
    assert!(!registry.link(&link_id).unwrap().is_stale);
    assert!(registry.link(&gone_link).unwrap().is_stale);
    assert!(registry.link(&unsupported_link).unwrap().is_stale);

    let images = registry.image_urls();
    assert_eq!(images.iter().filter(|u| u.ends_with("9a.jpg")).count(), 1);
    assert_eq!(images.iter().filter(|u| u.ends_with("9b.jpg")).count(), 1);
}

#[tokio::test]
async fn test_reprocess_stale_aborts_when_query_fails() {
    let server = MockServer::start().await;

    let registry = Arc::new(MemoryRegistry::new());
    registry.insert_stale("https://banesco.example/p/1", "banesco", &[]);
    registry.set_reads_unavailable(true);

    let result = coordinator(&server, &["banesco"], &registry).reprocess_stale().await;
    assert!(result.is_err());
    assert!(registry.link("1").unwrap().is_stale);
}
