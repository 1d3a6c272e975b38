//! Directus registry client against a mock Directus server

use std::time::Duration;

use repo_sync::config::RegistryConfig;
use repo_sync::model::Record;
use repo_sync::registry::{DirectusRegistry, Registry, RegistryError};
use repo_sync::{LinkTarget, SourceId};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LINKS: &str = "/items/repossessed_assets_links";
const DATA: &str = "/items/repossessed_assets_data";
const IMAGES: &str = "/items/repossessed_assets_images";

fn registry(server: &MockServer) -> DirectusRegistry {
    let config = RegistryConfig {
        url: server.uri(),
        token: "test-token".to_string(),
        timeout_secs: 5,
        write_retries: 2,
    };
    DirectusRegistry::new(&config)
        .unwrap()
        .with_retry_delay(Duration::from_millis(10))
}

/// Bodies of every request the server received on `request_path`
async fn bodies_for(server: &MockServer, request_path: &str) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == request_path)
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .collect()
}

fn record_with_images(link_id: &str, images: &[&str]) -> Record {
    let mut record = Record::new(link_id);
    record.title = Some("Casa en Arraiján".to_string());
    record.price = Some(99500.0);
    for image in images {
        record.push_image(*image);
    }
    record
}

#[tokio::test]
async fn test_existing_links() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LINKS))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("filter[company][_eq]", "banesco"))
        .and(query_param("limit", "-1"))
        .and(query_param("fields", "link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"link": "https://a/1"}, {"link": "https://a/2"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let links = registry(&server).existing_links(SourceId::Banesco).await.unwrap();
    assert_eq!(links.len(), 2);
    assert!(links.contains("https://a/1"));
}

#[tokio::test]
async fn test_existing_links_error_status_is_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LINKS))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
        .mount(&server)
        .await;

    let result = registry(&server).existing_links(SourceId::Banesco).await;
    match result {
        Err(RegistryError::Status { status, body, .. }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid token");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn test_add_links_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LINKS))
        .and(body_json(json!([
            {"link": "https://a/1", "is_scraped": false, "company": "scotiabank"},
            {"link": "https://a/3", "is_scraped": false, "company": "scotiabank"}
        ])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{}, {}]})))
        .expect(1)
        .mount(&server)
        .await;

    registry(&server)
        .add_links(
            &["https://a/1".to_string(), "https://a/3".to_string()],
            SourceId::Scotiabank,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_add_no_links_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    registry(&server).add_links(&[], SourceId::Banesco).await.unwrap();
}

#[tokio::test]
async fn test_unscraped_links() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LINKS))
        .and(query_param("filter[is_scraped][_eq]", "false"))
        .and(query_param("fields", "id,link"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 10, "link": "https://a/1"}, {"id": 11, "link": "https://a/2"}]
        })))
        .mount(&server)
        .await;

    let links = registry(&server)
        .unscraped_links(SourceId::CajaDeAhorros)
        .await
        .unwrap();
    assert_eq!(
        links,
        vec![
            LinkTarget::new("10", "https://a/1"),
            LinkTarget::new("11", "https://a/2"),
        ]
    );
}

#[tokio::test]
async fn test_save_record_dedups_images() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(DATA))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"data": {"id": 1}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IMAGES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let record = record_with_images("7", &["https://img/a", "https://img/b", "https://img/a"]);
    assert!(registry(&server).save_record(&record).await);

    let data = bodies_for(&server, DATA).await;
    assert_eq!(data[0]["link_id"], json!("7"));
    assert_eq!(data[0]["price"], json!(99500.0));
    assert!(data[0].get("images").is_none());

    let images = bodies_for(&server, IMAGES).await;
    let urls: Vec<&str> = images[0]
        .as_array()
        .unwrap()
        .iter()
        .map(|image| image["source_url"].as_str().unwrap())
        .collect();
    assert_eq!(urls, vec!["https://img/a", "https://img/b"]);
    assert_eq!(images[0][0]["link_id"], json!("7"));
}

#[tokio::test]
async fn test_save_record_image_failure_still_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(DATA))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IMAGES))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let record = record_with_images("7", &["https://img/a"]);
    assert!(registry(&server).save_record(&record).await);
}

#[tokio::test]
async fn test_save_record_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(DATA))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(DATA))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;

    assert!(registry(&server).save_record(&Record::new("7")).await);
}

#[tokio::test]
async fn test_save_record_gives_up_after_retries() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(DATA))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IMAGES))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let record = record_with_images("7", &["https://img/a"]);
    assert!(!registry(&server).save_record(&record).await);
}

#[tokio::test]
async fn test_save_record_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(DATA))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid payload"))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!registry(&server).save_record(&Record::new("7")).await);
}

#[tokio::test]
async fn test_mark_scraped_and_fresh() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/42", LINKS)))
        .and(body_json(json!({"is_scraped": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/43", LINKS)))
        .and(body_json(json!({"is_stale": false})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(format!("{}/44", LINKS)))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let registry = registry(&server);
    assert!(registry.mark_scraped("42").await);
    assert!(registry.mark_fresh("43").await);
    assert!(!registry.mark_scraped("44").await);
}

#[tokio::test]
async fn test_stale_links_query() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "repossessed_assets_links": [
                    {
                        "company": "banesco",
                        "id": "5",
                        "link": "https://banesco/p/5",
                        "scrape_data": [{"id": "77"}],
                        "scraped_images": [
                            {"id": "1", "source_url": "https://img/a"},
                            {"id": "2", "source_url": "https://img/b"}
                        ]
                    },
                    {
                        "company": "scotiabank",
                        "id": "6",
                        "link": null,
                        "scrape_data": [],
                        "scraped_images": []
                    }
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let stale = registry(&server).stale_links().await.unwrap();
    assert_eq!(stale.len(), 2);
    assert_eq!(stale[0].record_id.as_deref(), Some("77"));
    assert_eq!(stale[0].image_urls.len(), 2);
    assert!(stale[1].url.is_none());

    let sent = bodies_for(&server, "/graphql").await;
    let query = sent[0]["query"].as_str().unwrap();
    assert!(query.contains("is_stale: { _eq: true }"));
}

#[tokio::test]
async fn test_stale_links_graphql_errors_are_fatal() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "forbidden"}]
        })))
        .mount(&server)
        .await;

    let result = registry(&server).stale_links().await;
    assert!(matches!(result, Err(RegistryError::GraphQl(msg)) if msg.contains("forbidden")));
}

#[tokio::test]
async fn test_update_record_posts_only_new_images() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/77", DATA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IMAGES))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
        .expect(1)
        .mount(&server)
        .await;

    let record = record_with_images("5", &["https://img/a", "https://img/b", "https://img/c"]);
    let existing = vec!["https://img/a".to_string(), "https://img/b".to_string()];
    assert!(registry(&server).update_record("77", &record, &existing).await);

    let images = bodies_for(&server, IMAGES).await;
    let rows = images[0].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["source_url"], json!("https://img/c"));
}

#[tokio::test]
async fn test_update_record_without_new_images() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/77", DATA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(IMAGES))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let record = record_with_images("5", &["https://img/a"]);
    let existing = vec!["https://img/a".to_string()];
    assert!(registry(&server).update_record("77", &record, &existing).await);
}

#[tokio::test]
async fn test_update_record_failure() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path(format!("{}/77", DATA)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    assert!(!registry(&server).update_record("77", &Record::new("5"), &[]).await);
}
