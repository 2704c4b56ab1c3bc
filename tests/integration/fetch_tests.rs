//! HTTP fetcher behavior against a mock server

use licitace_watch::config::UserAgentConfig;
use licitace_watch::watcher::{FetchError, Fetcher, HttpFetcher};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

#[tokio::test]
async fn test_fetch_returns_body_and_sends_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/licitace"))
        .and(header(
            "user-agent",
            "TestBot/1.0.0 (+https://example.com/contact; test@example.com)",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>Byt 3+1</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&user_agent()).expect("client");
    let body = fetcher
        .fetch(&format!("{}/licitace", mock_server.uri()))
        .await
        .expect("fetch");

    assert_eq!(body, "<p>Byt 3+1</p>");
}

#[tokio::test]
async fn test_fetch_maps_error_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let fetcher = HttpFetcher::from_config(&user_agent()).expect("client");

    let missing = fetcher
        .fetch(&format!("{}/missing", mock_server.uri()))
        .await;
    assert!(matches!(missing, Err(FetchError::Status { status: 404, .. })));

    let broken = fetcher.fetch(&format!("{}/broken", mock_server.uri())).await;
    assert!(matches!(broken, Err(FetchError::Status { status: 500, .. })));
}
