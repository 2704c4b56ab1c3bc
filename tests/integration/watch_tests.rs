//! End-to-end watch runs against a mock listing page

use licitace_watch::config::{parse_config, Config};
use licitace_watch::storage::{JsonFileStore, SnapshotStore, SqliteSnapshotStore};
use licitace_watch::watcher::Watcher;
use licitace_watch::{ListingRecord, RunStatus};
use std::path::Path;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PAGE: &str = r#"<!DOCTYPE html>
<html>
<body>
  <h2>Licitace bytů</h2>
  <p>Byt 3+1, ul. Nádražní 12, Bohumín</p>
  <p><a href="/files/licitace-nadrazni.pdf">Podrobnosti</a> Licitace proběhne 17.02.2025 v 10:00</p>
  <p>Byt 2+1, ul. Okružní 5</p>
  <p><a href="/files/licitace-okruzni.pdf">Podrobnosti</a> Licitace proběhne 18.02.2025 v 10:00</p>
  <ul>
    <li>Byt 1+4 po rekonstrukci</li>
    <li><a href="files/licitace-husova.pdf">Podrobnosti</a> Termín 24.02.2025</li>
  </ul>
</body>
</html>
"#;

/// Builds a configuration against the mock server
fn create_test_config(server_uri: &str, store: &str, notify: &str, watch: &str) -> Config {
    let toml = format!(
        r#"
[source]
url = "{server_uri}/cz/licitace-bytu/"

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[watch]
{watch}

[store]
{store}

[notify]
{notify}
"#
    );
    parse_config(&toml).expect("test config must be valid")
}

fn json_store(path: &Path) -> String {
    format!("kind = \"json-file\"\npath = '{}'", path.display())
}

fn record(size: &str, description: &str, date: &str, link: &str) -> ListingRecord {
    ListingRecord::new(size, description, date, Some(link.to_string()))
}

fn expected_records(server_uri: &str) -> Vec<ListingRecord> {
    vec![
        record(
            "3+1",
            "Licitace proběhne 17.02.2025 v 10:00",
            "17.02.2025",
            &format!("{}/files/licitace-nadrazni.pdf", server_uri),
        ),
        record(
            "2+1",
            "Licitace proběhne 18.02.2025 v 10:00",
            "18.02.2025",
            &format!("{}/files/licitace-okruzni.pdf", server_uri),
        ),
        record(
            "1+4",
            "Termín 24.02.2025",
            "24.02.2025",
            &format!("{}/cz/licitace-bytu/files/licitace-husova.pdf", server_uri),
        ),
    ]
}

async fn mount_listing_page(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/cz/licitace-bytu/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(LISTING_PAGE),
        )
        .mount(mock_server)
        .await;
}

#[tokio::test]
async fn test_first_run_seeds_snapshot() {
    let mock_server = MockServer::start().await;
    mount_listing_page(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("licitace_data.json");
    let config = create_test_config(
        &mock_server.uri(),
        &json_store(&snapshot_path),
        "kind = \"log\"",
        "",
    );

    let watcher = Watcher::from_config(&config, None).expect("watcher");
    let report = watcher.run_once().await;

    assert_eq!(report.status, RunStatus::Completed);
    assert!(!report.notified());
    assert!(report.fetch_error.is_none());
    assert_eq!(report.data, expected_records(&mock_server.uri()));

    let stored = JsonFileStore::new(&snapshot_path).load().await.unwrap();
    assert_eq!(stored, Some(expected_records(&mock_server.uri())));
    assert!(!dir.path().join("licitace_data.json.lock").exists());
}

#[tokio::test]
async fn test_new_listing_sends_mail() {
    let mock_server = MockServer::start().await;
    mount_listing_page(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .and(header("authorization", "Bearer test-secret"))
        .and(body_string_contains("licitace-husova.pdf"))
        .and(body_string_contains("\"to\":[\"someone@example.com\"]"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"id\":\"1\"}"))
        .expect(1)
        .mount(&mock_server)
        .await;

    std::env::set_var("LICITACE_WATCH_TEST_KEY_SEND", "test-secret");

    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("licitace_data.json");
    let mut previous = expected_records(&mock_server.uri());
    let husova = previous.pop().unwrap();
    JsonFileStore::new(&snapshot_path)
        .save(&previous)
        .await
        .unwrap();

    let notify = format!(
        "kind = \"http\"\nendpoint = \"{}/emails\"\napi-key-env = \"LICITACE_WATCH_TEST_KEY_SEND\"\nfrom = \"watch@example.com\"\nto = [\"someone@example.com\"]",
        mock_server.uri()
    );
    let config = create_test_config(&mock_server.uri(), &json_store(&snapshot_path), &notify, "");

    let report = Watcher::from_config(&config, None)
        .expect("watcher")
        .run_once()
        .await;

    assert!(report.notified());
    assert_eq!(report.relevant, vec![husova]);
    assert_eq!(report.new_count, 1);
    assert_eq!(report.current_count, 3);
    assert!(report.is_success());
}

#[tokio::test]
async fn test_rejected_mail_still_saves_snapshot() {
    let mock_server = MockServer::start().await;
    mount_listing_page(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/emails"))
        .respond_with(ResponseTemplate::new(422).set_body_string("invalid sender"))
        .expect(1)
        .mount(&mock_server)
        .await;

    std::env::set_var("LICITACE_WATCH_TEST_KEY_REJECT", "test-secret");

    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("licitace_data.json");
    JsonFileStore::new(&snapshot_path).save(&[]).await.unwrap();

    let notify = format!(
        "kind = \"http\"\nendpoint = \"{}/emails\"\napi-key-env = \"LICITACE_WATCH_TEST_KEY_REJECT\"\nfrom = \"watch@example.com\"\nto = [\"someone@example.com\"]",
        mock_server.uri()
    );
    let config = create_test_config(&mock_server.uri(), &json_store(&snapshot_path), &notify, "");

    let report = Watcher::from_config(&config, None)
        .expect("watcher")
        .run_once()
        .await;

    assert!(!report.notified());
    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.notify_error.as_deref().unwrap().contains("422"));

    let stored = JsonFileStore::new(&snapshot_path).load().await.unwrap();
    assert_eq!(stored, Some(expected_records(&mock_server.uri())));
}

#[tokio::test]
async fn test_unavailable_page_keeps_snapshot() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/cz/licitace-bytu/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let snapshot_path = dir.path().join("licitace_data.json");
    let previous = expected_records(&mock_server.uri());
    JsonFileStore::new(&snapshot_path)
        .save(&previous)
        .await
        .unwrap();

    let config = create_test_config(
        &mock_server.uri(),
        &json_store(&snapshot_path),
        "kind = \"log\"",
        "",
    );

    let report = Watcher::from_config(&config, None)
        .expect("watcher")
        .run_once()
        .await;

    assert!(report.fetch_error.as_deref().unwrap().contains("503"));
    assert!(report.data.is_empty());
    assert!(!report.notified());

    let stored = JsonFileStore::new(&snapshot_path).load().await.unwrap();
    assert_eq!(stored, Some(previous));
}

#[tokio::test]
async fn test_cold_start_mail_drop() {
    let mock_server = MockServer::start().await;
    mount_listing_page(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let outbox = dir.path().join("outbox");
    let notify = format!(
        "kind = \"mail-drop\"\ndirectory = '{}'\nfrom = \"watch@example.com\"\nto = [\"someone@example.com\"]",
        outbox.display()
    );
    let config = create_test_config(
        &mock_server.uri(),
        &json_store(&dir.path().join("licitace_data.json")),
        &notify,
        "notify-on-cold-start = true\ntarget-sizes = [\"3+1\", \"1+4\"]",
    );

    let report = Watcher::from_config(&config, None)
        .expect("watcher")
        .run_once()
        .await;

    assert!(report.notified());
    assert_eq!(report.new_count, 2);

    let messages: Vec<_> = std::fs::read_dir(&outbox)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(messages.len(), 1);

    let message = std::fs::read_to_string(&messages[0]).unwrap();
    assert!(message.contains("Subject: New Property Listing Detected!"));
    assert!(message.contains("licitace-nadrazni.pdf"));
    assert!(!message.contains("licitace-okruzni.pdf"));
}

#[tokio::test]
async fn test_sqlite_store_records_runs() {
    let mock_server = MockServer::start().await;
    mount_listing_page(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("watch.db");
    let store = format!(
        "kind = \"sqlite\"\npath = '{}'\nhistory = 1",
        db_path.display()
    );
    let config = create_test_config(&mock_server.uri(), &store, "kind = \"log\"", "");

    let watcher = Watcher::from_config(&config, Some("abc123".to_string())).expect("watcher");
    let first = watcher.run_once().await;
    let second = watcher.run_once().await;

    assert!(first.is_success());
    assert!(second.is_success());
    assert_eq!(second.new_count, 0);

    let runs = watcher.store().recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert!(runs
        .iter()
        .all(|run| run.config_hash.as_deref() == Some("abc123")));
    assert!(runs.iter().all(|run| run.status == RunStatus::Completed));

    drop(watcher);
    let reopened = SqliteSnapshotStore::open(&db_path, 1).unwrap();
    assert_eq!(reopened.snapshot_count().unwrap(), 1);
    assert_eq!(
        reopened.load().await.unwrap(),
        Some(expected_records(&mock_server.uri()))
    );
}
