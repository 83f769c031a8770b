//! End-to-end harvest runs against a mock server

use serde_json::Value;
use std::sync::Arc;
use sumi_harvest::config::{parse_config, CacheConfig, CacheKind, Config, RetryConfig};
use sumi_harvest::extract::PageHarvester;
use sumi_harvest::output::{JsonArrayWriter, RecordSink};
use sumi_harvest::transport::HttpTransport;
use sumi_harvest::{Engine, Extractor, FetchRequest, Transport};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html")
}

async fn mount_page(server: &MockServer, page: &str, body: &str, calls: u64) {
    Mock::given(method("GET"))
        .and(path(page))
        .respond_with(html(body))
        .expect(calls)
        .mount(server)
        .await;
}

/// Mounts a small site: the index links to two pages, page 1 links back and
/// onwards to page 3
async fn mount_site(server: &MockServer, calls: u64) {
    mount_page(
        server,
        "/",
        r#"<html><head><title>Home</title></head><body>
        <a href="/page1">Page 1</a>
        <a href="/page2">Page 2</a>
        </body></html>"#,
        calls,
    )
    .await;
    mount_page(
        server,
        "/page1",
        r#"<html><head><title>Page 1</title></head><body>
        <a href="/">Home</a>
        <a href="/page3">Page 3</a>
        </body></html>"#,
        calls,
    )
    .await;
    mount_page(
        server,
        "/page2",
        r#"<html><head><title>Page 2</title></head><body></body></html>"#,
        calls,
    )
    .await;
}

fn seed(url: &str, max_depth: u32) -> FetchRequest {
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new().expect("Failed to build HTTP client"));
    let extractor: Arc<dyn Extractor> = Arc::new(PageHarvester::new(max_depth, true));
    FetchRequest::get(url, extractor, transport).expect("Invalid seed URL")
}

fn titles(records: &[Value]) -> Vec<String> {
    let mut titles: Vec<String> = records
        .iter()
        .filter_map(|r| r["title"].as_str().map(str::to_string))
        .collect();
    titles.sort();
    titles
}

fn sorted(records: Vec<Value>) -> Vec<String> {
    let mut records: Vec<String> = records.iter().map(Value::to_string).collect();
    records.sort();
    records
}

#[tokio::test]
async fn test_harvest_follows_links_to_max_depth() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 1).await;
    mount_page(
        &mock_server,
        "/page3",
        r#"<title>Page 3</title><a href="/page4">Page 4</a>"#,
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/page4"))
        .respond_with(html("<title>Page 4</title>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let engine = Engine::new(Config::default()).unwrap();
    let mut harvest = engine.run(vec![seed(&format!("{}/", mock_server.uri()), 2)]).await;
    let records = harvest.collect_records().await;

    assert_eq!(titles(&records), vec!["Home", "Page 1", "Page 2", "Page 3"]);
    assert!(harvest.failures().is_empty());

    let stats = harvest.stats();
    assert_eq!(stats.fetched, 4);
    // page 1 links back to the index
    assert_eq!(stats.duplicates, 1);
}

#[tokio::test]
async fn test_sqlite_cache_survives_across_runs() {
    let mock_server = MockServer::start().await;
    // each page is fetched exactly once over both runs
    mount_site(&mock_server, 1).await;

    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        cache: CacheConfig {
            enabled: true,
            kind: CacheKind::Sqlite,
            path: dir.path().join("cache").join("harvest.db"),
        },
        ..Config::default()
    };
    let url = format!("{}/", mock_server.uri());

    let first = {
        let engine = Engine::new(config.clone()).unwrap();
        let mut harvest = engine.run(vec![seed(&url, 1)]).await;
        harvest.collect_records().await
    };

    let engine = Engine::new(config).unwrap();
    let mut harvest = engine.run(vec![seed(&url, 1)]).await;
    let second = harvest.collect_records().await;

    assert_eq!(first.len(), 3);
    assert_eq!(sorted(first), sorted(second));
    assert_eq!(harvest.stats().cache_hits, 3);
    assert_eq!(harvest.stats().fetched, 0);
}

#[tokio::test]
async fn test_transient_status_is_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/", "<title>Back</title>", 1).await;

    let config = Config {
        retry: RetryConfig {
            max_attempts: 3,
            backoff_min_ms: 1,
            backoff_max_ms: 10,
            backoff_multiplier_ms: 1,
            ..RetryConfig::default()
        },
        ..Config::default()
    };

    let engine = Engine::new(config).unwrap();
    let mut harvest = engine.run(vec![seed(&format!("{}/", mock_server.uri()), 0)]).await;
    let records = harvest.collect_records().await;

    assert_eq!(titles(&records), vec!["Back"]);
    assert!(harvest.failures().is_empty());
    assert_eq!(harvest.stats().retries, 2);
}

#[tokio::test]
async fn test_dead_page_is_reported_not_fatal() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/",
        r#"<title>Home</title><a href="/gone">Gone</a>"#,
        1,
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = Engine::new(Config::default()).unwrap();
    let mut harvest = engine.run(vec![seed(&format!("{}/", mock_server.uri()), 1)]).await;
    let records = harvest.collect_records().await;

    assert_eq!(titles(&records), vec!["Home"]);
    let failures = harvest.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].request.url().path(), "/gone");
    assert_eq!(failures[0].attempts, 1);
}

#[tokio::test]
async fn test_config_file_drives_a_run() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server, 1).await;

    let toml = format!(
        r#"
[engine]
concurrency = 2

[rate-limit]
max-rate = 10
period-ms = 100

[harvest]
max-depth = 1

[[seed]]
url = "{}/"
"#,
        mock_server.uri()
    );
    let config = parse_config(&toml).unwrap();

    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::from_config(&config.http).unwrap());
    let extractor: Arc<dyn Extractor> = Arc::new(PageHarvester::from_config(&config.harvest));
    let seeds: Vec<_> = config
        .seeds
        .iter()
        .map(|s| FetchRequest::get(s.url.as_str(), extractor.clone(), transport.clone()).unwrap())
        .collect();

    let engine = Engine::new(config).unwrap();
    let mut harvest = engine.run(seeds).await;

    let mut writer = JsonArrayWriter::new(Vec::new()).unwrap();
    while let Some(record) = futures::StreamExt::next(&mut harvest).await {
        writer.write_record(&record).unwrap();
    }
    assert_eq!(writer.written(), 3);

    let written: Vec<Value> = serde_json::from_slice(&writer.into_inner().unwrap()).unwrap();
    assert_eq!(titles(&written), vec!["Home", "Page 1", "Page 2"]);
}

#[test]
fn test_blocking_harvest_against_server() {
    let server_runtime = tokio::runtime::Runtime::new().unwrap();
    let mock_server = server_runtime.block_on(async {
        let server = MockServer::start().await;
        mount_site(&server, 1).await;
        server
    });

    let engine = Engine::new(Config::default()).unwrap();
    let records: Vec<Value> = engine
        .run_blocking(vec![seed(&format!("{}/", mock_server.uri()), 1)])
        .unwrap()
        .collect();

    assert_eq!(titles(&records), vec!["Home", "Page 1", "Page 2"]);

    // verify expectations while the server's runtime is still alive
    server_runtime.block_on(async move { drop(mock_server) });
}
