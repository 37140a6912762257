//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock status pages and run the full
//! crawl cycle end-to-end, from input lines to the written output files.

use flate2::read::GzDecoder;
use status_crawler::config::Config;
use status_crawler::crawler::{Coordinator, RunPaths};
use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.request.base_url = base_url.to_string();
    config.crawler.max_connections = 8;
    config.crawler.max_retry_attempts = 2;
    config.crawler.wait_before_retry = 10; // Very short for testing
    config.crawler.retry_workers = 4;
    config.crawler.await_termination = 5_000;
    config.crawler.drain_polls = 50;
    config.crawler.drain_interval = 100;
    config.crawler.request_timeout = 5_000;
    config
}

fn create_paths(dir: &TempDir) -> RunPaths {
    RunPaths::new(dir.path().join("input.txt"), dir.path().join("statuses.gz"))
        .with_repair(dir.path().join("repair.txt"))
}

fn status_page(json: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!(
            r#"<html><head><title>Status</title></head><body>
            <script type="application/json">{}</script>
            </body></html>"#,
            json
        ))
        .insert_header("content-type", "text/html; charset=utf-8")
}

fn redirect_to(location: &str) -> ResponseTemplate {
    ResponseTemplate::new(302).insert_header("location", location)
}

fn read_fetched(path: &Path) -> Vec<String> {
    let file = std::fs::File::open(path).expect("output file missing");
    let mut content = String::new();
    GzDecoder::new(file)
        .read_to_string(&mut content)
        .expect("output is not gzip");
    content.lines().map(str::to_string).collect()
}

fn read_repair(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("repair file missing")
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_fetch_single_status() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    Mock::given(method("GET"))
        .and(path("/abc/status/42"))
        .and(header("accept-charset", "utf-8"))
        .and(header("accept-language", "en-US"))
        .respond_with(status_page(r#"{"text":"hello"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"42\tabc\n"[..]).await.unwrap();

    assert_eq!(
        read_fetched(&paths.output),
        vec![r#"{"text":"hello","requested_id":42}"#.to_string()]
    );
    assert!(read_repair(&dir.path().join("repair.txt")).is_empty());
    assert_eq!(summary.stats.accepted, 1);
    assert_eq!(summary.unresolved, 0);
    assert!(summary.drained);
}

#[tokio::test]
async fn test_malformed_line_produces_no_output() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"abcxyz\n"[..]).await.unwrap();

    assert!(read_fetched(&paths.output).is_empty());
    assert!(read_repair(&dir.path().join("repair.txt")).is_empty());
    assert_eq!(summary.stats.skipped, 1);
    assert_eq!(summary.stats.submitted, 0);
}

#[tokio::test]
async fn test_not_found_is_dropped() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    // No handle: the default handle is used
    Mock::given(method("GET"))
        .and(path("/a/status/7"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"7\n"[..]).await.unwrap();

    assert!(read_fetched(&paths.output).is_empty());
    assert!(read_repair(&dir.path().join("repair.txt")).is_empty());
    assert_eq!(coordinator.outstanding(), 0);
    assert_eq!(summary.stats.dropped.get("missing page"), Some(&1));
}

#[tokio::test]
async fn test_server_errors_exhaust_retries_into_repair() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    // One initial attempt plus two retries
    Mock::given(method("GET"))
        .and(path("/user/status/9"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    let summary = coordinator
        .crawl(&b"9\tuser\textra field\n"[..])
        .await
        .unwrap();

    assert!(read_fetched(&paths.output).is_empty());
    assert_eq!(
        read_repair(&dir.path().join("repair.txt")),
        vec!["9\tuser\textra field".to_string()]
    );
    assert_eq!(summary.stats.retries, 2);
    assert_eq!(summary.stats.repaired, 1);
    assert!(coordinator.store().needs_repair(9));
    assert!(!coordinator.store().is_fetched(9));
}

#[tokio::test]
async fn test_transient_failure_then_success() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    Mock::given(method("GET"))
        .and(path("/user/status/11"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    // Pages without an embedded record are retried as well
    Mock::given(method("GET"))
        .and(path("/user/status/11"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user/status/11"))
        .respond_with(status_page(r#"{"text":"third time"}"#))
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"11\tuser\n"[..]).await.unwrap();

    assert_eq!(
        read_fetched(&paths.output),
        vec![r#"{"text":"third time","requested_id":11}"#.to_string()]
    );
    assert!(read_repair(&dir.path().join("repair.txt")).is_empty());
    assert_eq!(summary.stats.retries, 2);
}

#[tokio::test]
async fn test_suspended_redirect_is_dropped_without_retry() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    Mock::given(method("GET"))
        .and(path("/gone/status/3"))
        .respond_with(redirect_to("https://twitter.com/account/suspended"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"3\tgone\n"[..]).await.unwrap();

    assert!(read_fetched(&paths.output).is_empty());
    assert!(read_repair(&dir.path().join("repair.txt")).is_empty());
    assert_eq!(summary.stats.retries, 0);
    assert_eq!(summary.stats.dropped.get("suspended account"), Some(&1));
}

#[tokio::test]
async fn test_redirect_is_followed() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    Mock::given(method("GET"))
        .and(path("/a/status/5"))
        .respond_with(redirect_to("/real/status/5"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/real/status/5"))
        .respond_with(status_page(r#"{"user":"real","text":"moved"}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"5\n"[..]).await.unwrap();

    assert_eq!(
        read_fetched(&paths.output),
        vec![r#"{"user":"real","text":"moved","requested_id":5}"#.to_string()]
    );
    assert_eq!(summary.stats.redirects, 1);
}

#[tokio::test]
async fn test_redirect_not_followed() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    Mock::given(method("GET"))
        .and(path("/a/status/5"))
        .respond_with(redirect_to("/real/status/5"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/real/status/5"))
        .respond_with(status_page(r#"{"text":"moved"}"#))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawler.follow_redirects = false;

    let coordinator = Coordinator::new(config, paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"5\n"[..]).await.unwrap();

    assert!(read_fetched(&paths.output).is_empty());
    assert!(read_repair(&dir.path().join("repair.txt")).is_empty());
    assert_eq!(summary.stats.dropped.get("redirect"), Some(&1));
}

#[tokio::test]
async fn test_redirect_loop_is_dropped() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    Mock::given(method("GET"))
        .and(path("/a/status/8"))
        .respond_with(redirect_to("/b/status/8"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b/status/8"))
        .respond_with(redirect_to("/a/status/8"))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawler.max_redirects = 3;

    let coordinator = Coordinator::new(config, paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"8\n"[..]).await.unwrap();

    assert!(read_fetched(&paths.output).is_empty());
    assert_eq!(summary.stats.redirects, 3);
    assert_eq!(summary.stats.dropped.get("redirect loop"), Some(&1));
    assert_eq!(coordinator.outstanding(), 0);
}

#[tokio::test]
async fn test_output_is_ordered_by_identifier() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    for id in [30u64, 10, 20] {
        Mock::given(method("GET"))
            .and(path(format!("/user/status/{}", id)))
            .respond_with(status_page(&format!(r#"{{"n":{}}}"#, id)))
            .mount(&mock_server)
            .await;
    }

    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    coordinator
        .crawl(&b"30\tuser\r\n10\tuser\r\n20\tuser\r\n"[..])
        .await
        .unwrap();

    assert_eq!(
        read_fetched(&paths.output),
        vec![
            r#"{"n":10,"requested_id":10}"#.to_string(),
            r#"{"n":20,"requested_id":20}"#.to_string(),
            r#"{"n":30,"requested_id":30}"#.to_string(),
        ]
    );
}

#[tokio::test]
async fn test_mixed_input_resolves_every_identifier_once() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir)
        .with_summary(dir.path().join("summary.md"));

    Mock::given(method("GET"))
        .and(path("/u/status/1"))
        .respond_with(status_page(r#"{"text":"one"}"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/u/status/2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/u/status/3"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/u/status/4"))
        .respond_with(status_page(r#"{"text":"four"}"#))
        .mount(&mock_server)
        .await;

    let input = b"4\tu\nnot an id\n3\tu\n2\tu\n1\tu\n";
    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    let summary = coordinator.crawl(&input[..]).await.unwrap();

    assert_eq!(
        read_fetched(&paths.output),
        vec![
            r#"{"text":"one","requested_id":1}"#.to_string(),
            r#"{"text":"four","requested_id":4}"#.to_string(),
        ]
    );
    assert_eq!(
        read_repair(&dir.path().join("repair.txt")),
        vec!["3\tu".to_string()]
    );

    let store = coordinator.store();
    for id in 1..=4u64 {
        assert!(!(store.is_fetched(id) && store.needs_repair(id)));
    }
    assert!(!store.is_fetched(2) && !store.needs_repair(2));

    assert_eq!(summary.stats.submitted, 4);
    assert_eq!(summary.stats.skipped, 1);
    assert_eq!(summary.fetched_written, 2);
    assert_eq!(summary.repair_written, Some(1));
    assert_eq!(summary.unresolved, 0);

    let report = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(report.contains("| Submitted | 4 |"));
    assert!(report.contains("- missing page: 1"));
}

#[tokio::test]
async fn test_run_reads_input_file() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);
    std::fs::write(&paths.input, "42\tabc\n").unwrap();

    Mock::given(method("GET"))
        .and(path("/abc/status/42"))
        .respond_with(status_page(r#"{"text":"hello"}"#))
        .mount(&mock_server)
        .await;

    let coordinator =
        Coordinator::new(create_test_config(&mock_server.uri()), paths.clone()).unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.fetched_written, 1);
    assert_eq!(read_fetched(&paths.output).len(), 1);
}

#[tokio::test]
async fn test_transport_timeout_is_retried_then_repaired() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    // One initial attempt plus one retry, both timing out
    Mock::given(method("GET"))
        .and(path("/slow/status/12"))
        .respond_with(status_page(r#"{"text":"late"}"#).set_delay(Duration::from_millis(500)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawler.request_timeout = 100;
    config.crawler.max_retry_attempts = 1;

    let coordinator = Coordinator::new(config, paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"12\tslow\n"[..]).await.unwrap();

    assert!(read_fetched(&paths.output).is_empty());
    assert_eq!(
        read_repair(&dir.path().join("repair.txt")),
        vec!["12\tslow".to_string()]
    );
    assert_eq!(summary.stats.retries, 1);
}

#[tokio::test]
async fn test_run_longer_than_drain_window_loses_nothing() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    Mock::given(method("GET"))
        .respond_with(status_page(r#"{"text":"slow"}"#).set_delay(Duration::from_millis(300)))
        .expect(5)
        .mount(&mock_server)
        .await;

    // A single connection makes the run take about 1.5 s, far beyond the
    // 300 ms drain window
    let mut config = create_test_config(&mock_server.uri());
    config.crawler.max_connections = 1;
    config.crawler.drain_polls = 3;
    config.crawler.drain_interval = 100;

    let coordinator = Coordinator::new(config, paths.clone()).unwrap();
    let summary = coordinator
        .crawl(&b"1\tu\n2\tu\n3\tu\n4\tu\n5\tu\n"[..])
        .await
        .unwrap();

    assert_eq!(read_fetched(&paths.output).len(), 5);
    assert!(read_repair(&dir.path().join("repair.txt")).is_empty());
    assert_eq!(summary.fetched_written, 5);
    assert_eq!(summary.unresolved, 0);
}

/// Records when each request arrives and answers after a fixed delay
struct RecordArrivals {
    arrivals: Arc<Mutex<Vec<Instant>>>,
    delay: Duration,
}

impl Respond for RecordArrivals {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        status_page(r#"{"text":"counted"}"#).set_delay(self.delay)
    }
}

#[tokio::test]
async fn test_connections_are_bounded() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    let arrivals = Arc::new(Mutex::new(Vec::new()));
    let delay = Duration::from_millis(200);
    Mock::given(method("GET"))
        .respond_with(RecordArrivals {
            arrivals: arrivals.clone(),
            delay,
        })
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawler.max_connections = 2;

    let coordinator = Coordinator::new(config, paths.clone()).unwrap();
    let input: String = (1..=6).map(|id| format!("{}\tu\n", id)).collect();
    coordinator.crawl(input.as_bytes()).await.unwrap();

    assert_eq!(read_fetched(&paths.output).len(), 6);

    let mut arrivals = arrivals.lock().unwrap().clone();
    arrivals.sort();
    assert_eq!(arrivals.len(), 6);

    // A request can only start once one of the two in flight has answered
    let window = delay - Duration::from_millis(50);
    for (i, start) in arrivals.iter().enumerate() {
        let overlapping = arrivals[i..]
            .iter()
            .filter(|other| other.duration_since(*start) < window)
            .count();
        assert!(overlapping <= 2, "{} requests overlapped", overlapping);
    }
}

#[tokio::test]
async fn test_retry_waiting_for_a_connection_is_repaired_at_shutdown() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let paths = create_paths(&dir);

    Mock::given(method("GET"))
        .and(path("/u/status/2"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Holds the only connection past the end of the run
    Mock::given(method("GET"))
        .and(path("/u/status/1"))
        .respond_with(status_page(r#"{"text":"late"}"#).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri());
    config.crawler.max_connections = 1;
    config.crawler.drain_polls = 2;
    config.crawler.drain_interval = 100;

    let coordinator = Coordinator::new(config, paths.clone()).unwrap();
    let summary = coordinator.crawl(&b"2\tu\n1\tu\n"[..]).await.unwrap();

    // The retry of 2 was waiting for the connection held by 1 when the
    // transport closed
    assert_eq!(
        read_repair(&dir.path().join("repair.txt")),
        vec!["2\tu".to_string()]
    );
    assert!(read_fetched(&paths.output).is_empty());
    assert_eq!(summary.stats.dispatch_failures, 1);
    assert!(!summary.drained);
    assert_eq!(summary.unresolved, 1);
}
