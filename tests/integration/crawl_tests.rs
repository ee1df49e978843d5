//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock search services and test
//! the full crawl cycle end-to-end.

use codetrawl::config::Config;
use codetrawl::crawler::{trawl, Coordinator, CrawlObserver};
use codetrawl::output::Content;
use codetrawl::search::Classification;
use codetrawl::{JsonLinesSink, Match, Query, Service, TrawlError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REV: &str = "0123456789abcdef0123456789abcdef01234567";

/// Creates a test configuration pointing both services at the mock server
fn create_test_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.user_agent.crawler_name = "TestBot".to_string();
    config.fetcher.initial_backoff_ms = 1;
    config.primary.base_url = base_url.to_string();
    config.secondary.base_url = base_url.to_string();
    config.secondary.per_page = 2;
    config
}

fn result_link(base_url: &str, id: u32) -> String {
    format!("{}/owner/repo/blob/{}/src/{}.rs", base_url, REV, id)
}

/// Renders a search results page with the given heading and result ids
fn results_page(base_url: &str, heading: &str, ids: impl IntoIterator<Item = u32>) -> String {
    let anchors: String = ids
        .into_iter()
        .map(|id| format!(r#"<a href="{}#L3">result</a>"#, result_link(base_url, id)))
        .collect();
    format!(
        r#"<html><body>
        <h3>{}</h3>
        <div id="code_search_results"><div class="code-list">{}</div></div>
        </body></html>"#,
        heading, anchors
    )
}

fn found_page(base_url: &str, count: u32, ids: impl IntoIterator<Item = u32>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_string(results_page(
        base_url,
        &format!("We've found {} code results", count),
        ids,
    ))
}

async fn mount_search_page(server: &MockServer, page: u32, times: u64, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("p", page.to_string()))
        .respond_with(response)
        .up_to_n_times(times)
        .mount(server)
        .await;
}

async fn mount_raw_files(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/owner/repo/raw/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fn main() {\n    todo();\n}\n"))
        .mount(server)
        .await;
}

fn primary_query() -> Query {
    Query::new(Service::Primary, "needle")
}

fn paths(matches: &[Match]) -> Vec<String> {
    matches.iter().map(|m| m.path.clone()).collect()
}

/// Observer that remembers what it was told
#[derive(Default)]
struct RecordingObserver {
    delays: Mutex<Vec<Duration>>,
    classifications: Mutex<Vec<(u32, u32, Classification)>>,
    failures: Mutex<Vec<usize>>,
}

impl CrawlObserver for RecordingObserver {
    fn backing_off(&self, _url: &str, delay: Duration, _attempt: u32) {
        self.delays.lock().unwrap().push(delay);
    }

    fn page_classified(&self, pass: u32, page: u32, classification: &Classification) {
        self.classifications
            .lock()
            .unwrap()
            .push((pass, page, classification.clone()));
    }

    fn content_failed(&self, index: usize, _url: &str, _error: &TrawlError) {
        self.failures.lock().unwrap().push(index);
    }
}

#[tokio::test]
async fn test_single_page_search() {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "needle"))
        .and(query_param("type", "Code"))
        .and(query_param("p", "1"))
        .respond_with(found_page(&base, 5, 0..5))
        .expect(1)
        .mount(&server)
        .await;
    mount_raw_files(&server).await;

    let mut sink: Vec<Match> = Vec::new();
    let summary = trawl(create_test_config(&base), &primary_query(), &mut sink)
        .await
        .expect("crawl should succeed");

    assert_eq!(
        paths(&sink),
        vec!["src/0.rs", "src/1.rs", "src/2.rs", "src/3.rs", "src/4.rs"]
    );
    assert_eq!(sink[0].repo, "github:owner/repo");
    assert_eq!(
        sink[0].content_url,
        format!("{}/owner/repo/raw/{}/src/0.rs", base, REV)
    );
    assert_eq!(
        sink[0].content,
        Content::Text("fn main() {\n    todo();\n}\n".to_string())
    );
    assert_eq!(summary.search_requests, 1);
    assert_eq!(summary.passes, 1);
    assert_eq!(summary.matches, 5);
}

#[tokio::test]
async fn test_unstable_ordering_rescans_until_converged() {
    let server = MockServer::start().await;
    let base = server.uri();

    // Pass 1 sees 20 distinct hits; pass 2 page 1 shows the missing five
    mount_search_page(&server, 1, 1, found_page(&base, 25, 0..10)).await;
    mount_search_page(&server, 1, 1, found_page(&base, 25, 20..25)).await;
    mount_search_page(&server, 2, 1, found_page(&base, 25, 5..15)).await;
    mount_search_page(&server, 3, 1, found_page(&base, 25, 15..20)).await;
    mount_raw_files(&server).await;

    let observer = Arc::new(RecordingObserver::default());
    let coordinator = Coordinator::new(create_test_config(&base), observer.clone()).unwrap();

    let mut sink: Vec<Match> = Vec::new();
    let summary = coordinator.run(&primary_query(), &mut sink).await.unwrap();

    assert_eq!(sink.len(), 25);
    let expected: Vec<String> = (0..25).map(|id| format!("src/{}.rs", id)).collect();
    assert_eq!(paths(&sink), expected);

    assert_eq!(summary.passes, 2);
    assert_eq!(summary.search_requests, 4);
    assert_eq!(summary.advertised, Some(25));

    let visited: Vec<(u32, u32)> = observer
        .classifications
        .lock()
        .unwrap()
        .iter()
        .map(|(pass, page, _)| (*pass, *page))
        .collect();
    assert_eq!(visited, vec![(1, 1), (1, 2), (1, 3), (2, 1)]);
}

#[tokio::test]
async fn test_zero_results() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_search_page(
        &server,
        1,
        1,
        ResponseTemplate::new(200).set_body_string(results_page(
            &base,
            "We couldn\u{2019}t find any code matching 'needle'",
            std::iter::empty(),
        )),
    )
    .await;

    let mut sink: Vec<Match> = Vec::new();
    let summary = trawl(create_test_config(&base), &primary_query(), &mut sink)
        .await
        .unwrap();

    assert!(sink.is_empty());
    assert_eq!(summary.advertised, Some(0));
}

#[tokio::test]
async fn test_too_many_hits_emits_nothing() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_search_page(&server, 1, 1, found_page(&base, 1500, 0..10)).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/owner/repo/raw/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut sink: Vec<Match> = Vec::new();
    let err = trawl(create_test_config(&base), &primary_query(), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, TrawlError::TooManyHits { count: 1500 }));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_repeated_partial_timeouts_fail() {
    let server = MockServer::start().await;
    let base = server.uri();

    let timed_out = format!(
        r#"<html><body><h3>Showing 2,948 available code results
        <a href="https://docs.example.com/searching-github#potential-timeouts">?</a></h3>
        <div id="code_search_results"><div class="code-list">
        <a href="{}">result</a></div></div></body></html>"#,
        result_link(&base, 1)
    );
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string(timed_out))
        .expect(3)
        .mount(&server)
        .await;

    let mut sink: Vec<Match> = Vec::new();
    let err = trawl(create_test_config(&base), &primary_query(), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TrawlError::PartialResults {
            page: 1,
            attempts: 3
        }
    ));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_rate_limiting_backs_off_and_resets() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_search_page(&server, 1, 3, ResponseTemplate::new(429)).await;
    mount_search_page(&server, 1, 1, found_page(&base, 1, [7u32])).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/owner/repo/raw/"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_raw_files(&server).await;

    let observer = Arc::new(RecordingObserver::default());
    let coordinator = Coordinator::new(create_test_config(&base), observer.clone()).unwrap();

    let mut sink: Vec<Match> = Vec::new();
    coordinator.run(&primary_query(), &mut sink).await.unwrap();

    assert_eq!(sink.len(), 1);
    assert!(!sink[0].content.is_error());
    assert_eq!(
        *observer.delays.lock().unwrap(),
        vec![
            Duration::from_millis(1),
            Duration::from_millis(2),
            Duration::from_millis(4),
            Duration::from_millis(1),
        ]
    );
}

#[tokio::test]
async fn test_content_failure_is_recorded_and_crawl_continues() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_search_page(&server, 1, 1, found_page(&base, 3, 0..3)).await;
    Mock::given(method("GET"))
        .and(path(format!("/owner/repo/raw/{}/src/1.rs", REV)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    mount_raw_files(&server).await;

    let observer = Arc::new(RecordingObserver::default());
    let coordinator = Coordinator::new(create_test_config(&base), observer.clone()).unwrap();

    let mut sink: Vec<Match> = Vec::new();
    let summary = coordinator.run(&primary_query(), &mut sink).await.unwrap();

    assert_eq!(sink.len(), 3);
    assert!(!sink[0].content.is_error());
    match &sink[1].content {
        Content::Error { error } => assert!(error.contains("404"), "{}", error),
        other => panic!("expected an error marker, got {:?}", other),
    }
    assert!(!sink[2].content.is_error());
    assert_eq!(summary.content_failures, 1);
    assert_eq!(*observer.failures.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn test_search_server_error_is_fatal() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_search_page(&server, 1, 1, ResponseTemplate::new(500)).await;

    let mut sink: Vec<Match> = Vec::new();
    let err = trawl(create_test_config(&base), &primary_query(), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, TrawlError::Http { status: 500, .. }));
}

#[tokio::test]
async fn test_streaming_emits_before_failure() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_search_page(&server, 1, 2, found_page(&base, 15, 0..10)).await;
    mount_search_page(&server, 2, 2, ResponseTemplate::new(500)).await;
    mount_raw_files(&server).await;

    let mut buffered: Vec<Match> = Vec::new();
    let err = trawl(create_test_config(&base), &primary_query(), &mut buffered)
        .await
        .unwrap_err();
    assert!(matches!(err, TrawlError::Http { status: 500, .. }));
    assert!(buffered.is_empty());

    let mut config = create_test_config(&base);
    config.output.stream_matches = true;
    let mut streamed: Vec<Match> = Vec::new();
    let err = trawl(config, &primary_query(), &mut streamed)
        .await
        .unwrap_err();
    assert!(matches!(err, TrawlError::Http { status: 500, .. }));
    assert_eq!(streamed.len(), 10);
}

#[tokio::test]
async fn test_streaming_emits_each_hit_once() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_search_page(&server, 1, 1, found_page(&base, 25, 0..10)).await;
    mount_search_page(&server, 1, 1, found_page(&base, 25, 20..25)).await;
    mount_search_page(&server, 2, 1, found_page(&base, 25, 5..15)).await;
    mount_search_page(&server, 3, 1, found_page(&base, 25, 15..20)).await;
    mount_raw_files(&server).await;

    let mut config = create_test_config(&base);
    config.output.stream_matches = true;
    let mut sink: Vec<Match> = Vec::new();
    trawl(config, &primary_query(), &mut sink).await.unwrap();

    let expected: Vec<String> = (0..25).map(|id| format!("src/{}.rs", id)).collect();
    assert_eq!(paths(&sink), expected);
}

#[tokio::test]
async fn test_secondary_stops_at_empty_page() {
    let server = MockServer::start().await;
    let base = server.uri();

    let result = |id: u32| {
        serde_json::json!({
            "repo": "https://example.org/numpy.git",
            "location": "/numpy/core",
            "filename": format!("{}.c", id),
            "url": format!("{}/view/{}/", base, id),
        })
    };

    for (page, results) in [
        (0, vec![result(1), result(2)]),
        (1, vec![result(3)]),
        (2, vec![]),
    ] {
        Mock::given(method("GET"))
            .and(path("/api/codesearch_I"))
            .and(query_param("q", "PyArray"))
            .and(query_param("per_page", "2"))
            .and(query_param("p", page.to_string()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"page": page, "results": results})),
            )
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path_regex(r"^/raw/[0-9]+/$"))
        .respond_with(ResponseTemplate::new(200).set_body_string("PyArray_New();"))
        .expect(3)
        .mount(&server)
        .await;

    let mut sink: Vec<Match> = Vec::new();
    let summary = trawl(
        create_test_config(&base),
        &Query::new(Service::Secondary, "PyArray"),
        &mut sink,
    )
    .await
    .unwrap();

    assert_eq!(
        paths(&sink),
        vec!["/numpy/core/1.c", "/numpy/core/2.c", "/numpy/core/3.c"]
    );
    assert_eq!(sink[0].service, Service::Secondary);
    assert_eq!(sink[0].content_url, format!("{}/raw/1/", base));
    assert_eq!(summary.search_requests, 3);
}

#[tokio::test]
async fn test_secondary_page_echo_mismatch() {
    let server = MockServer::start().await;
    let base = server.uri();

    let item = serde_json::json!({
        "repo": "r", "location": "", "filename": "a.c",
        "url": format!("{}/view/1/", base),
    });
    Mock::given(method("GET"))
        .and(path("/api/codesearch_I"))
        .and(query_param("p", "0"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"page": 0, "results": [item]})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/codesearch_I"))
        .and(query_param("p", "1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"page": 0, "results": [item]})),
        )
        .mount(&server)
        .await;

    let mut sink: Vec<Match> = Vec::new();
    let err = trawl(
        create_test_config(&base),
        &Query::new(Service::Secondary, "PyArray"),
        &mut sink,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        TrawlError::TooManyResults {
            requested: 1,
            returned: 0
        }
    ));
    assert!(sink.is_empty());
}

#[tokio::test]
async fn test_json_lines_output() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_search_page(&server, 1, 1, found_page(&base, 2, 0..2)).await;
    mount_raw_files(&server).await;

    let mut sink = JsonLinesSink::new(Vec::new());
    trawl(create_test_config(&base), &primary_query(), &mut sink)
        .await
        .unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let records: Vec<serde_json::Value> = out
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["service"], "primary");
    assert_eq!(records[0]["query"], "needle");
    assert_eq!(records[1]["path"], "src/1.rs");
    assert_eq!(records[1]["content"], "fn main() {\n    todo();\n}\n");
}
