#![allow(clippy::unwrap_used)]
// Integration tests for `HttpFetcher` retry and timeout behaviour using wiremock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use secrecy::SecretString;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use solarflow_api::{Error, FetchOptions, HttpFetcher, Method, MonitoringClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, HttpFetcher) {
    let server = MockServer::start().await;
    let fetcher =
        HttpFetcher::new(reqwest::Client::new()).with_retry_base(Duration::from_millis(10));
    (server, fetcher)
}

fn url(server: &MockServer, suffix: &str) -> Url {
    Url::parse(&format!("{}{suffix}", server.uri())).unwrap()
}

// ── Retry tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_retries_until_success() {
    let (server, fetcher) = setup().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let resp = fetcher
        .fetch(Method::Get, &url(&server, "/flaky"), &FetchOptions::new().max_retries(3))
        .await
        .unwrap();

    assert_eq!(resp.text().await.unwrap(), "ok");
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_exhausted_retries_carry_status_and_attempts() {
    let (server, fetcher) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let result = fetcher
        .fetch(Method::Get, &url(&server, "/down"), &FetchOptions::new().max_retries(3))
        .await;

    match result {
        Err(Error::RetriesExhausted {
            attempts, status, ..
        }) => {
            assert_eq!(attempts, 3);
            assert_eq!(status, Some(500));
        }
        other => panic!("expected RetriesExhausted, got: {other:?}"),
    }
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_single_attempt_does_not_retry() {
    let (server, fetcher) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let err = fetcher
        .fetch(Method::Get, &url(&server, "/once"), &FetchOptions::new().max_retries(1))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_backoff_waits_between_attempts() {
    let server = MockServer::start().await;
    let fetcher =
        HttpFetcher::new(reqwest::Client::new()).with_retry_base(Duration::from_millis(100));

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let started = Instant::now();
    let _ = fetcher
        .fetch(Method::Get, &url(&server, "/slow"), &FetchOptions::new().max_retries(3))
        .await;

    // 100ms after the first failure, 200ms after the second.
    assert!(started.elapsed() >= Duration::from_millis(300));
}

// ── Timeout tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_timeout_aborts_slow_response() {
    let (server, fetcher) = setup().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let options = FetchOptions::new()
        .timeout(Duration::from_millis(50))
        .max_retries(1);
    let err = fetcher
        .fetch(Method::Get, &url(&server, "/stall"), &options)
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got: {err:?}");
    assert_eq!(err.status(), None);
}

// ── Stalled body tests ──────────────────────────────────────────────

/// Raw server that sends headers promising 1000 bytes, a few of them, then
/// goes quiet. Returns its base URL and a count of accepted connections.
async fn stalled_body_server() -> (Url, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&accepted);

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = [0u8; 2048];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(
                        b"HTTP/1.1 200 OK\r\n\
                          Content-Type: application/json\r\n\
                          Content-Length: 1000\r\n\r\n\
                          {\"Inventory\":",
                    )
                    .await;
                tokio::time::sleep(Duration::from_secs(30)).await;
            });
        }
    });

    (Url::parse(&format!("http://{addr}/")).unwrap(), accepted)
}

#[tokio::test]
async fn test_timeout_covers_stalled_body() {
    let (base, accepted) = stalled_body_server().await;
    let fetcher =
        HttpFetcher::new(reqwest::Client::new()).with_retry_base(Duration::from_millis(10));
    let options = FetchOptions::new()
        .timeout(Duration::from_millis(200))
        .max_retries(2);

    let result = tokio::time::timeout(
        Duration::from_secs(3),
        fetcher.fetch_text(Method::Get, &base.join("slow").unwrap(), &options),
    )
    .await
    .expect("body read must be bounded by the request timeout");

    let err = result.unwrap_err();
    assert!(err.is_timeout(), "expected timeout, got: {err:?}");
    assert!(matches!(err, Error::RetriesExhausted { attempts: 2, .. }));
    assert_eq!(accepted.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_raw_response_body_keeps_timeout() {
    let (base, _) = stalled_body_server().await;
    let fetcher = HttpFetcher::new(reqwest::Client::new());
    let options = FetchOptions::new()
        .timeout(Duration::from_millis(200))
        .max_retries(1);

    let resp = fetcher
        .fetch(Method::Get, &base.join("slow").unwrap(), &options)
        .await
        .unwrap();
    let read = tokio::time::timeout(Duration::from_secs(3), resp.text())
        .await
        .expect("body read must be bounded by the request timeout");

    assert!(read.unwrap_err().is_timeout());
}

#[tokio::test]
async fn test_site_endpoint_gives_up_on_stalled_body() {
    let (base, _) = stalled_body_server().await;
    let client = MonitoringClient::with_fetcher(
        HttpFetcher::new(reqwest::Client::new()),
        base,
        SecretString::from("KEY".to_string()),
    )
    .with_request_policy(Duration::from_millis(200), 1);

    let result = tokio::time::timeout(Duration::from_secs(3), client.site_inventory(1))
        .await
        .expect("inventory call must not hang on a stalled body");

    assert!(result.unwrap_err().is_timeout());
}

// ── POST tests ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_post_sends_json_body() {
    let (server, fetcher) = setup().await;

    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(body_json(json!({ "hello": "world" })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let options = FetchOptions::new().body(json!({ "hello": "world" }));
    let resp = fetcher
        .fetch(Method::Post, &url(&server, "/submit"), &options)
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 201);
}
