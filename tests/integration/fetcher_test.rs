// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use racecrawl::engines::fetcher::{FetchOptions, Fetcher};
use racecrawl::engines::host_throttle::HostThrottle;
use racecrawl::engines::reqwest_engine::ReqwestEngine;
use racecrawl::utils::errors::FetchError;
use racecrawl::utils::retry_policy::RetryPolicy;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> Fetcher {
    Fetcher::new(Arc::new(ReqwestEngine::default()), HostThrottle::new(2))
}

fn options(max_retries: u32) -> FetchOptions {
    FetchOptions {
        timeout_ms: 500,
        max_retries,
        retry_backoff: RetryPolicy::fast(),
        rate_limit_ms: 0,
        ready_selector: None,
    }
}

#[tokio::test]
async fn test_service_unavailable_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/card"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/card"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>card</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let page = fetcher()
        .fetch(&format!("{}/card", server.uri()), &options(3))
        .await
        .unwrap();

    assert_eq!(page.status, 200);
    assert!(page.content.contains("card"));
}

#[tokio::test]
async fn test_rate_limited_until_retries_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/busy"))
        .respond_with(ResponseTemplate::new(429))
        .expect(3)
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&format!("{}/busy", server.uri()), &options(2))
        .await;

    assert_eq!(result.unwrap_err(), FetchError::HttpStatus(429));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&format!("{}/missing", server.uri()), &options(3))
        .await;

    assert_eq!(result.unwrap_err(), FetchError::HttpStatus(404));
}

#[tokio::test]
async fn test_interstitial_is_reported_as_blocked() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guarded"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><title>Just a moment...</title>Checking your browser</html>"),
        )
        .mount(&server)
        .await;

    let result = fetcher()
        .fetch(&format!("{}/guarded", server.uri()), &options(0))
        .await;

    assert!(matches!(result, Err(FetchError::Blocked(_))));
}

#[tokio::test]
async fn test_invalid_url_fails_without_request() {
    let result = fetcher().fetch("not a url", &options(3)).await;
    assert!(matches!(result, Err(FetchError::InvalidUrl(_))));

    let result = fetcher().fetch("ftp://example.com/card", &options(3)).await;
    assert!(matches!(result, Err(FetchError::InvalidUrl(_))));
}
