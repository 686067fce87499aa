use std::time::Duration;

use vantage_advisory::{InsightProvider, RemoteConfig, RemoteInsightProvider, DISABLED_MESSAGE};
use vantage_mock_provider::{spawn, MockBehavior};
use vantage_protocol::{InsightRequest, PersonaTag};

fn enabled(endpoint: String) -> RemoteConfig {
    RemoteConfig {
        enabled: true,
        endpoint: Some(endpoint),
        timeout_ms: 1_000,
        max_retries: 2,
        backoff_ms: 10,
    }
}

fn dashboard() -> InsightRequest {
    InsightRequest::new("dashboard", PersonaTag::Buyer)
}

#[tokio::test]
async fn disabled_provider_fails_closed_without_io() {
    let provider = RemoteInsightProvider::disabled();
    let started = std::time::Instant::now();
    let response = provider.evaluate(&dashboard()).await;
    assert!(response.insights.is_empty());
    assert_eq!(response.error.as_deref(), Some(DISABLED_MESSAGE));
    assert!(started.elapsed() < Duration::from_millis(50));
}

#[tokio::test]
async fn disabled_flag_wins_over_configured_endpoint() {
    let server = spawn(MockBehavior::default()).await.expect("mock server");
    let provider = RemoteInsightProvider::new(RemoteConfig {
        enabled: false,
        ..enabled(server.endpoint())
    });
    let response = provider.evaluate(&dashboard()).await;
    assert_eq!(response.error.as_deref(), Some(DISABLED_MESSAGE));
    assert_eq!(server.hits(), 0);
}

#[tokio::test]
async fn enabled_without_endpoint_reports_error() {
    let provider = RemoteInsightProvider::new(RemoteConfig {
        enabled: true,
        ..RemoteConfig::default()
    });
    let response = provider.evaluate(&dashboard()).await;
    assert!(response.insights.is_empty());
    let error = response.error.expect("error");
    assert!(error.contains("no endpoint"), "{error}");
}

#[tokio::test]
async fn enabled_provider_returns_stamped_insights() {
    let server = spawn(MockBehavior::default()).await.expect("mock server");
    let provider = RemoteInsightProvider::new(enabled(server.endpoint()));
    let request = InsightRequest::new("orders", PersonaTag::Operator).with_context("region", "emea");
    let response = provider.evaluate(&request).await;

    assert!(response.error.is_none(), "{:?}", response.error);
    assert_eq!(response.insights.len(), 1);
    let insight = &response.insights[0];
    assert_eq!(insight.category_tag, "remote.orders");
    assert_eq!(insight.audit.provider_id, "remote");
    assert!(insight.audit.latency_ms >= 0.0);
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn retries_transient_failures() {
    let server = spawn(MockBehavior {
        fail_first: 2,
        ..MockBehavior::default()
    })
    .await
    .expect("mock server");
    let provider = RemoteInsightProvider::new(enabled(server.endpoint()));
    let response = provider.evaluate(&dashboard()).await;
    assert!(response.error.is_none(), "{:?}", response.error);
    assert_eq!(response.insights.len(), 1);
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn exhausted_retries_map_to_error() {
    let server = spawn(MockBehavior {
        fail_first: 10,
        ..MockBehavior::default()
    })
    .await
    .expect("mock server");
    let provider = RemoteInsightProvider::new(enabled(server.endpoint()));
    let response = provider.evaluate(&dashboard()).await;
    assert!(response.insights.is_empty());
    let error = response.error.expect("error");
    assert!(error.contains("after 3 attempt(s)"), "{error}");
    assert!(error.contains("HTTP 503"), "{error}");
    assert_eq!(server.hits(), 3);
}

#[tokio::test]
async fn slow_endpoint_times_out() {
    let server = spawn(MockBehavior {
        delay: Duration::from_millis(600),
        ..MockBehavior::default()
    })
    .await
    .expect("mock server");
    let provider = RemoteInsightProvider::new(RemoteConfig {
        timeout_ms: 100,
        max_retries: 1,
        ..enabled(server.endpoint())
    });
    let started = std::time::Instant::now();
    let response = provider.evaluate(&dashboard()).await;
    assert!(response.insights.is_empty());
    let error = response.error.expect("error");
    assert!(error.contains("timed out after 2 attempt(s)"), "{error}");
    assert!(started.elapsed() < Duration::from_millis(600));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = spawn(MockBehavior {
        fail_first: 5,
        failure_status: 400,
        ..MockBehavior::default()
    })
    .await
    .expect("mock server");
    let provider = RemoteInsightProvider::new(enabled(server.endpoint()));
    let response = provider.evaluate(&dashboard()).await;
    let error = response.error.expect("error");
    assert!(error.contains("HTTP 400"), "{error}");
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn backend_error_is_passed_through() {
    let server = spawn(MockBehavior {
        error: Some("model offline".into()),
        ..MockBehavior::default()
    })
    .await
    .expect("mock server");
    let provider = RemoteInsightProvider::new(enabled(server.endpoint()));
    let response = provider.evaluate(&dashboard()).await;
    assert!(response.insights.is_empty());
    assert_eq!(response.error.as_deref(), Some("model offline"));
}

#[tokio::test]
async fn unreachable_endpoint_exhausts_retries() {
    let provider = RemoteInsightProvider::new(RemoteConfig {
        max_retries: 1,
        ..enabled("http://127.0.0.1:9/v1/insights".to_string())
    });
    let response = provider.evaluate(&dashboard()).await;
    assert!(response.insights.is_empty());
    let error = response.error.expect("error");
    assert!(error.contains("2 attempt(s)"), "{error}");
}

#[tokio::test]
async fn malformed_endpoint_fails_without_retrying() {
    let provider = RemoteInsightProvider::new(RemoteConfig {
        max_retries: 3,
        backoff_ms: 2_000,
        ..enabled("not a url".to_string())
    });
    let started = std::time::Instant::now();
    let response = provider.evaluate(&dashboard()).await;
    assert!(response.insights.is_empty());
    let error = response.error.expect("error");
    assert!(error.contains("invalid endpoint"), "{error}");
    assert!(started.elapsed() < Duration::from_millis(1_000));
}
