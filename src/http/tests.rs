//! Tests for the HTTP client module

use super::*;
use crate::auth::Credential;
use crate::error::{Error, ErrorKind};
use crate::types::Method;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::error::Error as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn unpaced(server: &MockServer) -> RateLimitedClient {
    let config = HttpClientConfig::builder(server.uri()).no_pacing().build();
    RateLimitedClient::with_config(config).unwrap()
}

#[test]
fn test_http_client_config_defaults() {
    let config = HttpClientConfig::new("https://api.example.com");
    assert_eq!(config.timeout, Duration::from_secs(30));
    assert_eq!(config.pacing, PacingPolicy::FixedInterval(Duration::from_millis(100)));
    assert!(config.retry_on_429);
    assert_eq!(config.max_retry_after, Duration::from_secs(60));
    assert_eq!(config.credential, Credential::None);
    assert!(config.user_agent.starts_with("paced-client/"));
    assert_eq!(config.error_paths[0], "message");
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder("https://api.example.com")
        .credential(Credential::bearer("t0k"))
        .timeout(Duration::from_secs(5))
        .pacing(PacingPolicy::sliding_window(10, Duration::from_secs(1)))
        .retry_on_429(false)
        .max_retry_after(Duration::from_secs(3))
        .header("Accept", "application/json")
        .user_agent("test-agent/1.0")
        .error_paths(["fault.message"])
        .build();

    assert_eq!(config.credential, Credential::bearer("t0k"));
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(
        config.pacing,
        PacingPolicy::SlidingWindow {
            max_requests: 10,
            per: Duration::from_secs(1)
        }
    );
    assert!(!config.retry_on_429);
    assert_eq!(config.max_retry_after, Duration::from_secs(3));
    assert_eq!(
        config.default_headers.get("Accept"),
        Some(&"application/json".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
    assert_eq!(config.error_paths, vec!["fault.message".to_string()]);
}

#[test]
fn test_request_options_builder() {
    let options = RequestOptions::new()
        .query("page", 2)
        .query("status", "open")
        .query("tag", vec!["a", "b"])
        .header("X-Request-Id", "abc123")
        .json(json!({"key": "value"}))
        .timeout(Duration::from_secs(10))
        .deadline(Duration::from_secs(20));

    assert_eq!(options.query.len(), 3);
    assert_eq!(
        options.headers.get("X-Request-Id"),
        Some(&"abc123".to_string())
    );
    assert_eq!(options.body, Some(json!({"key": "value"})));
    assert_eq!(options.timeout, Some(Duration::from_secs(10)));
    assert_eq!(options.deadline, Some(Duration::from_secs(20)));
}

#[test]
fn test_configure_rejects_bad_base_urls() {
    let err = RateLimitedClient::configure("not a url", Credential::None, PacingPolicy::Unlimited)
        .unwrap_err();
    assert!(matches!(err, Error::InvalidUrl(_)));

    let err = RateLimitedClient::configure(
        "ftp://files.example.com",
        Credential::None,
        PacingPolicy::Unlimited,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConfigValue { .. }));

    let err = RateLimitedClient::configure("", Credential::None, PacingPolicy::Unlimited)
        .unwrap_err();
    assert!(matches!(err, Error::MissingConfigField { .. }));
}

#[test]
fn test_configure_rejects_zero_quota() {
    let err = RateLimitedClient::configure(
        "https://api.example.com",
        Credential::None,
        PacingPolicy::sliding_window(0, Duration::from_secs(1)),
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);
}

#[test]
fn test_client_debug_redacts_credential() {
    let client = RateLimitedClient::configure(
        "https://api.example.com",
        Credential::bearer("very-secret-token"),
        PacingPolicy::default(),
    )
    .unwrap();

    let debug_str = format!("{client:?}");
    assert!(debug_str.contains("RateLimitedClient"));
    assert!(debug_str.contains("api.example.com"));
    assert!(!debug_str.contains("very-secret-token"));
}

#[tokio::test]
async fn test_get_returns_parsed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "42", "name": "Widget"})),
        )
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let payload = client.get("/widgets/42").await.unwrap();

    assert_eq!(payload, Payload::Json(json!({"id": "42", "name": "Widget"})));
}

#[tokio::test]
async fn test_no_content_yields_empty_object() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/widgets/42"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let payload = client.delete("/widgets/42").await.unwrap();

    assert_eq!(payload.into_json(), json!({}));
}

#[tokio::test]
async fn test_text_body_returned_raw() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let payload = client.get("health").await.unwrap();

    assert_eq!(payload, Payload::Text("OK".to_string()));
}

#[tokio::test]
async fn test_base_url_with_path_prefix() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/contacts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder(format!("{}/v1/", mock_server.uri()))
        .no_pacing()
        .build();
    let client = RateLimitedClient::with_config(config).unwrap();

    client.get("/contacts").await.unwrap();
    client.get("contacts").await.unwrap();
}

#[tokio::test]
async fn test_query_params_scalars_and_lists() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "acme"))
        .and(query_param("limit", "25"))
        .and(query_param("archived", "false"))
        .and(query_param("tag", "a"))
        .and(query_param("tag", "b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let options = RequestOptions::new()
        .query("q", "acme")
        .query("limit", 25)
        .query("archived", false)
        .query("tag", vec!["a", "b"]);

    let payload = client.get_with("/search", options).await.unwrap();
    assert_eq!(payload.into_json(), json!({"results": []}));
}

#[tokio::test]
async fn test_post_body_round_trip() {
    let mock_server = MockServer::start().await;
    let body = json!({
        "name": "Acme",
        "tags": ["a", "b"],
        "owner": {"id": 7, "active": true},
        "note": null
    });

    Mock::given(method("POST"))
        .and(path("/companies"))
        .and(body_json(body.clone()))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 1})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let payload = client.post("/companies", body).await.unwrap();

    assert_eq!(payload.into_json(), json!({"id": 1}));
}

#[tokio::test]
async fn test_put_and_patch_send_bodies() {
    let mock_server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/items/1"))
        .and(body_json(json!({"name": "full"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/items/1"))
        .and(body_json(json!({"name": "partial"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    client.put("/items/1", json!({"name": "full"})).await.unwrap();
    client.patch("/items/1", json!({"name": "partial"})).await.unwrap();
}

#[tokio::test]
async fn test_credential_and_headers_attached() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("Authorization", "Bearer secret-token"))
        .and(header("Accept", "application/json"))
        .and(header("X-Request-Id", "req-456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "me"})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder(mock_server.uri())
        .credential(Credential::bearer("secret-token"))
        .header("Accept", "application/json")
        .no_pacing()
        .build();
    let client = RateLimitedClient::with_config(config).unwrap();

    client
        .get_with("/me", RequestOptions::new().header("X-Request-Id", "req-456"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_api_key_query_credential() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/lists"))
        .and(query_param("key", "k-1"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder(mock_server.uri())
        .credential(Credential::api_key_query("key", "k-1"))
        .no_pacing()
        .build();
    let client = RateLimitedClient::with_config(config).unwrap();

    client
        .get_with("/lists", RequestOptions::new().query("page", 3))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_request_json_typed() {
    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Widget {
        id: String,
        name: String,
    }

    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "42", "name": "Widget"})),
        )
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let widget: Widget = client
        .request_json(Method::GET, "/widgets/42", RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(
        widget,
        Widget {
            id: "42".into(),
            name: "Widget".into()
        }
    );
}

#[tokio::test]
async fn test_401_is_authentication_error_without_retry() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/private"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid API key"})),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let err = client.get("/private").await.unwrap_err();

    match err {
        Error::Authentication { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid API key");
        }
        other => panic!("expected Authentication, got {other:?}"),
    }
}

#[tokio::test]
async fn test_403_is_authentication_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden for this plan"))
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let err = client.get("/admin").await.unwrap_err();

    assert!(matches!(err, Error::Authentication { status: 403, .. }));
    assert!(err.to_string().contains("Forbidden for this plan"));
}

#[tokio::test]
async fn test_404_is_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/widgets/missing"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"error": {"message": "No such widget"}})),
        )
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let err = client.get("/widgets/missing").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("No such widget"));
}

#[tokio::test]
async fn test_other_status_is_api_error_with_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/contacts"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"errors": [{"message": "email is invalid"}]})),
        )
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let err = client
        .post("/contacts", json!({"email": "nope"}))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 422, .. }));
    let text = err.to_string();
    assert!(text.contains("422"));
    assert!(text.contains("email is invalid"));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_server_error_is_not_retried_automatically() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad gateway"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let err = client.get("/flaky").await.unwrap_err();

    assert!(matches!(err, Error::Api { status: 502, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_caller_backoff_recovers_from_5xx() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let backoff = Backoff::new(
        crate::types::BackoffType::Constant,
        Duration::from_millis(10),
        Duration::from_secs(1),
    );

    let client = &client;
    let payload = backoff
        .retry(3, move || client.get("/flaky"))
        .await
        .unwrap();
    assert_eq!(payload.into_json(), json!({"ok": true}));
}

#[tokio::test]
async fn test_429_with_retry_after_retries_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "2")
                .set_body_string("Rate limited"),
        )
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let start = Instant::now();
    let payload = client.get("/limited").await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(2));
    assert_eq!(payload.into_json(), json!({"ok": true}));
}

#[tokio::test]
async fn test_second_429_is_raised() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "1")
                .set_body_json(json!({"message": "slow down"})),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let err = client.get("/limited").await.unwrap_err();

    match err {
        Error::RateLimited {
            retry_after,
            message,
        } => {
            assert_eq!(retry_after, Some(Duration::from_secs(1)));
            assert_eq!(message, "slow down");
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn test_429_without_retry_after_is_immediate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let err = client.get("/limited").await.unwrap_err();

    assert!(matches!(err, Error::RateLimited { retry_after: None, .. }));
}

#[tokio::test]
async fn test_429_retry_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder(mock_server.uri())
        .no_pacing()
        .retry_on_429(false)
        .build();
    let client = RateLimitedClient::with_config(config).unwrap();
    let err = client.get("/limited").await.unwrap_err();

    assert_eq!(err.retry_after(), Some(Duration::from_secs(1)));
}

#[tokio::test]
async fn test_429_retry_after_above_cap_is_not_honored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "3600"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder(mock_server.uri())
        .no_pacing()
        .max_retry_after(Duration::from_secs(5))
        .build();
    let client = RateLimitedClient::with_config(config).unwrap();

    let start = Instant::now();
    let err = client.get("/limited").await.unwrap_err();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(3600)));
}

#[tokio::test]
async fn test_timeout_is_transport_error_and_keeps_last_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let config = HttpClientConfig::builder(mock_server.uri())
        .timeout(Duration::from_millis(200))
        .no_pacing()
        .build();
    let client = RateLimitedClient::with_config(config).unwrap();

    let err = client.get("/slow").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_timeout());
    let source = err.source().expect("transport errors wrap their cause");
    assert!(source.downcast_ref::<reqwest::Error>().is_some());

    let snapshot = client.pacing_snapshot().await;
    assert!(snapshot.last_request.is_some());
    assert_eq!(snapshot.last_success, None);
}

#[tokio::test]
async fn test_connection_refused_is_transport_error() {
    // Port 1 is reserved and nothing listens there in test environments.
    let client =
        RateLimitedClient::configure("http://127.0.0.1:1", Credential::None, PacingPolicy::Unlimited)
            .unwrap();

    let err = client.get("/anything").await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_success_records_last_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    assert_eq!(client.pacing_snapshot().await.last_success, None);

    client.get("/ping").await.unwrap();
    assert!(client.pacing_snapshot().await.last_success.is_some());
}

#[tokio::test]
async fn test_invalid_requests_never_hit_the_network() {
    let mock_server = MockServer::start().await;

    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);

    let err = client
        .get_with("/x", RequestOptions::new().json(json!({"a": 1})))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let err = client
        .request(Method::POST, "/x", RequestOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);

    let err = client.get("https://elsewhere.example.com/x").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

#[tokio::test]
async fn test_delete_with_optional_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/members"))
        .and(body_json(json!({"ids": [1, 2]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 2})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let payload = client
        .request(
            Method::DELETE,
            "/members",
            RequestOptions::new().json(json!({"ids": [1, 2]})),
        )
        .await
        .unwrap();

    assert_eq!(payload.into_json(), json!({"deleted": 2}));
}

#[tokio::test]
async fn test_repeated_get_is_stable() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/catalog"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 1}, {"id": 2}],
            "next": null
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);
    let options = RequestOptions::new().query("page", 1);

    let first = client.get_with("/catalog", options.clone()).await.unwrap();
    let second = client.get_with("/catalog", options).await.unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_fixed_interval_paces_real_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(4)
        .mount(&mock_server)
        .await;

    let client = RateLimitedClient::configure(
        mock_server.uri(),
        Credential::None,
        PacingPolicy::fixed_interval(Duration::from_millis(100)),
    )
    .unwrap();

    let start = Instant::now();
    for _ in 0..4 {
        client.get("/data").await.unwrap();
    }

    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_sliding_window_paces_real_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = RateLimitedClient::configure(
        mock_server.uri(),
        Credential::None,
        PacingPolicy::sliding_window(2, Duration::from_millis(400)),
    )
    .unwrap();

    let start = Instant::now();
    for _ in 0..3 {
        client.get("/data").await.unwrap();
    }

    assert!(start.elapsed() >= Duration::from_millis(400));
    assert!(client.pacing_snapshot().await.window_len <= 2);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_pacer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(3)
        .mount(&mock_server)
        .await;

    let client = Arc::new(
        RateLimitedClient::configure(
            mock_server.uri(),
            Credential::None,
            PacingPolicy::fixed_interval(Duration::from_millis(150)),
        )
        .unwrap(),
    );

    let start = Instant::now();
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let client = Arc::clone(&client);
            tokio::spawn(async move { client.get("/data").await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(start.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_deadline_refuses_long_pacing_wait() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = RateLimitedClient::configure(
        mock_server.uri(),
        Credential::None,
        PacingPolicy::fixed_interval(Duration::from_secs(30)),
    )
    .unwrap();

    client.get("/data").await.unwrap();

    let start = Instant::now();
    let err = client
        .get_with(
            "/data",
            RequestOptions::new().deadline(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Deadline);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_deadline_caps_network_wait() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);

    let start = Instant::now();
    let err = client
        .get_with(
            "/slow",
            RequestOptions::new().deadline(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_deadline_bounds_wait_for_busy_client() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let client = Arc::new(unpaced(&mock_server));

    let busy = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.get("/slow").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    let start = Instant::now();
    let err = client
        .get_with(
            "/slow",
            RequestOptions::new().deadline(Duration::from_millis(200)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Deadline);
    assert!(start.elapsed() < Duration::from_secs(1));

    busy.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_retry_after_past_deadline_is_raised() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = unpaced(&mock_server);

    let start = Instant::now();
    let err = client
        .get_with(
            "/limited",
            RequestOptions::new().deadline(Duration::from_secs(1)),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::RateLimited { retry_after: Some(d), .. } if d == Duration::from_secs(5)
    ));
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_oversized_retry_after_is_not_honored() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/limited"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "1e20"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Arc::new(unpaced(&mock_server));
    let task = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.get("/limited").await })
    };

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::RateLimited { retry_after: None, .. }));
}
