use alert_relay::models::EventKey;
use mockito::Matcher;
use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn missing_event_returns_bad_request() {
    let server = TestServer::new(create_test_config(None, 3)).await;

    let resp = server.post_alert(json!({ "message": "oops", "severity": "critical" })).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "ok": false, "reason": "missing event" }));

    server.shutdown().await;
}

#[tokio::test]
async fn without_webhook_event_is_recorded_but_not_forwarded() {
    let server = TestServer::new(create_test_config(None, 3)).await;

    let resp = server.post_alert(json!({ "event": "x" })).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "ok": true, "forwarded": false, "reason": "no webhook configured" }));

    let now_ms = chrono::Utc::now().timestamp_millis();
    let count = server
        .alert_manager
        .store()
        .get_event_count(&EventKey::from("x:unknown"), now_ms, 60_000)
        .await
        .unwrap();
    assert_eq!(count, 1);

    server.shutdown().await;
}

#[tokio::test]
async fn second_occurrence_is_forwarded_at_threshold_two() {
    let mut webhook = mockito::Server::new_async().await;
    let mock = webhook
        .mock("POST", "/slack")
        .match_body(Matcher::PartialJson(json!({
            "text": "checkout_failed reported (build abc123)\n• Message: card declined\n• Count in window: 2\n• URL: https://shop.example.com/checkout"
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let webhook_url = format!("{}/slack", webhook.url());
    let server = TestServer::new(create_test_config(Some(webhook_url.as_str()), 2)).await;
    let event = json!({
        "event": "checkout_failed",
        "message": "card declined",
        "url": "https://shop.example.com/checkout",
        "buildSha": "abc123"
    });

    let first: serde_json::Value = server.post_alert(event.clone()).await.json().await.unwrap();
    let second: serde_json::Value = server.post_alert(event).await.json().await.unwrap();

    assert_eq!(first, json!({ "ok": true, "forwarded": false, "count": 1 }));
    assert_eq!(second, json!({ "ok": true, "forwarded": true, "count": 2 }));
    mock.assert_async().await;

    server.shutdown().await;
}

#[tokio::test]
async fn critical_event_is_forwarded_on_first_occurrence() {
    let mut webhook = mockito::Server::new_async().await;
    let mock = webhook.mock("POST", "/").with_status(200).expect(1).create_async().await;
    let server = TestServer::new(create_test_config(Some(webhook.url().as_str()), 100)).await;

    let resp = server.post_alert(json!({ "event": "payments_down", "severity": "critical" })).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, json!({ "ok": true, "forwarded": true, "count": 1 }));
    mock.assert_async().await;

    server.shutdown().await;
}

#[tokio::test]
async fn different_builds_do_not_share_a_bucket() {
    let mut webhook = mockito::Server::new_async().await;
    let mock = webhook.mock("POST", "/").with_status(200).expect(0).create_async().await;
    let server = TestServer::new(create_test_config(Some(webhook.url().as_str()), 2)).await;

    let first: serde_json::Value =
        server.post_alert(json!({ "event": "e", "buildSha": "one" })).await.json().await.unwrap();
    let second: serde_json::Value =
        server.post_alert(json!({ "event": "e", "buildSha": "two" })).await.json().await.unwrap();

    assert_eq!(first["count"], 1);
    assert_eq!(second["count"], 1);
    assert_eq!(second["forwarded"], false);
    mock.assert_async().await;

    server.shutdown().await;
}

#[tokio::test]
async fn webhook_failure_returns_internal_error_without_retry() {
    let mut webhook = mockito::Server::new_async().await;
    let mock = webhook.mock("POST", "/").with_status(503).expect(1).create_async().await;
    let server = TestServer::new(create_test_config(Some(webhook.url().as_str()), 1)).await;

    let resp = server.post_alert(json!({ "event": "x" })).await;

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(body["error"].as_str().unwrap().contains("503"));
    mock.assert_async().await;

    server.shutdown().await;
}

#[tokio::test]
async fn malformed_body_returns_internal_error() {
    let server = TestServer::new(create_test_config(None, 3)).await;

    let resp = server.post_raw("{\"event\": ").await;

    assert_eq!(resp.status(), 500);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["ok"], false);
    assert!(body["error"].is_string());

    server.shutdown().await;
}
