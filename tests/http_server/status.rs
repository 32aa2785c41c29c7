use serde_json::json;

use crate::helpers::*;

#[tokio::test]
async fn status_endpoint_reports_policy_and_tracked_fingerprints() {
    let server = TestServer::new(create_test_config(None, 4)).await;

    server.post_alert(json!({ "event": "a", "buildSha": "1" })).await;
    server.post_alert(json!({ "event": "a", "buildSha": "2" })).await;
    server.post_alert(json!({ "event": "b" })).await;

    let resp = server.get("/status").await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = resp.json().await.expect("Failed to parse JSON");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["tracked_fingerprints"], 3);
    assert_eq!(body["forwarding_enabled"], false);
    assert_eq!(body["threshold"], 4);
    assert_eq!(body["window_ms"], 60_000);
    assert!(body["uptime_secs"].is_u64());

    server.shutdown().await;
}
