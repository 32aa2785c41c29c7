use std::sync::Arc;

use alert_relay::persistence::{SqliteEventStore, traits::EventWindowStore};
use serde_json::json;

use crate::helpers::*;

async fn open_store(url: &str) -> Arc<dyn EventWindowStore> {
    let store = SqliteEventStore::new(url).await.expect("Failed to open store");
    store.run_migrations().await.expect("Failed to run migrations");
    Arc::new(store)
}

#[tokio::test]
async fn instances_sharing_a_database_count_together() {
    let temp_dir = tempfile::tempdir().unwrap();
    let database_url = format!("sqlite://{}", temp_dir.path().join("relay.db").display());

    let mut webhook = mockito::Server::new_async().await;
    let mock = webhook.mock("POST", "/").with_status(200).expect(1).create_async().await;
    let config = create_test_config(Some(webhook.url().as_str()), 2);

    let first_instance =
        TestServer::with_store(config.clone(), open_store(&database_url).await).await;
    let second_instance =
        TestServer::with_store(config, open_store(&database_url).await).await;

    let first: serde_json::Value =
        first_instance.post_alert(json!({ "event": "x" })).await.json().await.unwrap();
    let second: serde_json::Value =
        second_instance.post_alert(json!({ "event": "x" })).await.json().await.unwrap();

    assert_eq!(first, json!({ "ok": true, "forwarded": false, "count": 1 }));
    assert_eq!(second, json!({ "ok": true, "forwarded": true, "count": 2 }));
    mock.assert_async().await;

    first_instance.shutdown().await;
    second_instance.shutdown().await;
}
