use std::{net::SocketAddr, sync::Arc};

use alert_relay::{
    config::AppConfig,
    engine::AlertManager,
    http_server::{self, ALERT_ROUTE, ApiState},
    persistence::{InMemoryEventStore, traits::EventWindowStore},
};
use reqwest::{Client, Response};
use tokio::{net::TcpListener, task};
use tokio_util::sync::CancellationToken;
use url::Url;

pub fn create_test_config(webhook: Option<&str>, threshold: u64) -> AppConfig {
    AppConfig {
        listen_address: "127.0.0.1:0".to_string(),
        webhook: webhook.map(|url| Url::parse(url).expect("Invalid webhook URL")),
        threshold,
        ..Default::default()
    }
}

pub struct TestServer {
    pub address: SocketAddr,
    pub client: Client,
    pub alert_manager: Arc<AlertManager>,
    server_handle: task::JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl TestServer {
    pub async fn new(config: AppConfig) -> Self {
        let store: Arc<dyn EventWindowStore> = Arc::new(InMemoryEventStore::new());
        Self::with_store(config, store).await
    }

    pub async fn with_store(config: AppConfig, store: Arc<dyn EventWindowStore>) -> Self {
        let alert_manager =
            Arc::new(AlertManager::from_config(&config, store).expect("Failed to build manager"));

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("Failed to bind");
        let address = listener.local_addr().expect("Failed to get address");

        let cancellation_token = CancellationToken::new();
        let state = ApiState::new(Arc::clone(&alert_manager));
        let token = cancellation_token.clone();
        let server_handle = task::spawn(async move {
            http_server::serve(listener, state, token).await.expect("Server failed");
        });

        Self { address, client: Client::new(), alert_manager, server_handle, cancellation_token }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.address, path)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client.get(self.url(path)).send().await.expect("Failed to send request")
    }

    pub async fn post_alert(&self, body: serde_json::Value) -> Response {
        self.client
            .post(self.url(ALERT_ROUTE))
            .json(&body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn post_raw(&self, body: &'static str) -> Response {
        self.client
            .post(self.url(ALERT_ROUTE))
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to send request")
    }

    pub async fn shutdown(self) {
        self.cancellation_token.cancel();
        self.server_handle.await.expect("Server task panicked");
    }
}
