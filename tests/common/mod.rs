//! Shared harness: a gateway on an ephemeral port over a temporary definitions directory.

#![allow(dead_code)]

use erp_gateway::transport;
use erp_gateway::{DefinitionRegistry, InMemoryExecutionLogStore, MappingEngine, MockRpcExecutor};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub const ORDER_YML: &str = include_str!("../../interfaces/ORDER.yml");
pub const STOCK_YML: &str = include_str!("../../interfaces/STOCK_MOVEMENT.yml");

pub struct TestServer {
    pub base_url: String,
    pub client: reqwest::Client,
    pub dir: tempfile::TempDir,
    pub registry: Arc<DefinitionRegistry>,
    pub mock: Arc<MockRpcExecutor>,
    pub audit: Arc<InMemoryExecutionLogStore>,
    server: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn definition_path(&self, file: &str) -> PathBuf {
        self.dir.path().join(file)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}

/// Starts a server with `documents` (file name, contents) in its definitions
/// directory. `make_mock` receives the loaded registry.
pub async fn spawn<F>(documents: &[(&str, &str)], make_mock: F) -> TestServer
where
    F: FnOnce(Arc<DefinitionRegistry>) -> MockRpcExecutor,
{
    let dir = tempfile::tempdir().expect("tempdir");
    for (file, body) in documents {
        fs::write(dir.path().join(file), body).expect("write definition");
    }

    let registry = Arc::new(DefinitionRegistry::open(dir.path()).expect("load registry"));
    let mock = Arc::new(make_mock(registry.clone()));
    let audit = Arc::new(InMemoryExecutionLogStore::new());

    let app_state = transport::http::AppState::new(
        registry.clone(),
        MappingEngine::default(),
        mock.clone(),
        audit.clone(),
        Duration::from_secs(5),
    );
    let router = transport::http::create_router(app_state);

    // Bind to an ephemeral port to avoid conflicts with a running server.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });

    TestServer {
        base_url: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        dir,
        registry,
        mock,
        audit,
        server,
    }
}

pub async fn spawn_default() -> TestServer {
    spawn(
        &[("ORDER.yml", ORDER_YML), ("STOCK_MOVEMENT.yml", STOCK_YML)],
        MockRpcExecutor::from_registry,
    )
    .await
}
