// src/bin/api_server.rs

use anyhow::Context;
use erp_gateway::infra::config::GatewayConfig;
use erp_gateway::infra::telemetry;
use erp_gateway::transport;
use erp_gateway::{
    DefinitionRegistry, DefinitionWatcher, ExecutionLogStore, HttpRpcExecutor,
    InMemoryExecutionLogStore, MappingEngine, MockRpcExecutor, PostgresExecutionLogStore,
    RpcExecutor,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    telemetry::init_tracing();

    let config = GatewayConfig::from_env().context("invalid gateway configuration")?;

    // --- Definition Registry ---
    info!("Loading interface definitions from {:?}", config.definitions_dir);
    let registry = Arc::new(DefinitionRegistry::new(&config.definitions_dir));
    match registry.load() {
        Ok(snapshot) => {
            info!(
                definitions = snapshot.len(),
                skipped = snapshot.skipped().len(),
                fingerprint = snapshot.fingerprint(),
                "Registry loaded"
            );
            for definition in snapshot.ids().iter().filter_map(|id| snapshot.get(id)) {
                for issue in definition.lint() {
                    warn!("{}: {}: {}", definition.id, issue.rule, issue.message);
                }
            }
        }
        Err(e) => warn!("Starting with an empty registry: {}", e),
    }

    let _watcher = if config.watch_definitions {
        match DefinitionWatcher::spawn(registry.clone(), config.watch_debounce) {
            Ok(watcher) => Some(watcher),
            Err(e) => {
                warn!("Definition watcher disabled: {}", e);
                None
            }
        }
    } else {
        None
    };

    // --- Backend executor ---
    let executor: Arc<dyn RpcExecutor> = match &config.rpc_backend_url {
        Some(url) => {
            let executor = HttpRpcExecutor::new(url.clone());
            info!("Backend calls go to {}", executor.base_url());
            Arc::new(executor)
        }
        None => {
            warn!("RPC_BACKEND_URL not set; using the mock executor");
            Arc::new(MockRpcExecutor::from_registry(registry.clone()))
        }
    };

    // --- Execution log ---
    let audit: Arc<dyn ExecutionLogStore> = match &config.database_url {
        Some(url) => Arc::new(
            PostgresExecutionLogStore::connect(url)
                .await
                .context("failed to initialise the execution log database")?,
        ),
        None => {
            let store = InMemoryExecutionLogStore::with_capacity(config.audit_memory_capacity);
            warn!(
                "DATABASE_URL not set; keeping the last {} execution logs in memory",
                store.capacity()
            );
            Arc::new(store)
        }
    };

    let app_state = transport::http::AppState::new(
        registry,
        MappingEngine::new(config.size_policy),
        executor,
        audit,
        config.rpc_timeout,
    );

    // --- API Server ---
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    let app = transport::http::create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", transport::http::ApiDoc::openapi()))
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("API server listening on http://{}", config.bind_addr);
    info!("Swagger UI available at http://{}/swagger-ui", config.bind_addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received, draining connections");
        })
        .await?;

    info!("Graceful shutdown complete");
    Ok(())
}
