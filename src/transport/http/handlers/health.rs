use crate::transport::http::handlers::common::ok;
use crate::transport::http::types::AppState;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::json;
use std::time::Instant;

#[utoipa::path(
    get,
    path = "/api/proxy/health",
    responses(
        (status = 200, description = "Gateway is up", body = crate::app::ProxyResponse)
    )
)]
pub async fn healthcheck_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let snapshot = state.gateway.registry().snapshot();
    ok(
        &headers,
        json!({
            "status": "UP",
            "interfaces": snapshot.len(),
            "fingerprint": snapshot.fingerprint(),
            "loadedAt": snapshot.loaded_at(),
            "skipped": snapshot.skipped().len(),
            "executor": state.gateway.executor_name(),
            "auditStore": state.gateway.audit_store_name(),
            "sizePolicy": state.gateway.engine().size_policy(),
        }),
        started,
    )
}
