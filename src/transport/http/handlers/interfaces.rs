use crate::domain::definition::model::normalize_id;
use crate::transport::http::handlers::common::{fail, ok};
use crate::transport::http::types::AppState;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::json;
use std::time::Instant;

#[utoipa::path(
    get,
    path = "/api/proxy/interfaces",
    responses(
        (status = 200, description = "All loaded definitions, sorted by id", body = crate::app::ProxyResponse)
    )
)]
pub async fn list_interfaces_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    let definitions = state.gateway.registry().list();
    ok(
        &headers,
        json!({ "count": definitions.len(), "interfaces": definitions }),
        started,
    )
}

#[utoipa::path(
    get,
    path = "/api/proxy/interfaces/{id}",
    params(("id" = String, Path, description = "Interface id (case-insensitive)")),
    responses(
        (status = 200, description = "The definition", body = crate::app::ProxyResponse),
        (status = 404, description = "Unknown interface", body = crate::app::ProxyResponse)
    )
)]
pub async fn get_interface_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    match state.gateway.registry().get(&id) {
        Ok(definition) => ok(&headers, json!({ "interface": definition.as_ref() }), started),
        Err(e) => fail(&headers, e.into(), Some(&normalize_id(&id))),
    }
}

#[utoipa::path(
    post,
    path = "/api/proxy/reload",
    responses(
        (status = 200, description = "Definitions reloaded", body = crate::app::ProxyResponse),
        (status = 500, description = "Definition source unavailable; previous definitions kept", body = crate::app::ProxyResponse)
    )
)]
pub async fn reload_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let started = Instant::now();
    match state.admin.reload().await {
        Ok(snapshot) => ok(
            &headers,
            json!({
                "count": snapshot.len(),
                "fingerprint": snapshot.fingerprint(),
                "loadedAt": snapshot.loaded_at(),
                "skipped": snapshot.skipped(),
            }),
            started,
        ),
        Err(e) => fail(&headers, e, None),
    }
}
