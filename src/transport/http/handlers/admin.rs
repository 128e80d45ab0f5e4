use crate::domain::definition::model::{normalize_id, InterfaceDefinition};
use crate::transport::http::handlers::common::{fail, ok};
use crate::transport::http::types::{json_400, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Json;
use serde_json::json;
use std::time::Instant;

#[utoipa::path(
    post,
    path = "/api/admin/interfaces/save",
    request_body = InterfaceDefinition,
    responses(
        (status = 200, description = "Definition written and registry reloaded", body = crate::app::ProxyResponse),
        (status = 400, description = "Invalid definition", body = crate::app::ProxyResponse)
    )
)]
pub async fn save_interface_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<InterfaceDefinition>, JsonRejection>,
) -> Response {
    let started = Instant::now();
    let definition = match payload {
        Ok(Json(definition)) => definition,
        Err(rejection) => return fail(&headers, json_400(rejection), None),
    };

    let id = normalize_id(&definition.id);
    let issues = definition.lint();
    match state.admin.save(definition).await {
        Ok(snapshot) => ok(
            &headers,
            json!({
                "interfaceId": id,
                "count": snapshot.len(),
                "fingerprint": snapshot.fingerprint(),
                "warnings": issues,
            }),
            started,
        ),
        Err(e) => fail(&headers, e, Some(&id)),
    }
}

#[utoipa::path(
    delete,
    path = "/api/admin/interfaces/{id}",
    params(("id" = String, Path, description = "Interface id (case-insensitive)")),
    responses(
        (status = 200, description = "Definition removed and registry reloaded", body = crate::app::ProxyResponse),
        (status = 404, description = "No document for this id", body = crate::app::ProxyResponse)
    )
)]
pub async fn delete_interface_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    let started = Instant::now();
    let id = normalize_id(&id);
    match state.admin.delete(id.clone()).await {
        Ok(snapshot) => ok(
            &headers,
            json!({ "interfaceId": id, "count": snapshot.len(), "fingerprint": snapshot.fingerprint() }),
            started,
        ),
        Err(e) => fail(&headers, e, Some(&id)),
    }
}
