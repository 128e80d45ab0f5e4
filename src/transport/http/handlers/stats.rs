use crate::domain::definition::model::normalize_id;
use crate::storage::audit::ALL_MODULES;
use crate::transport::http::handlers::common::{fail, ok};
use crate::transport::http::types::{
    date_or_today, query_400, AppState, DailyStatsQuery, ErrorLogQuery, ModuleStatsQuery,
};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use serde_json::json;
use std::time::Instant;

#[utoipa::path(
    get,
    path = "/api/admin/stats/daily",
    params(DailyStatsQuery),
    responses(
        (status = 200, description = "Execution counts per module for one day", body = crate::app::ProxyResponse),
        (status = 400, description = "Invalid query", body = crate::app::ProxyResponse)
    )
)]
pub async fn daily_stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<DailyStatsQuery>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return fail(&headers, query_400(rejection), None),
    };
    let date = date_or_today(query.date);
    match state.admin.module_stats(date).await {
        Ok(stats) => ok(&headers, json!({ "date": date, "stats": stats }), started),
        Err(e) => fail(&headers, e, None),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/stats/module",
    params(ModuleStatsQuery),
    responses(
        (status = 200, description = "Execution counts per interface of one module for one day", body = crate::app::ProxyResponse),
        (status = 400, description = "Invalid query", body = crate::app::ProxyResponse)
    )
)]
pub async fn module_stats_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ModuleStatsQuery>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return fail(&headers, query_400(rejection), None),
    };
    let date = date_or_today(query.date);
    let module = query
        .module
        .map(|m| m.trim().to_uppercase())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| ALL_MODULES.to_string());
    match state.admin.interface_stats(date, &module).await {
        Ok(stats) => ok(
            &headers,
            json!({ "date": date, "module": module, "stats": stats }),
            started,
        ),
        Err(e) => fail(&headers, e, None),
    }
}

#[utoipa::path(
    get,
    path = "/api/admin/stats/errors",
    params(ErrorLogQuery),
    responses(
        (status = 200, description = "Failed executions of one interface for one day", body = crate::app::ProxyResponse),
        (status = 400, description = "Invalid query", body = crate::app::ProxyResponse)
    )
)]
pub async fn error_logs_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ErrorLogQuery>, QueryRejection>,
) -> Response {
    let started = Instant::now();
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return fail(&headers, query_400(rejection), None),
    };
    let date = date_or_today(query.date);
    let interface_id = normalize_id(&query.interface_id);
    match state.admin.error_logs(date, &interface_id).await {
        Ok(logs) => ok(
            &headers,
            json!({ "date": date, "interfaceId": interface_id, "logs": logs }),
            started,
        ),
        Err(e) => fail(&headers, e, Some(&interface_id)),
    }
}
