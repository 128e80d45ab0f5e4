use crate::app::{ProxyRequest, ProxyResponse};
use crate::domain::definition::model::{
    ExportRule, FieldRule, InterfaceDefinition, ReturnTableRule, RuleIssue, TableRule,
};
use crate::domain::definition::registry::SkippedDocument;
use crate::storage::audit::{ExecutionLog, InterfaceStats, ModuleStats};
use crate::transport::http::handlers::{admin, execute, health, interfaces, stats};
use crate::transport::http::types::AppState;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        execute::execute_handler,
        health::healthcheck_handler,
        interfaces::list_interfaces_handler,
        interfaces::get_interface_handler,
        interfaces::reload_handler,
        admin::save_interface_handler,
        admin::delete_interface_handler,
        stats::daily_stats_handler,
        stats::module_stats_handler,
        stats::error_logs_handler
    ),
    components(schemas(
        ProxyRequest,
        ProxyResponse,
        InterfaceDefinition,
        FieldRule,
        TableRule,
        ExportRule,
        ReturnTableRule,
        RuleIssue,
        SkippedDocument,
        ExecutionLog,
        ModuleStats,
        InterfaceStats
    )),
    tags((name = "erp-gateway", description = "Schema-driven JSON to RPC gateway"))
)]
pub struct ApiDoc;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/proxy/execute", post(execute::execute_handler))
        .route("/api/proxy/health", get(health::healthcheck_handler))
        .route("/api/proxy/interfaces", get(interfaces::list_interfaces_handler))
        .route("/api/proxy/interfaces/:id", get(interfaces::get_interface_handler))
        .route("/api/proxy/reload", post(interfaces::reload_handler))
        .route("/api/admin/interfaces/save", post(admin::save_interface_handler))
        .route("/api/admin/interfaces/:id", delete(admin::delete_interface_handler))
        .route("/api/admin/stats/daily", get(stats::daily_stats_handler))
        .route("/api/admin/stats/module", get(stats::module_stats_handler))
        .route("/api/admin/stats/errors", get(stats::error_logs_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
