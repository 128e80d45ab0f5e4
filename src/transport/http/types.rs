use crate::app::{AdminService, GatewayError, GatewayService};
use crate::domain::definition::{DefinitionManager, DefinitionRegistry};
use crate::domain::mapping::MappingEngine;
use crate::infra::rpc::RpcExecutor;
use crate::storage::audit::ExecutionLogStore;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use utoipa::IntoParams;

#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<GatewayService>,
    pub admin: Arc<AdminService>,
}

impl AppState {
    /// Wires both services over one registry and one execution log store.
    pub fn new(
        registry: Arc<DefinitionRegistry>,
        engine: MappingEngine,
        executor: Arc<dyn RpcExecutor>,
        audit: Arc<dyn ExecutionLogStore>,
        rpc_timeout: Duration,
    ) -> Self {
        let manager = Arc::new(DefinitionManager::new(Arc::clone(&registry)));
        Self {
            gateway: Arc::new(GatewayService::new(
                registry,
                engine,
                executor,
                Arc::clone(&audit),
                rpc_timeout,
            )),
            admin: Arc::new(AdminService::new(manager, audit)),
        }
    }
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DailyStatsQuery {
    /// UTC day, `YYYY-MM-DD`. Defaults to today.
    #[param(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ModuleStatsQuery {
    #[param(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    /// Module to report on; `ALL` (default) for every module.
    pub module: Option<String>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ErrorLogQuery {
    #[param(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    #[serde(rename = "interfaceId")]
    pub interface_id: String,
}

pub fn date_or_today(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Utc::now().date_naive())
}

pub fn json_400(err: JsonRejection) -> GatewayError {
    GatewayError::BadRequest(format!("Invalid JSON body: {}", err.body_text()))
}

pub fn query_400(err: QueryRejection) -> GatewayError {
    GatewayError::BadRequest(format!("Invalid query: {}", err.body_text()))
}
