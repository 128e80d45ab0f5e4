//! Execution log persistence and the daily statistics built on it.

pub mod memory;
pub mod postgres;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use utoipa::ToSchema;

pub use memory::InMemoryExecutionLogStore;
pub use postgres::PostgresExecutionLogStore;

/// Module label used when a definition declares none.
pub const UNKNOWN_MODULE: &str = "UNKNOWN";
/// Module filter that matches every module.
pub const ALL_MODULES: &str = "ALL";
pub const MAX_ERROR_MESSAGE_CHARS: usize = 1000;

/// Character widths of the bounded `proxy_execution_log` columns.
pub const MAX_REQUEST_ID_CHARS: usize = 100;
pub const MAX_INTERFACE_ID_CHARS: usize = 100;
pub const MAX_MODULE_CHARS: usize = 50;
pub const MAX_CALL_TARGET_CHARS: usize = 100;
pub const MAX_USER_ID_CHARS: usize = 50;
pub const MAX_IP_ADDRESS_CHARS: usize = 50;

/// One executed (or rejected) gateway request.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    /// Assigned by the store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub request_id: String,
    pub interface_id: String,
    pub module: Option<String>,
    pub call_target: Option<String>,
    pub user_id: Option<String>,
    pub ip_address: Option<String>,
    /// Request data as compact JSON.
    pub request_data: Option<String>,
    /// Response data as compact JSON; absent on failure.
    pub response_data: Option<String>,
    pub success: bool,
    pub error_message: Option<String>,
    pub execution_time_ms: i64,
    pub created_at: DateTime<Utc>,
}

impl ExecutionLog {
    pub fn module_or_unknown(&self) -> &str {
        self.module.as_deref().unwrap_or(UNKNOWN_MODULE)
    }

    /// Cuts every bounded field to its column width. Request ids, user ids, client
    /// addresses and unknown interface ids come straight from the caller.
    pub fn fit_columns(mut self) -> Self {
        self.request_id = clip_chars(&self.request_id, MAX_REQUEST_ID_CHARS);
        self.interface_id = clip_chars(&self.interface_id, MAX_INTERFACE_ID_CHARS);
        clip_optional(&mut self.module, MAX_MODULE_CHARS);
        clip_optional(&mut self.call_target, MAX_CALL_TARGET_CHARS);
        clip_optional(&mut self.user_id, MAX_USER_ID_CHARS);
        clip_optional(&mut self.ip_address, MAX_IP_ADDRESS_CHARS);
        clip_optional(&mut self.error_message, MAX_ERROR_MESSAGE_CHARS);
        self
    }
}

fn clip_optional(value: &mut Option<String>, max_chars: usize) {
    if let Some(v) = value.as_mut() {
        *v = clip_chars(v, max_chars);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleStats {
    pub module: String,
    pub total_count: i64,
    pub success_count: i64,
    pub fail_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStats {
    pub interface_id: String,
    pub call_target: Option<String>,
    pub total_count: i64,
    pub success_count: i64,
    pub fail_count: i64,
}

#[async_trait]
pub trait ExecutionLogStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn record(&self, log: ExecutionLog) -> Result<()>;

    /// Per-module counts for one UTC day, ordered by module.
    async fn module_stats(&self, date: NaiveDate) -> Result<Vec<ModuleStats>>;

    /// Per-interface counts for one UTC day restricted to `module` (`ALL` for every
    /// module), ordered by interface id.
    async fn interface_stats(&self, date: NaiveDate, module: &str) -> Result<Vec<InterfaceStats>>;

    /// Failed executions of one interface on one UTC day, oldest first.
    async fn error_logs(&self, date: NaiveDate, interface_id: &str) -> Result<Vec<ExecutionLog>>;
}

/// Half-open `[start, end)` bounds of a UTC day.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
    let end = match date.succ_opt() {
        Some(next) => Utc.from_utc_datetime(&next.and_time(NaiveTime::MIN)),
        None => Utc.from_utc_datetime(&NaiveDate::MAX.and_time(NaiveTime::MIN)),
    };
    (start, end)
}

/// First `max_chars` characters of `value`.
pub fn clip_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// Cuts an error message to the column width.
pub fn clip_error_message(message: &str) -> String {
    clip_chars(message, MAX_ERROR_MESSAGE_CHARS)
}
