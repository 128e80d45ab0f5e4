//! Execution log store backed by PostgreSQL (`proxy_execution_log`).

use crate::storage::audit::{
    day_bounds, ExecutionLog, ExecutionLogStore, InterfaceStats, ModuleStats, UNKNOWN_MODULE,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use tracing::info;

const LOG_COLUMNS: &str = "id, request_id, interface_id, module, call_target, user_id, ip_address, \
     request_data, response_data, success, error_message, execution_time_ms, created_at";

#[derive(Clone)]
pub struct PostgresExecutionLogStore {
    pool: PgPool,
}

impl PostgresExecutionLogStore {
    /// Connects and makes sure the log table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS proxy_execution_log (
                id BIGSERIAL PRIMARY KEY,
                request_id VARCHAR(100) NOT NULL,
                interface_id VARCHAR(100) NOT NULL,
                module VARCHAR(50),
                call_target VARCHAR(100),
                user_id VARCHAR(50),
                ip_address VARCHAR(50),
                request_data TEXT,
                response_data TEXT,
                success BOOLEAN NOT NULL,
                error_message VARCHAR(1000),
                execution_time_ms BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_proxy_execution_log_created_at
             ON proxy_execution_log (created_at)",
        )
        .execute(&self.pool)
        .await?;
        info!("proxy_execution_log table ready");
        Ok(())
    }

    /// Cheap connectivity check.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn log_from_row(row: &PgRow) -> Result<ExecutionLog> {
    Ok(ExecutionLog {
        id: Some(row.try_get("id")?),
        request_id: row.try_get("request_id")?,
        interface_id: row.try_get("interface_id")?,
        module: row.try_get("module")?,
        call_target: row.try_get("call_target")?,
        user_id: row.try_get("user_id")?,
        ip_address: row.try_get("ip_address")?,
        request_data: row.try_get("request_data")?,
        response_data: row.try_get("response_data")?,
        success: row.try_get("success")?,
        error_message: row.try_get("error_message")?,
        execution_time_ms: row.try_get("execution_time_ms")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl ExecutionLogStore for PostgresExecutionLogStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn record(&self, log: ExecutionLog) -> Result<()> {
        let log = log.fit_columns();
        sqlx::query(
            "INSERT INTO proxy_execution_log
                (request_id, interface_id, module, call_target, user_id, ip_address,
                 request_data, response_data, success, error_message, execution_time_ms, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(&log.request_id)
        .bind(&log.interface_id)
        .bind(&log.module)
        .bind(&log.call_target)
        .bind(&log.user_id)
        .bind(&log.ip_address)
        .bind(&log.request_data)
        .bind(&log.response_data)
        .bind(log.success)
        .bind(&log.error_message)
        .bind(log.execution_time_ms)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn module_stats(&self, date: NaiveDate) -> Result<Vec<ModuleStats>> {
        let (start, end) = day_bounds(date);
        let rows = sqlx::query(
            "SELECT COALESCE(module, $3) AS module,
                    COUNT(*)::BIGINT AS total_count,
                    COUNT(*) FILTER (WHERE success)::BIGINT AS success_count,
                    COUNT(*) FILTER (WHERE NOT success)::BIGINT AS fail_count
             FROM proxy_execution_log
             WHERE created_at >= $1 AND created_at < $2
             GROUP BY 1
             ORDER BY 1",
        )
        .bind(start)
        .bind(end)
        .bind(UNKNOWN_MODULE)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(ModuleStats {
                    module: row.try_get("module")?,
                    total_count: row.try_get("total_count")?,
                    success_count: row.try_get("success_count")?,
                    fail_count: row.try_get("fail_count")?,
                })
            })
            .collect()
    }

    async fn interface_stats(&self, date: NaiveDate, module: &str) -> Result<Vec<InterfaceStats>> {
        let (start, end) = day_bounds(date);
        let rows = sqlx::query(
            "SELECT interface_id,
                    MAX(call_target) AS call_target,
                    COUNT(*)::BIGINT AS total_count,
                    COUNT(*) FILTER (WHERE success)::BIGINT AS success_count,
                    COUNT(*) FILTER (WHERE NOT success)::BIGINT AS fail_count
             FROM proxy_execution_log
             WHERE created_at >= $1 AND created_at < $2
               AND ($3 = 'ALL' OR COALESCE(module, $4) = $3)
             GROUP BY interface_id
             ORDER BY interface_id",
        )
        .bind(start)
        .bind(end)
        .bind(module)
        .bind(UNKNOWN_MODULE)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(InterfaceStats {
                    interface_id: row.try_get("interface_id")?,
                    call_target: row.try_get("call_target")?,
                    total_count: row.try_get("total_count")?,
                    success_count: row.try_get("success_count")?,
                    fail_count: row.try_get("fail_count")?,
                })
            })
            .collect()
    }

    async fn error_logs(&self, date: NaiveDate, interface_id: &str) -> Result<Vec<ExecutionLog>> {
        let (start, end) = day_bounds(date);
        let sql = format!(
            "SELECT {} FROM proxy_execution_log
             WHERE created_at >= $1 AND created_at < $2
               AND interface_id = $3 AND NOT success
             ORDER BY created_at, id",
            LOG_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(start)
            .bind(end)
            .bind(interface_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(log_from_row).collect()
    }
}
