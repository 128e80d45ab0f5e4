//! Backend call boundary.
//!
//! The gateway never talks to the ERP system directly; it hands the mapped
//! parameters and tables to an [`RpcExecutor`] and maps whatever comes back.

pub mod http;
pub mod mock;

use crate::domain::mapping::{JsonMap, TableMap};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpRpcExecutor;
pub use mock::MockRpcExecutor;

/// Flat result parameters plus result tables of one backend call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcResult {
    #[serde(default, rename = "exportParams")]
    pub params: JsonMap,
    #[serde(default, rename = "returnTables")]
    pub tables: TableMap,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    #[error("transport error calling {function}: {message}")]
    Transport { function: String, message: String },

    #[error("backend returned HTTP {status} for {function}: {body}")]
    Status {
        function: String,
        status: u16,
        body: String,
    },

    #[error("malformed backend response for {function}: {message}")]
    Decode { function: String, message: String },

    #[error("backend rejected {function}: {message}")]
    Rejected { function: String, message: String },

    #[error("backend call {function} timed out after {timeout_ms} ms")]
    Timeout { function: String, timeout_ms: u64 },
}

#[async_trait]
pub trait RpcExecutor: Send + Sync {
    /// Short label for logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Runs `function` with scalar `params` and `tables`. Implementations must be
    /// cancel-safe: the caller may drop the future at any await point.
    async fn execute(
        &self,
        function: &str,
        params: &JsonMap,
        tables: &TableMap,
    ) -> Result<RpcResult, RpcError>;
}
