//! Request lifecycle: resolve definition, map inbound, call backend, map outbound.
//!
//! Every execution runs as its own tokio task so a panic anywhere in the
//! pipeline surfaces as an `Internal` error instead of tearing down the
//! connection. The task is aborted if the caller's future is dropped, which
//! cancels a pending backend call when the client disconnects.

use crate::app::envelope::ProxyResponse;
use crate::app::error::GatewayError;
use crate::domain::context::RequestContext;
use crate::domain::definition::model::InterfaceDefinition;
use crate::domain::definition::registry::DefinitionRegistry;
use crate::domain::mapping::{JsonMap, MappingEngine};
use crate::infra::rpc::{RpcError, RpcExecutor, RpcResult};
use crate::storage::audit::{clip_error_message, ExecutionLog, ExecutionLogStore};
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, error, info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStage {
    Received,
    DefinitionResolved,
    InboundMapped,
    CallExecuted,
    OutboundMapped,
    Completed,
    Failed,
}

impl fmt::Display for ExecutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionStage::Received => "received",
            ExecutionStage::DefinitionResolved => "definition-resolved",
            ExecutionStage::InboundMapped => "inbound-mapped",
            ExecutionStage::CallExecuted => "call-executed",
            ExecutionStage::OutboundMapped => "outbound-mapped",
            ExecutionStage::Completed => "completed",
            ExecutionStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A failed execution: the error plus what is needed to render and correlate it.
#[derive(Debug)]
pub struct ProxyFailure {
    pub request_id: String,
    pub interface_id: String,
    /// Last stage the execution completed before it failed. `Failed` only when the
    /// execution task itself died (panic or abort) and its progress was lost.
    pub stage: ExecutionStage,
    pub execution_time_ms: u64,
    pub error: GatewayError,
}

impl IntoResponse for ProxyFailure {
    fn into_response(self) -> Response {
        self.error
            .to_response(&self.request_id, Some(&self.interface_id), self.execution_time_ms)
    }
}

struct Progress {
    stage: ExecutionStage,
    definition: Option<Arc<InterfaceDefinition>>,
}

impl Progress {
    fn advance(&mut self, next: ExecutionStage) {
        debug!("{} -> {}", self.stage, next);
        self.stage = next;
    }
}

/// Aborts the spawned execution when the awaiting future is dropped.
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct GatewayService {
    registry: Arc<DefinitionRegistry>,
    engine: MappingEngine,
    executor: Arc<dyn RpcExecutor>,
    audit: Arc<dyn ExecutionLogStore>,
    rpc_timeout: Duration,
}

impl GatewayService {
    pub fn new(
        registry: Arc<DefinitionRegistry>,
        engine: MappingEngine,
        executor: Arc<dyn RpcExecutor>,
        audit: Arc<dyn ExecutionLogStore>,
        rpc_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            engine,
            executor,
            audit,
            rpc_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> MappingEngine {
        self.engine
    }

    pub fn executor_name(&self) -> &'static str {
        self.executor.name()
    }

    pub fn audit_store_name(&self) -> &'static str {
        self.audit.name()
    }

    pub async fn execute(
        self: &Arc<Self>,
        ctx: RequestContext,
        data: JsonMap,
    ) -> Result<ProxyResponse, ProxyFailure> {
        let span = info_span!(
            "execute",
            request_id = %ctx.request_id,
            interface_id = %ctx.interface_id
        );

        async move {
            info!("Request received");

            let service = Arc::clone(self);
            let task_ctx = ctx.clone();
            let task_data = data.clone();
            let handle = tokio::spawn(
                async move {
                    let mut progress = Progress {
                        stage: ExecutionStage::Received,
                        definition: None,
                    };
                    let outcome = service.run(&task_ctx, &task_data, &mut progress).await;
                    (outcome, progress)
                }
                .in_current_span(),
            );
            let _guard = AbortOnDrop(handle.abort_handle());

            let (outcome, mut progress) = match handle.await {
                Ok(done) => done,
                Err(join_error) => {
                    error!("Execution task aborted: {}", join_error);
                    let progress = Progress {
                        stage: ExecutionStage::Failed,
                        definition: None,
                    };
                    (
                        Err(GatewayError::Internal("unexpected failure while executing request".to_string())),
                        progress,
                    )
                }
            };

            let elapsed = ctx.elapsed_ms();
            let definition = progress.definition.as_deref();
            match outcome {
                Ok(response_data) => {
                    info!(execution_time_ms = elapsed, "Request completed");
                    self.record(&ctx, definition, &data, Ok(&response_data), elapsed)
                        .await;
                    Ok(ProxyResponse::success(response_data, ctx.request_id.clone(), elapsed))
                }
                Err(err) => {
                    let reached = progress.stage;
                    if err.is_client_error() {
                        warn!(stage = %reached, "Request rejected: {}", err);
                    } else {
                        error!(stage = %reached, "Request failed: {}", err);
                    }
                    self.record(&ctx, definition, &data, Err(&err), elapsed).await;
                    progress.advance(ExecutionStage::Failed);
                    Err(ProxyFailure {
                        request_id: ctx.request_id.clone(),
                        interface_id: ctx.interface_id.clone(),
                        stage: reached,
                        execution_time_ms: elapsed,
                        error: err,
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        ctx: &RequestContext,
        data: &JsonMap,
        progress: &mut Progress,
    ) -> Result<JsonMap, GatewayError> {
        if ctx.interface_id.is_empty() {
            return Err(GatewayError::BadRequest("interfaceId is required".to_string()));
        }

        let definition = self.registry.get(&ctx.interface_id)?;
        progress.definition = Some(Arc::clone(&definition));
        progress.advance(ExecutionStage::DefinitionResolved);

        if !definition.executable {
            return Err(GatewayError::BadRequest(format!(
                "Interface {} is not executable",
                definition.id
            )));
        }

        let call = self.engine.map_inbound(ctx, &definition, data)?;
        progress.advance(ExecutionStage::InboundMapped);
        debug!(
            params = call.params.len(),
            tables = call.tables.len(),
            "Calling {}",
            definition.call_target
        );

        let result = self.call_backend(&definition.call_target, &call.params, &call.tables).await?;
        progress.advance(ExecutionStage::CallExecuted);

        let response = self.engine.map_outbound(&definition, &result.params, &result.tables);
        progress.advance(ExecutionStage::OutboundMapped);
        progress.advance(ExecutionStage::Completed);
        Ok(response)
    }

    async fn call_backend(
        &self,
        function: &str,
        params: &JsonMap,
        tables: &crate::domain::mapping::TableMap,
    ) -> Result<RpcResult, RpcError> {
        match tokio::time::timeout(self.rpc_timeout, self.executor.execute(function, params, tables)).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout {
                function: function.to_string(),
                timeout_ms: self.rpc_timeout.as_millis() as u64,
            }),
        }
    }

    /// Audit failures are logged and swallowed.
    async fn record(
        &self,
        ctx: &RequestContext,
        definition: Option<&InterfaceDefinition>,
        request: &JsonMap,
        outcome: Result<&JsonMap, &GatewayError>,
        elapsed_ms: u64,
    ) {
        let (success, response_data, error_message) = match outcome {
            Ok(data) => (true, serde_json::to_string(data).ok(), None),
            Err(err) => (false, None, Some(clip_error_message(&err.to_string()))),
        };
        let entry = ExecutionLog {
            id: None,
            request_id: ctx.request_id.clone(),
            interface_id: ctx.interface_id.clone(),
            module: definition.and_then(|d| d.module.clone()),
            call_target: definition.map(|d| d.call_target.clone()),
            user_id: ctx.user_id.clone(),
            ip_address: ctx.client_ip.clone(),
            request_data: serde_json::to_string(request).ok(),
            response_data,
            success,
            error_message,
            execution_time_ms: elapsed_ms as i64,
            created_at: ctx.received_at,
        };
        if let Err(e) = self.audit.record(entry).await {
            warn!("Failed to write execution log: {:#}", e);
        }
    }
}
