//! In-process executor for development and tests.
//!
//! Resolution order for a call: a scripted reply registered for the function,
//! then synthetic `MOCK_<FIELD>` values derived from the definition whose
//! `callTarget` matches, then an echo of the inputs.

use crate::domain::definition::model::InterfaceDefinition;
use crate::domain::definition::registry::DefinitionRegistry;
use crate::domain::mapping::{JsonMap, TableMap};
use crate::infra::rpc::{RpcError, RpcExecutor, RpcResult};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
enum Reply {
    Result(RpcResult),
    Failure(String),
}

/// One call as the executor received it.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub function: String,
    pub params: JsonMap,
    pub tables: TableMap,
}

#[derive(Default)]
pub struct MockRpcExecutor {
    registry: Option<Arc<DefinitionRegistry>>,
    replies: Mutex<HashMap<String, Reply>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockRpcExecutor {
    /// Echoes inputs back: params become export params, tables become return tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Synthesizes `MOCK_` values for the export and return-table rules of the
    /// definition targeting the called function.
    pub fn from_registry(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            registry: Some(registry),
            ..Self::default()
        }
    }

    /// Sleeps before answering; used to exercise call timeouts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn respond_with(&self, function: &str, result: RpcResult) {
        self.lock_replies().insert(function.to_uppercase(), Reply::Result(result));
    }

    pub fn fail_with(&self, function: &str, message: impl Into<String>) {
        self.lock_replies()
            .insert(function.to_uppercase(), Reply::Failure(message.into()));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, HashMap<String, Reply>> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn definition_for(&self, function: &str) -> Option<InterfaceDefinition> {
        let registry = self.registry.as_ref()?;
        registry
            .list()
            .into_iter()
            .find(|d| d.call_target.eq_ignore_ascii_case(function))
    }
}

/// `MOCK_<FIELD>` for every export field and one synthetic row per return table.
pub fn synthesize(definition: &InterfaceDefinition) -> RpcResult {
    let mut result = RpcResult::default();
    for rule in &definition.export_mappings {
        result
            .params
            .insert(rule.target_field.clone(), mock_value(&rule.target_field));
    }
    for rule in &definition.return_table_mappings {
        let row: JsonMap = rule
            .fields
            .iter()
            .map(|f| (f.target_field.clone(), mock_value(&f.target_field)))
            .collect();
        result.tables.insert(rule.target_table.clone(), vec![row]);
    }
    result
}

fn mock_value(field: &str) -> Value {
    Value::String(format!("MOCK_{}", field))
}

#[async_trait]
impl RpcExecutor for MockRpcExecutor {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn execute(
        &self,
        function: &str,
        params: &JsonMap,
        tables: &TableMap,
    ) -> Result<RpcResult, RpcError> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedCall {
                function: function.to_string(),
                params: params.clone(),
                tables: tables.clone(),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let scripted = self.lock_replies().get(&function.to_uppercase()).cloned();
        match scripted {
            Some(Reply::Result(result)) => return Ok(result),
            Some(Reply::Failure(message)) => {
                return Err(RpcError::Rejected {
                    function: function.to_string(),
                    message,
                })
            }
            None => {}
        }

        if let Some(definition) = self.definition_for(function) {
            debug!("Mock result synthesized from definition {}", definition.id);
            return Ok(synthesize(&definition));
        }

        Ok(RpcResult {
            params: params.clone(),
            tables: tables.clone(),
        })
    }
}
