//! Administrative operations: definition maintenance, reloads and statistics.
//!
//! File system work runs on the blocking pool; statistics are read straight
//! from the execution log store.

use crate::app::error::GatewayError;
use crate::domain::definition::manager::DefinitionManager;
use crate::domain::definition::model::InterfaceDefinition;
use crate::domain::definition::registry::{DefinitionRegistry, RegistryError, RegistrySnapshot};
use crate::storage::audit::{ExecutionLog, ExecutionLogStore, InterfaceStats, ModuleStats};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{error, info};

pub struct AdminService {
    manager: Arc<DefinitionManager>,
    audit: Arc<dyn ExecutionLogStore>,
}

impl AdminService {
    pub fn new(manager: Arc<DefinitionManager>, audit: Arc<dyn ExecutionLogStore>) -> Self {
        Self { manager, audit }
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        self.manager.registry()
    }

    pub async fn reload(&self) -> Result<Arc<RegistrySnapshot>, GatewayError> {
        let registry = Arc::clone(self.manager.registry());
        let snapshot = blocking(move || registry.reload()).await?;
        info!(
            definitions = snapshot.len(),
            skipped = snapshot.skipped().len(),
            "Registry reloaded on request"
        );
        Ok(snapshot)
    }

    pub async fn save(&self, definition: InterfaceDefinition) -> Result<Arc<RegistrySnapshot>, GatewayError> {
        if definition.id.trim().is_empty() {
            return Err(GatewayError::BadRequest("Interface id is required".to_string()));
        }
        if definition.call_target.trim().is_empty() {
            return Err(GatewayError::BadRequest("callTarget is required".to_string()));
        }
        let manager = Arc::clone(&self.manager);
        blocking(move || manager.save(definition)).await
    }

    pub async fn delete(&self, id: String) -> Result<Arc<RegistrySnapshot>, GatewayError> {
        let manager = Arc::clone(&self.manager);
        blocking(move || manager.delete(&id)).await
    }

    pub async fn module_stats(&self, date: NaiveDate) -> Result<Vec<ModuleStats>, GatewayError> {
        self.audit.module_stats(date).await.map_err(stats_error)
    }

    pub async fn interface_stats(&self, date: NaiveDate, module: &str) -> Result<Vec<InterfaceStats>, GatewayError> {
        self.audit.interface_stats(date, module).await.map_err(stats_error)
    }

    pub async fn error_logs(&self, date: NaiveDate, interface_id: &str) -> Result<Vec<ExecutionLog>, GatewayError> {
        self.audit.error_logs(date, interface_id).await.map_err(stats_error)
    }
}

async fn blocking<T, F>(work: F) -> Result<T, GatewayError>
where
    F: FnOnce() -> Result<T, RegistryError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(result) => result.map_err(GatewayError::from),
        Err(e) => {
            error!("Definition task failed: {}", e);
            Err(GatewayError::Internal("definition task failed".to_string()))
        }
    }
}

fn stats_error(err: anyhow::Error) -> GatewayError {
    error!("Statistics query failed: {:#}", err);
    GatewayError::Internal(format!("statistics unavailable: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::audit::InMemoryExecutionLogStore;

    fn service() -> (tempfile::TempDir, AdminService) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(DefinitionRegistry::open(dir.path()).unwrap());
        let manager = Arc::new(DefinitionManager::new(registry));
        (dir, AdminService::new(manager, Arc::new(InMemoryExecutionLogStore::new())))
    }

    fn definition(id: &str, call_target: &str) -> InterfaceDefinition {
        serde_json::from_value(serde_json::json!({"id": id, "callTarget": call_target})).unwrap()
    }

    #[tokio::test]
    async fn save_then_delete_round_trips_through_registry() {
        let (_dir, admin) = service();
        let snapshot = admin.save(definition("stock", "z_stock")).await.unwrap();
        assert!(snapshot.contains("STOCK"));
        assert!(admin.registry().exists("stock"));

        let snapshot = admin.delete("Stock".to_string()).await.unwrap();
        assert!(!snapshot.contains("STOCK"));
        assert!(matches!(
            admin.delete("stock".to_string()).await,
            Err(GatewayError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn save_rejects_missing_fields() {
        let (_dir, admin) = service();
        assert!(matches!(admin.save(definition(" ", "Z")).await, Err(GatewayError::BadRequest(_))));
        assert!(matches!(admin.save(definition("A", "")).await, Err(GatewayError::BadRequest(_))));
        assert!(matches!(
            admin.save(definition("../etc", "Z")).await,
            Err(GatewayError::BadRequest(_))
        ));
    }
}
