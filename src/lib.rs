pub mod app;
pub mod crypto;
pub mod domain;
pub mod infra;
pub mod storage;
pub mod transport;

// Convenience re-exports (keeps call-sites clean)
pub use app::{AdminService, GatewayError, GatewayService, ProxyRequest, ProxyResponse};
pub use domain::context::RequestContext;
pub use domain::definition::{DefinitionManager, DefinitionRegistry, DefinitionWatcher, InterfaceDefinition};
pub use domain::mapping::{MappingEngine, MappingError, SizePolicy};
pub use infra::config::GatewayConfig;
pub use infra::rpc::{HttpRpcExecutor, MockRpcExecutor, RpcExecutor};
pub use storage::audit::{ExecutionLogStore, InMemoryExecutionLogStore, PostgresExecutionLogStore};
