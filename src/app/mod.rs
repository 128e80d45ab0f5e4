pub mod admin_service;
pub mod envelope;
pub mod error;
pub mod gateway_service;

pub use admin_service::AdminService;
pub use envelope::{ProxyRequest, ProxyResponse};
pub use error::GatewayError;
pub use gateway_service::{ExecutionStage, GatewayService, ProxyFailure};
