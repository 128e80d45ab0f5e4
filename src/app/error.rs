//! Gateway error taxonomy and its HTTP rendering.

use crate::app::envelope::ProxyResponse;
use crate::domain::context::new_request_id;
use crate::domain::definition::registry::RegistryError;
use crate::domain::mapping::{JsonMap, MappingError};
use crate::infra::rpc::RpcError;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use thiserror::Error;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Interface not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    MappingValidation(#[from] MappingError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Backend call failed: {0}")]
    Backend(#[from] RpcError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::MappingValidation(_) | GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Backend(_) => StatusCode::BAD_GATEWAY,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            GatewayError::NotFound(_) => "NOT_FOUND",
            GatewayError::MappingValidation(_) => "MAPPING_VALIDATION",
            GatewayError::BadRequest(_) => "BAD_REQUEST",
            GatewayError::Backend(_) => "BACKEND_ERROR",
            GatewayError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Client-input errors are reported verbatim and logged at `warn`.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Builds the error envelope. `data` carries `errorType`, the interface id when
    /// known, and the offending field for mapping failures.
    pub fn to_response(
        &self,
        request_id: &str,
        interface_id: Option<&str>,
        execution_time_ms: u64,
    ) -> Response {
        let mut data = JsonMap::new();
        data.insert("errorType".to_string(), Value::from(self.error_type()));
        if let Some(id) = interface_id {
            data.insert("interfaceId".to_string(), Value::from(id));
        }
        if let GatewayError::MappingValidation(e) = self {
            data.insert("field".to_string(), Value::from(e.field()));
        }

        let body = ProxyResponse::failure(self.to_string(), data, request_id.to_string(), execution_time_ms);
        with_request_id((self.status(), Json(body)).into_response(), request_id)
    }
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(id) => GatewayError::NotFound(id),
            RegistryError::InvalidId(_) => GatewayError::BadRequest(err.to_string()),
            other => GatewayError::Internal(other.to_string()),
        }
    }
}

/// Errors raised outside an execution (admin, lookup) get a fresh correlation id.
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.to_response(&new_request_id(), None, 0)
    }
}

pub fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
