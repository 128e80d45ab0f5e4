use crate::app::error::{with_request_id, REQUEST_ID_HEADER};
use crate::app::{GatewayError, ProxyResponse};
use crate::domain::context::new_request_id;
use crate::domain::mapping::JsonMap;
use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use std::net::SocketAddr;
use std::time::Instant;

/// Correlation id supplied by the caller, if any.
pub fn header_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// First `X-Forwarded-For` hop, else the socket peer.
pub fn client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
}

/// 200 envelope for non-execute endpoints. `data` must be a JSON object.
pub fn ok(headers: &HeaderMap, data: Value, started: Instant) -> Response {
    let request_id = header_request_id(headers).unwrap_or_else(new_request_id);
    let data = match data {
        Value::Object(map) => map,
        other => {
            let mut map = JsonMap::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    let body = ProxyResponse::success(data, request_id.clone(), started.elapsed().as_millis() as u64);
    with_request_id((StatusCode::OK, Json(body)).into_response(), &request_id)
}

/// Error envelope for non-execute endpoints, correlated with the caller's id when given.
pub fn fail(headers: &HeaderMap, err: GatewayError, interface_id: Option<&str>) -> Response {
    let request_id = header_request_id(headers).unwrap_or_else(new_request_id);
    err.to_response(&request_id, interface_id, 0)
}
