use crate::app::error::with_request_id;
use crate::app::ProxyRequest;
use crate::domain::context::RequestContext;
use crate::transport::http::handlers::common::{client_ip, fail, header_request_id};
use crate::transport::http::types::{json_400, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::net::SocketAddr;

#[utoipa::path(
    post,
    path = "/api/proxy/execute",
    request_body = ProxyRequest,
    params(
        ("x-request-id" = Option<String>, Header, description = "Correlation id; generated when absent")
    ),
    responses(
        (status = 200, description = "Interface executed", body = crate::app::ProxyResponse),
        (status = 400, description = "Mapping validation failed or malformed request", body = crate::app::ProxyResponse),
        (status = 404, description = "Unknown interface", body = crate::app::ProxyResponse),
        (status = 502, description = "Backend call failed", body = crate::app::ProxyResponse),
        (status = 500, description = "Internal error", body = crate::app::ProxyResponse)
    )
)]
pub async fn execute_handler(
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    payload: Result<Json<ProxyRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return fail(&headers, json_400(rejection), None),
    };

    // Body id first, then header.
    let request_id = request.request_id.clone().or_else(|| header_request_id(&headers));
    let ctx = RequestContext::new(request_id, &request.interface_id)
        .with_user(request.user_id.clone())
        .with_client_ip(client_ip(&headers, connect_info.as_ref()));

    match state.gateway.execute(ctx, request.data).await {
        Ok(response) => {
            let request_id = response.request_id.clone();
            with_request_id((StatusCode::OK, Json(response)).into_response(), &request_id)
        }
        Err(failure) => failure.into_response(),
    }
}
