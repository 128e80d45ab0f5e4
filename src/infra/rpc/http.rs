//! JSON-over-HTTP executor for an ERP integration endpoint.
//!
//! Each call is `POST {base_url}/rfc/{function}` with body
//! `{"function", "importParams", "tables"}`; a 2xx answer must carry
//! `{"exportParams", "returnTables"}`. Anything else is an [`RpcError`].

use crate::domain::mapping::{JsonMap, TableMap};
use crate::infra::rpc::{RpcError, RpcExecutor, RpcResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

/// Upper bound on how much of an error body is kept in the error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CallBody<'a> {
    function: &'a str,
    import_params: &'a JsonMap,
    tables: &'a TableMap,
}

pub struct HttpRpcExecutor {
    base_url: String,
    client: Client,
}

impl HttpRpcExecutor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, function: &str) -> String {
        format!("{}/rfc/{}", self.base_url, function)
    }
}

#[async_trait]
impl RpcExecutor for HttpRpcExecutor {
    fn name(&self) -> &'static str {
        "http"
    }

    #[instrument(skip(self, params, tables), fields(function = %function))]
    async fn execute(
        &self,
        function: &str,
        params: &JsonMap,
        tables: &TableMap,
    ) -> Result<RpcResult, RpcError> {
        let url = self.endpoint(function);
        debug!(url = %url, params = params.len(), tables = tables.len(), "calling backend");

        let response = self
            .client
            .post(&url)
            .json(&CallBody {
                function,
                import_params: params,
                tables,
            })
            .send()
            .await
            .map_err(|e| RpcError::Transport {
                function: function.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| RpcError::Transport {
            function: function.to_string(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(RpcError::Status {
                function: function.to_string(),
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY),
            });
        }

        serde_json::from_str::<RpcResult>(&body).map_err(|e| RpcError::Decode {
            function: function.to_string(),
            message: e.to_string(),
        })
    }
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let executor = HttpRpcExecutor::new("http://erp.local:9000/");
        assert_eq!(executor.endpoint("Z_CREATE_ORDER"), "http://erp.local:9000/rfc/Z_CREATE_ORDER");
    }

    #[test]
    fn call_body_uses_wire_names() {
        let mut params = JsonMap::new();
        params.insert("PLANT".to_string(), json!("1000"));
        let tables = TableMap::new();
        let body = serde_json::to_value(CallBody {
            function: "Z_F",
            import_params: &params,
            tables: &tables,
        })
        .unwrap();
        assert_eq!(body, json!({"function": "Z_F", "importParams": {"PLANT": "1000"}, "tables": {}}));
    }

    #[test]
    fn result_accepts_missing_sections() {
        let result: RpcResult = serde_json::from_str(r#"{"exportParams":{"EV_NO":"1"}}"#).unwrap();
        assert_eq!(result.params.get("EV_NO"), Some(&json!("1")));
        assert!(result.tables.is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("äbc", 2), "äb...");
        assert_eq!(truncate("ab", 5), "ab");
    }
}
