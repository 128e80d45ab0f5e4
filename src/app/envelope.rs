//! Request and response envelopes shared by every gateway endpoint.

use crate::domain::mapping::JsonMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// Interface id, case-insensitive.
    #[serde(default)]
    pub interface_id: String,
    /// Free-form request data; `null` or absent is treated as `{}`.
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schema(value_type = Object)]
    pub data: JsonMap,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[schema(value_type = Object)]
    pub data: JsonMap,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    pub execution_time_ms: u64,
}

impl ProxyResponse {
    pub fn success(data: JsonMap, request_id: String, execution_time_ms: u64) -> Self {
        Self {
            success: true,
            message: None,
            data,
            request_id,
            timestamp: Utc::now(),
            execution_time_ms,
        }
    }

    pub fn failure(message: String, data: JsonMap, request_id: String, execution_time_ms: u64) -> Self {
        Self {
            success: false,
            message: Some(message),
            data,
            request_id,
            timestamp: Utc::now(),
            execution_time_ms,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<JsonMap, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<JsonMap>::deserialize(deserializer)?.unwrap_or_default())
}
