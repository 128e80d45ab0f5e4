//! Request-scoped context, passed explicitly through the execution chain.

use crate::domain::definition::model::normalize_id;
use chrono::{DateTime, Utc};
use std::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    /// Normalized (upper-cased) interface id.
    pub interface_id: String,
    pub user_id: Option<String>,
    pub client_ip: Option<String>,
    pub received_at: DateTime<Utc>,
    started: Instant,
}

impl RequestContext {
    /// Uses the supplied correlation id when it is non-blank, otherwise generates one.
    pub fn new(request_id: Option<String>, interface_id: &str) -> Self {
        let request_id = request_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .unwrap_or_else(new_request_id);
        Self {
            request_id,
            interface_id: normalize_id(interface_id),
            user_id: None,
            client_ip: None,
            received_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn with_user(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_client_ip(mut self, client_ip: Option<String>) -> Self {
        self.client_ip = client_ip;
        self
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}
