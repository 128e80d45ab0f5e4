//! Centralized configuration (environment variables + defaults).

use crate::domain::mapping::SizePolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_DEFINITIONS_DIR: &str = "interfaces";
pub const DEFAULT_RPC_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_WATCH_DEBOUNCE_MS: u64 = 250;
pub const DEFAULT_AUDIT_MEMORY_CAPACITY: usize = crate::storage::audit::memory::DEFAULT_CAPACITY;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub definitions_dir: PathBuf,
    pub watch_definitions: bool,
    pub watch_debounce: Duration,
    /// Base URL of the ERP integration endpoint. `None` selects the mock executor.
    pub rpc_backend_url: Option<String>,
    pub rpc_timeout: Duration,
    pub size_policy: SizePolicy,
    /// `None` keeps the execution log in memory.
    pub database_url: Option<String>,
    /// Most recent entries kept by the in-memory execution log.
    pub audit_memory_capacity: usize,
}

impl GatewayConfig {
    /// Reads the process environment. Call `dotenv::dotenv()` first to honour a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = var("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| invalid("BIND_ADDR", e))?;

        let definitions_dir =
            PathBuf::from(var("DEFINITIONS_DIR").unwrap_or_else(|| DEFAULT_DEFINITIONS_DIR.to_string()));

        let watch_definitions = match var("WATCH_DEFINITIONS") {
            Some(v) => parse_bool(&v).ok_or_else(|| invalid("WATCH_DEFINITIONS", format!("'{}' is not a boolean", v)))?,
            None => false,
        };

        let watch_debounce = Duration::from_millis(parse_u64(var("WATCH_DEBOUNCE_MS"), "WATCH_DEBOUNCE_MS", DEFAULT_WATCH_DEBOUNCE_MS)?);

        let rpc_backend_url = var("RPC_BACKEND_URL").map(|url| url.trim_end_matches('/').to_string());
        if let Some(url) = &rpc_backend_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid("RPC_BACKEND_URL", "must start with http:// or https://"));
            }
        }

        let timeout_ms = parse_u64(var("RPC_TIMEOUT_MS"), "RPC_TIMEOUT_MS", DEFAULT_RPC_TIMEOUT_MS)?;
        if timeout_ms == 0 {
            return Err(invalid("RPC_TIMEOUT_MS", "must be greater than 0"));
        }

        let size_policy = match var("SIZE_POLICY") {
            Some(v) => v.parse::<SizePolicy>().map_err(|e| invalid("SIZE_POLICY", e))?,
            None => SizePolicy::default(),
        };

        let audit_memory_capacity = parse_u64(
            var("AUDIT_MEMORY_CAPACITY"),
            "AUDIT_MEMORY_CAPACITY",
            DEFAULT_AUDIT_MEMORY_CAPACITY as u64,
        )?;
        if audit_memory_capacity == 0 {
            return Err(invalid("AUDIT_MEMORY_CAPACITY", "must be greater than 0"));
        }

        Ok(Self {
            bind_addr,
            definitions_dir,
            watch_definitions,
            watch_debounce,
            rpc_backend_url,
            rpc_timeout: Duration::from_millis(timeout_ms),
            size_policy,
            database_url: var("DATABASE_URL"),
            audit_memory_capacity: usize::try_from(audit_memory_capacity)
                .map_err(|e| invalid("AUDIT_MEMORY_CAPACITY", e))?,
        })
    }
}

fn invalid(name: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

fn parse_u64(value: Option<String>, name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match value {
        Some(v) => v.parse::<u64>().map_err(|e| invalid(name, e)),
        None => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<GatewayConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        GatewayConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(cfg.definitions_dir, PathBuf::from("interfaces"));
        assert!(!cfg.watch_definitions);
        assert!(cfg.rpc_backend_url.is_none());
        assert_eq!(cfg.rpc_timeout, Duration::from_secs(30));
        assert_eq!(cfg.size_policy, SizePolicy::Chars);
        assert!(cfg.database_url.is_none());
        assert_eq!(cfg.audit_memory_capacity, DEFAULT_AUDIT_MEMORY_CAPACITY);
    }

    #[test]
    fn explicit_values_are_parsed() {
        let cfg = config(&[
            ("BIND_ADDR", "127.0.0.1:8080"),
            ("DEFINITIONS_DIR", "/etc/gateway/interfaces"),
            ("WATCH_DEFINITIONS", "yes"),
            ("RPC_BACKEND_URL", "http://erp.local:9000/"),
            ("RPC_TIMEOUT_MS", "1500"),
            ("SIZE_POLICY", "utf8_bytes"),
            ("DATABASE_URL", "postgres://localhost/gateway"),
            ("AUDIT_MEMORY_CAPACITY", "500"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert!(cfg.watch_definitions);
        assert_eq!(cfg.rpc_backend_url.as_deref(), Some("http://erp.local:9000"));
        assert_eq!(cfg.rpc_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.size_policy, SizePolicy::Utf8Bytes);
        assert!(cfg.database_url.is_some());
        assert_eq!(cfg.audit_memory_capacity, 500);
    }

    #[test]
    fn invalid_values_name_the_variable() {
        for (name, value) in [
            ("BIND_ADDR", "nowhere"),
            ("WATCH_DEFINITIONS", "maybe"),
            ("RPC_TIMEOUT_MS", "0"),
            ("RPC_TIMEOUT_MS", "soon"),
            ("SIZE_POLICY", "words"),
            ("RPC_BACKEND_URL", "erp.local"),
            ("AUDIT_MEMORY_CAPACITY", "0"),
        ] {
            let err = config(&[(name, value)]).unwrap_err();
            assert!(err.to_string().starts_with(name), "{}", err);
        }
    }
}
