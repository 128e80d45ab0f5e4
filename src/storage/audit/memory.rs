//! Process-local execution log, used when no database is configured and in tests.
//!
//! Bounded: once `capacity` entries are held, each new entry evicts the oldest.

use crate::storage::audit::{
    day_bounds, ExecutionLog, ExecutionLogStore, InterfaceStats, ModuleStats, ALL_MODULES,
};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, VecDeque};
use tokio::sync::RwLock;

pub const DEFAULT_CAPACITY: usize = 10_000;

#[derive(Default)]
struct Ring {
    entries: VecDeque<ExecutionLog>,
    next_id: i64,
}

pub struct InMemoryExecutionLogStore {
    capacity: usize,
    ring: RwLock<Ring>,
}

impl Default for InMemoryExecutionLogStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InMemoryExecutionLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps at most `capacity` entries (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            ring: RwLock::new(Ring::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Every retained entry, oldest first.
    pub async fn all(&self) -> Vec<ExecutionLog> {
        self.ring.read().await.entries.iter().cloned().collect()
    }

    async fn on_day(&self, date: NaiveDate) -> Vec<ExecutionLog> {
        let (start, end) = day_bounds(date);
        self.ring
            .read()
            .await
            .entries
            .iter()
            .filter(|l| l.created_at >= start && l.created_at < end)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct Counts {
    total: i64,
    success: i64,
}

impl Counts {
    fn add(&mut self, success: bool) {
        self.total += 1;
        if success {
            self.success += 1;
        }
    }
}

#[async_trait]
impl ExecutionLogStore for InMemoryExecutionLogStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn record(&self, mut log: ExecutionLog) -> Result<()> {
        let mut ring = self.ring.write().await;
        ring.next_id += 1;
        log.id = Some(ring.next_id);
        while ring.entries.len() >= self.capacity {
            ring.entries.pop_front();
        }
        ring.entries.push_back(log);
        Ok(())
    }

    async fn module_stats(&self, date: NaiveDate) -> Result<Vec<ModuleStats>> {
        let mut by_module: BTreeMap<String, Counts> = BTreeMap::new();
        for log in self.on_day(date).await {
            by_module
                .entry(log.module_or_unknown().to_string())
                .or_default()
                .add(log.success);
        }
        Ok(by_module
            .into_iter()
            .map(|(module, c)| ModuleStats {
                module,
                total_count: c.total,
                success_count: c.success,
                fail_count: c.total - c.success,
            })
            .collect())
    }

    async fn interface_stats(&self, date: NaiveDate, module: &str) -> Result<Vec<InterfaceStats>> {
        let mut by_interface: BTreeMap<String, (Option<String>, Counts)> = BTreeMap::new();
        for log in self.on_day(date).await {
            if module != ALL_MODULES && log.module_or_unknown() != module {
                continue;
            }
            let entry = by_interface.entry(log.interface_id.clone()).or_default();
            // Highest call target wins, matching MAX() in the SQL store.
            if log.call_target > entry.0 {
                entry.0 = log.call_target.clone();
            }
            entry.1.add(log.success);
        }
        Ok(by_interface
            .into_iter()
            .map(|(interface_id, (call_target, c))| InterfaceStats {
                interface_id,
                call_target,
                total_count: c.total,
                success_count: c.success,
                fail_count: c.total - c.success,
            })
            .collect())
    }

    async fn error_logs(&self, date: NaiveDate, interface_id: &str) -> Result<Vec<ExecutionLog>> {
        Ok(self
            .on_day(date)
            .await
            .into_iter()
            .filter(|l| !l.success && l.interface_id == interface_id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn log(interface_id: &str, module: Option<&str>, success: bool, day: u32) -> ExecutionLog {
        ExecutionLog {
            id: None,
            request_id: format!("req-{}-{}", interface_id, day),
            interface_id: interface_id.to_string(),
            module: module.map(str::to_string),
            call_target: Some(format!("Z_{}", interface_id)),
            user_id: None,
            ip_address: None,
            request_data: Some("{}".to_string()),
            response_data: None,
            success,
            error_message: (!success).then(|| "boom".to_string()),
            execution_time_ms: 5,
            created_at: Utc.with_ymd_and_hms(2024, 5, day, 12, 0, 0).unwrap(),
        }
    }

    async fn seeded() -> InMemoryExecutionLogStore {
        let store = InMemoryExecutionLogStore::new();
        for entry in [
            log("ORDER", Some("SD"), true, 1),
            log("ORDER", Some("SD"), false, 1),
            log("STOCK", Some("MM"), true, 1),
            log("LEGACY", None, false, 1),
            log("ORDER", Some("SD"), false, 2),
        ] {
            store.record(entry).await.unwrap();
        }
        store
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[tokio::test]
    async fn module_stats_group_missing_module_as_unknown() {
        let store = seeded().await;
        let stats = store.module_stats(day(1)).await.unwrap();
        let modules: Vec<_> = stats.iter().map(|s| s.module.as_str()).collect();
        assert_eq!(modules, vec!["MM", "SD", "UNKNOWN"]);
        let sd = &stats[1];
        assert_eq!((sd.total_count, sd.success_count, sd.fail_count), (2, 1, 1));
    }

    #[tokio::test]
    async fn interface_stats_filter_by_module_or_all() {
        let store = seeded().await;
        let sd = store.interface_stats(day(1), "SD").await.unwrap();
        assert_eq!(sd.len(), 1);
        assert_eq!(sd[0].interface_id, "ORDER");
        assert_eq!(sd[0].call_target.as_deref(), Some("Z_ORDER"));

        let all = store.interface_stats(day(1), ALL_MODULES).await.unwrap();
        assert_eq!(all.len(), 3);
        let unknown = store.interface_stats(day(1), "UNKNOWN").await.unwrap();
        assert_eq!(unknown[0].interface_id, "LEGACY");
    }

    #[tokio::test]
    async fn oldest_entries_are_evicted_at_capacity() {
        let store = InMemoryExecutionLogStore::with_capacity(3);
        for d in 1..=5 {
            store.record(log("ORDER", Some("SD"), true, d)).await.unwrap();
        }

        let kept = store.all().await;
        assert_eq!(kept.len(), 3);
        let ids: Vec<_> = kept.iter().map(|l| l.id.unwrap()).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert!(store.module_stats(day(1)).await.unwrap().is_empty());
        assert_eq!(store.module_stats(day(5)).await.unwrap()[0].total_count, 1);

        assert_eq!(InMemoryExecutionLogStore::with_capacity(0).capacity(), 1);
    }

    #[tokio::test]
    async fn error_logs_are_per_interface_and_day() {
        let store = seeded().await;
        let errors = store.error_logs(day(1), "ORDER").await.unwrap();
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].success);
        assert!(errors[0].id.is_some());
        assert!(store.error_logs(day(3), "ORDER").await.unwrap().is_empty());
    }
}
