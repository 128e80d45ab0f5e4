//! DefinitionRegistry: the in-memory, reloadable set of interface definitions.
//!
//! Readers take a cheap `Arc` clone of the current snapshot; a reload builds a
//! complete new snapshot off to the side and replaces the `Arc` in one write, so
//! no reader ever observes a half-built registry.

use crate::crypto::fingerprint::fingerprint;
use crate::domain::definition::model::{normalize_id, DefinitionDocument, InterfaceDefinition};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Extensions recognised as definition documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &["yml", "yaml", "json"];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Interface definition not found: {0}")]
    NotFound(String),

    #[error("Invalid interface id '{0}'")]
    InvalidId(String),

    #[error("Definition source {path:?} is unavailable: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write definition document {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode definition document: {0}")]
    Encode(String),
}

/// A document that was skipped during the last load.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SkippedDocument {
    pub file: String,
    pub reason: String,
}

/// Immutable view of every loaded definition.
#[derive(Debug)]
pub struct RegistrySnapshot {
    definitions: HashMap<String, Arc<InterfaceDefinition>>,
    fingerprint: String,
    loaded_at: DateTime<Utc>,
    skipped: Vec<SkippedDocument>,
}

impl RegistrySnapshot {
    fn build(definitions: HashMap<String, Arc<InterfaceDefinition>>, skipped: Vec<SkippedDocument>) -> Self {
        let mut ordered: Vec<&InterfaceDefinition> = definitions.values().map(|d| d.as_ref()).collect();
        ordered.sort_by(|a, b| a.id.cmp(&b.id));
        // Definitions are plain data; serialization can only fail on non-string map keys.
        let fingerprint = fingerprint(ordered).unwrap_or_default();
        Self {
            definitions,
            fingerprint,
            loaded_at: Utc::now(),
            skipped,
        }
    }

    fn empty() -> Self {
        Self::build(HashMap::new(), Vec::new())
    }

    pub fn get(&self, id: &str) -> Option<Arc<InterfaceDefinition>> {
        self.definitions.get(&normalize_id(id)).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(&normalize_id(id))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Ids in ascending order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.definitions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn skipped(&self) -> &[SkippedDocument] {
        &self.skipped
    }
}

/// Registry of interface definitions loaded from a directory of documents.
pub struct DefinitionRegistry {
    source_dir: PathBuf,
    current: RwLock<Arc<RegistrySnapshot>>,
    // Serializes loads so a slower, older scan never overwrites a newer one.
    load_lock: Mutex<()>,
}

impl DefinitionRegistry {
    /// Creates an empty registry over `source_dir`. Nothing is read until `load()`.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            current: RwLock::new(Arc::new(RegistrySnapshot::empty())),
            load_lock: Mutex::new(()),
        }
    }

    /// Creates a registry and performs the initial load.
    pub fn open(source_dir: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let registry = Self::new(source_dir);
        registry.load()?;
        Ok(registry)
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Scans the source directory, parses every document and swaps in the new snapshot.
    ///
    /// A document that fails to parse is logged and skipped. Only an unreadable
    /// directory fails the load, in which case the previous snapshot stays live.
    pub fn load(&self) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        let _loading = self.load_lock.lock().unwrap_or_else(|e| e.into_inner());
        info!("Loading interface definitions from {:?}", self.source_dir);

        let mut files = document_files(&self.source_dir).map_err(|source| {
            RegistryError::SourceUnavailable {
                path: self.source_dir.clone(),
                source,
            }
        })?;
        files.sort();

        let mut definitions: HashMap<String, Arc<InterfaceDefinition>> = HashMap::new();
        let mut skipped = Vec::new();

        for path in files {
            let file = display_name(&path);
            match parse_document(&path) {
                Ok(Some(definition)) => {
                    let definition = definition.normalized();
                    if definition.id.is_empty() {
                        warn!("Skipping {}: empty interface id", file);
                        skipped.push(SkippedDocument {
                            file,
                            reason: "empty interface id".to_string(),
                        });
                        continue;
                    }
                    debug!("Loaded interface {} from {}", definition.id, file);
                    let id = definition.id.clone();
                    if definitions.insert(id.clone(), Arc::new(definition)).is_some() {
                        warn!("Duplicate interface id {} (last document wins: {})", id, file);
                    }
                }
                Ok(None) => {
                    warn!("No 'interface' key found in {}", file);
                    skipped.push(SkippedDocument {
                        file,
                        reason: "missing top-level 'interface' key".to_string(),
                    });
                }
                Err(reason) => {
                    warn!("Failed to load definition from {}: {}", file, reason);
                    skipped.push(SkippedDocument { file, reason });
                }
            }
        }

        let snapshot = Arc::new(RegistrySnapshot::build(definitions, skipped));
        {
            let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
            *current = snapshot.clone();
        }

        info!(
            "Loaded {} interface definitions {:?} (skipped {}, fingerprint {})",
            snapshot.len(),
            snapshot.ids(),
            snapshot.skipped().len(),
            snapshot.fingerprint()
        );
        Ok(snapshot)
    }

    /// Re-runs `load()`; used for live updates without restarting the process.
    pub fn reload(&self) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        info!("Reloading interface definitions...");
        self.load()
    }

    /// Current snapshot. Holding it pins one consistent view across several lookups.
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn get(&self, id: &str) -> Result<Arc<InterfaceDefinition>, RegistryError> {
        self.snapshot()
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.snapshot().contains(id)
    }

    /// Owned copies of every definition, sorted by id.
    pub fn list(&self) -> Vec<InterfaceDefinition> {
        let snapshot = self.snapshot();
        snapshot
            .ids()
            .iter()
            .filter_map(|id| snapshot.get(id))
            .map(|d| d.as_ref().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

pub fn is_definition_document(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    !hidden && DOCUMENT_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext))
}

/// Definition documents directly inside `dir`, unordered.
pub(crate) fn document_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_definition_document(&path) {
            files.push(path);
        }
    }
    Ok(files)
}

/// Parses one document. `Ok(None)` means the document has no `interface` key.
pub fn parse_document(path: &Path) -> Result<Option<InterfaceDefinition>, String> {
    let raw = fs::read_to_string(path).map_err(|e| e.to_string())?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    let document: DefinitionDocument = if is_json {
        serde_json::from_str(&raw).map_err(|e| e.to_string())?
    } else {
        serde_yaml::from_str(&raw).map_err(|e| e.to_string())?
    };
    Ok(document.interface)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    fn doc(id: &str, target: &str) -> String {
        format!("interface:\n  id: {}\n  callTarget: {}\n", id, target)
    }

    #[test]
    fn lookups_are_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "order.yml", &doc("Order", "Z_ORDER"));
        let registry = DefinitionRegistry::open(dir.path()).unwrap();

        let upper = registry.get("ORDER").unwrap();
        let lower = registry.get("order").unwrap();
        let mixed = registry.get("oRdEr").unwrap();
        assert!(Arc::ptr_eq(&upper, &lower));
        assert!(Arc::ptr_eq(&upper, &mixed));
        assert!(registry.exists("order"));
        assert_eq!(upper.id, "ORDER");
    }

    #[test]
    fn unknown_id_is_not_found_with_requested_id() {
        let dir = tempfile::tempdir().unwrap();
        let registry = DefinitionRegistry::open(dir.path()).unwrap();
        match registry.get("missing") {
            Err(RegistryError::NotFound(id)) => assert_eq!(id, "missing"),
            other => panic!("unexpected: {:?}", other.map(|d| d.id.clone())),
        }
    }

    #[test]
    fn bad_documents_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "GOOD.yml", &doc("GOOD", "Z_GOOD"));
        write(dir.path(), "BROKEN.yml", "interface: [this is: not valid");
        write(dir.path(), "NOKEY.yaml", "something: else\n");
        write(dir.path(), "JSONDOC.json", r#"{"interface":{"id":"jsondoc","callTarget":"Z_J"}}"#);
        write(dir.path(), "notes.txt", "ignored");

        let registry = DefinitionRegistry::open(dir.path()).unwrap();
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.ids(), vec!["GOOD".to_string(), "JSONDOC".to_string()]);
        let skipped: Vec<&str> = snapshot.skipped().iter().map(|s| s.file.as_str()).collect();
        assert_eq!(skipped, vec!["BROKEN.yml", "NOKEY.yaml"]);
    }

    #[test]
    fn list_returns_defensive_copies() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.yml", &doc("A", "Z_A"));
        let registry = DefinitionRegistry::open(dir.path()).unwrap();

        let mut listed = registry.list();
        listed[0].call_target = "TAMPERED".to_string();
        listed.clear();

        assert_eq!(registry.get("A").unwrap().call_target, "Z_A");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unreadable_source_keeps_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.yml", &doc("A", "Z_A"));
        let registry = DefinitionRegistry::open(dir.path()).unwrap();
        let before = registry.snapshot().fingerprint().to_string();

        dir.close().unwrap();
        assert!(matches!(registry.reload(), Err(RegistryError::SourceUnavailable { .. })));
        assert!(registry.exists("A"));
        assert_eq!(registry.snapshot().fingerprint(), before);
    }

    #[test]
    fn reload_picks_up_changes_and_fingerprint_tracks_content() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "A.yml", &doc("A", "Z_A"));
        let registry = DefinitionRegistry::open(dir.path()).unwrap();
        let first = registry.snapshot().fingerprint().to_string();

        registry.reload().unwrap();
        assert_eq!(registry.snapshot().fingerprint(), first);

        write(dir.path(), "B.yml", &doc("B", "Z_B"));
        fs::remove_file(dir.path().join("A.yml")).unwrap();
        registry.reload().unwrap();
        assert!(!registry.exists("A"));
        assert!(registry.exists("b"));
        assert_ne!(registry.snapshot().fingerprint(), first);
    }

    #[test]
    fn concurrent_readers_never_see_a_mixed_snapshot() {
        let old_dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            write(old_dir.path(), &format!("OLD{}.yml", i), &doc(&format!("OLD{}", i), "Z_OLD"));
        }
        let registry = Arc::new(DefinitionRegistry::open(old_dir.path()).unwrap());

        // Swap the directory contents between two complete sets while readers run.
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for _ in 0..500 {
                        let snapshot = registry.snapshot();
                        let ids = snapshot.ids();
                        let olds = ids.iter().filter(|id| id.starts_with("OLD")).count();
                        let news = ids.iter().filter(|id| id.starts_with("NEW")).count();
                        assert!(
                            (olds == 20 && news == 0) || (olds == 0 && news == 20),
                            "mixed snapshot: {} old / {} new",
                            olds,
                            news
                        );
                    }
                })
            })
            .collect();

        for round in 0..10 {
            let (remove, add) = if round % 2 == 0 { ("OLD", "NEW") } else { ("NEW", "OLD") };
            for i in 0..20 {
                let _ = fs::remove_file(old_dir.path().join(format!("{}{}.yml", remove, i)));
                write(old_dir.path(), &format!("{}{}.yml", add, i), &doc(&format!("{}{}", add, i), "Z"));
            }
            registry.reload().unwrap();
        }

        for r in readers {
            r.join().unwrap();
        }
    }
}
