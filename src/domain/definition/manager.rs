//! Administrative writes to the definitions directory.
//!
//! Every successful write or delete is followed by a full registry reload; the
//! registry never mutates a live snapshot in place.

use crate::domain::definition::model::{normalize_id, DefinitionDocument, InterfaceDefinition};
use crate::domain::definition::registry::{
    document_files, parse_document, DefinitionRegistry, RegistryError, RegistrySnapshot,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct DefinitionManager {
    registry: Arc<DefinitionRegistry>,
}

impl DefinitionManager {
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<DefinitionRegistry> {
        &self.registry
    }

    /// Whether a document for `id` exists on disk (independent of whether it parsed).
    pub fn exists(&self, id: &str) -> bool {
        let id = normalize_id(id);
        validate_id(&id).is_ok() && self.existing_document(&id).is_some()
    }

    /// Writes `{ID}.yml` with the upper-cased id and call target, then reloads.
    pub fn save(&self, definition: InterfaceDefinition) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        let mut definition = definition.normalized();
        definition.call_target = definition.call_target.trim().to_uppercase();
        validate_id(&definition.id)?;

        let dir = self.registry.source_dir().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| RegistryError::Write {
            path: dir.clone(),
            source,
        })?;

        let id = definition.id.clone();
        let body = serde_yaml::to_string(&DefinitionDocument {
            interface: Some(definition),
        })
        .map_err(|e| RegistryError::Encode(e.to_string()))?;

        // Stage beside the target and rename so a concurrent scan never reads a partial file.
        let target = dir.join(format!("{}.yml", id));
        let staging = dir.join(format!(".{}.yml.tmp", id));
        fs::write(&staging, body).map_err(|source| RegistryError::Write {
            path: staging.clone(),
            source,
        })?;

        // Any other document for this id would shadow or duplicate the new one.
        // Removed before the rename so a case-insensitive file system never loses the target.
        for stale in self.documents_for(&id).into_iter().filter(|p| *p != target) {
            if let Err(e) = fs::remove_file(&stale) {
                warn!("Failed to remove superseded document {:?}: {}", stale, e);
            }
        }

        fs::rename(&staging, &target).map_err(|source| RegistryError::Write {
            path: target.clone(),
            source,
        })?;

        info!("Interface definition saved: {:?}", target);
        self.registry.reload()
    }

    /// Removes the document for `id`, then reloads.
    pub fn delete(&self, id: &str) -> Result<Arc<RegistrySnapshot>, RegistryError> {
        let id = normalize_id(id);
        validate_id(&id)?;

        let documents = self.documents_for(&id);
        if documents.is_empty() {
            warn!("File not found for deletion: {}", id);
            return Err(RegistryError::NotFound(id));
        }
        for path in documents {
            fs::remove_file(&path).map_err(|source| RegistryError::Write {
                path: path.clone(),
                source,
            })?;
            info!("Interface definition deleted: {:?}", path);
        }
        self.registry.reload()
    }

    fn existing_document(&self, id: &str) -> Option<PathBuf> {
        self.documents_for(id).into_iter().next()
    }

    /// Every document that defines `id`: matched on the file stem ignoring case,
    /// or on the id declared inside the document.
    fn documents_for(&self, id: &str) -> Vec<PathBuf> {
        let mut files = match document_files(self.registry.source_dir()) {
            Ok(files) => files,
            Err(e) => {
                warn!("Cannot scan {:?}: {}", self.registry.source_dir(), e);
                return Vec::new();
            }
        };
        files.sort();
        files.retain(|path| stem_matches(path, id) || declares_id(path, id));
        files
    }
}

fn stem_matches(path: &Path, id: &str) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|s| normalize_id(s) == id)
        .unwrap_or(false)
}

fn declares_id(path: &Path, id: &str) -> bool {
    matches!(parse_document(path), Ok(Some(d)) if normalize_id(&d.id) == id)
}

/// Ids become file names, so only a conservative character set is accepted.
pub fn validate_id(id: &str) -> Result<(), RegistryError> {
    let mut chars = id.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(RegistryError::InvalidId(id.to_string()))
    }
}
