//! Interface definitions and the registry that serves them.

pub mod manager;
pub mod model;
pub mod registry;
pub mod watcher;

pub use manager::DefinitionManager;
pub use model::{
    ExportRule, FieldRule, ImportRule, InterfaceDefinition, MappingRule, ReturnTableRule,
    RuleIssue, TableRule,
};
pub use registry::{DefinitionRegistry, RegistryError, RegistrySnapshot, SkippedDocument};
pub use watcher::DefinitionWatcher;
