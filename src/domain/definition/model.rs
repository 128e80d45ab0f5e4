//! Interface definitions: the declarative contract between a web payload and a backend call.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Shared per-field rule used by import mappings and by the fields of table mappings.
///
/// Inbound, `web_field` is read from the request and written under `target_field`.
/// Outbound (return tables), `target_field` is read from the result row and written
/// under `web_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldRule {
    pub web_field: String,
    pub target_field: String,
    /// Informational backend type (e.g. `CHAR`, `NUMC`, `DATS`).
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default)]
    pub required: bool,
    /// Maximum serialized length. Must be > 0 when present; checked lazily at mapping time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Import rules have exactly the shape of a field rule.
pub type ImportRule = FieldRule;

/// Maps one inbound field (object, scalar or array) onto the rows of one backend table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TableRule {
    pub web_field: String,
    pub target_table: String,
    /// `true`: the source is one logical row. `false`: the source must be an array of rows.
    #[serde(default)]
    pub single_value: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

/// Maps one scalar of the call result onto a response field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExportRule {
    pub target_field: String,
    pub web_field: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
}

/// Maps one result table onto a response list stored under `web_field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnTableRule {
    pub target_table: String,
    pub web_field: String,
    #[serde(default)]
    pub fields: Vec<FieldRule>,
}

fn default_executable() -> bool {
    true
}

/// One named interface. Immutable once loaded into the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Business module, used to group execution statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Name of the remote function.
    pub call_target: String,
    #[serde(default = "default_executable")]
    pub executable: bool,
    #[serde(default)]
    pub import_mappings: Vec<ImportRule>,
    #[serde(default)]
    pub table_mappings: Vec<TableRule>,
    #[serde(default)]
    pub export_mappings: Vec<ExportRule>,
    #[serde(default)]
    pub return_table_mappings: Vec<ReturnTableRule>,
}

/// On-disk document wrapper: a single top-level `interface` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefinitionDocument {
    #[serde(default)]
    pub interface: Option<InterfaceDefinition>,
}

/// Borrowed view over every rule variant of a definition.
#[derive(Debug, Clone, Copy)]
pub enum MappingRule<'a> {
    Import(&'a ImportRule),
    Table(&'a TableRule),
    Export(&'a ExportRule),
    ReturnTable(&'a ReturnTableRule),
}

impl<'a> MappingRule<'a> {
    /// Human-readable location of the rule, e.g. `tableMappings[items]`.
    pub fn label(&self) -> String {
        match self {
            MappingRule::Import(r) => format!("importMappings[{}]", r.web_field),
            MappingRule::Table(r) => format!("tableMappings[{}]", r.web_field),
            MappingRule::Export(r) => format!("exportMappings[{}]", r.target_field),
            MappingRule::ReturnTable(r) => format!("returnTableMappings[{}]", r.target_table),
        }
    }

    /// Field rules owned by this rule (a scalar rule is its own single field rule).
    pub fn field_rules(&self) -> Vec<&'a FieldRule> {
        match *self {
            MappingRule::Import(r) => vec![r],
            MappingRule::Table(r) => r.fields.iter().collect(),
            MappingRule::Export(_) => Vec::new(),
            MappingRule::ReturnTable(r) => r.fields.iter().collect(),
        }
    }

    fn sizes(&self) -> Vec<(&'a str, Option<i64>)> {
        match *self {
            MappingRule::Export(r) => vec![(r.web_field.as_str(), r.size)],
            _ => self
                .field_rules()
                .into_iter()
                .map(|f| (f.web_field.as_str(), f.size))
                .collect(),
        }
    }
}

/// A configuration problem that would surface at mapping time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RuleIssue {
    pub rule: String,
    pub message: String,
}

impl InterfaceDefinition {
    /// Upper-cases the id and module; the registry key and file name derive from
    /// the id, statistics group on the module. A blank module becomes `None`.
    pub fn normalized(mut self) -> Self {
        self.id = normalize_id(&self.id);
        self.module = self
            .module
            .as_deref()
            .map(normalize_id)
            .filter(|m| !m.is_empty());
        self
    }

    /// Every rule in declaration order: imports, tables, exports, return tables.
    pub fn rules(&self) -> impl Iterator<Item = MappingRule<'_>> {
        self.import_mappings
            .iter()
            .map(MappingRule::Import)
            .chain(self.table_mappings.iter().map(MappingRule::Table))
            .chain(self.export_mappings.iter().map(MappingRule::Export))
            .chain(self.return_table_mappings.iter().map(MappingRule::ReturnTable))
    }

    /// Lists configuration problems without failing. Loading stays lenient; the
    /// mapping engine rejects these when a request actually reaches them.
    pub fn lint(&self) -> Vec<RuleIssue> {
        let mut issues = Vec::new();
        for rule in self.rules() {
            for (field, size) in rule.sizes() {
                if let Some(size) = size.filter(|s| *s <= 0) {
                    issues.push(RuleIssue {
                        rule: rule.label(),
                        message: format!("field '{}' has non-positive size {}", field, size),
                    });
                }
            }
            let has_no_fields = match rule {
                MappingRule::Table(t) => t.fields.is_empty(),
                MappingRule::ReturnTable(t) => t.fields.is_empty(),
                _ => false,
            };
            if has_no_fields {
                issues.push(RuleIssue {
                    rule: rule.label(),
                    message: "no field rules configured".to_string(),
                });
            }
        }
        if self.call_target.trim().is_empty() {
            issues.push(RuleIssue {
                rule: "callTarget".to_string(),
                message: "call target is empty".to_string(),
            });
        }
        issues
    }
}

pub fn normalize_id(id: &str) -> String {
    id.trim().to_uppercase()
}
