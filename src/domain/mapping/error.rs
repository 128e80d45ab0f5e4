use thiserror::Error;

/// Validation failures raised while translating data. Every variant carries the
/// interface id and the field path (including table name and row index).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { interface_id: String, field: String },

    #[error("Required table missing: {field} (target table {table})")]
    RequiredTableMissing {
        interface_id: String,
        field: String,
        table: String,
    },

    #[error("Field '{field}' exceeds maximum size: max {max}, actual {actual}")]
    SizeExceeded {
        interface_id: String,
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("Field must be {expected}: {field}")]
    TableShape {
        interface_id: String,
        field: String,
        expected: &'static str,
    },

    #[error("No fields configured for table mapping: {field} (target table {table})")]
    ConfigurationIncomplete {
        interface_id: String,
        field: String,
        table: String,
    },

    #[error("Invalid size {size} configured for field '{field}' (must be > 0)")]
    InvalidSize {
        interface_id: String,
        field: String,
        size: i64,
    },
}

impl MappingError {
    pub fn interface_id(&self) -> &str {
        match self {
            MappingError::RequiredFieldMissing { interface_id, .. }
            | MappingError::RequiredTableMissing { interface_id, .. }
            | MappingError::SizeExceeded { interface_id, .. }
            | MappingError::TableShape { interface_id, .. }
            | MappingError::ConfigurationIncomplete { interface_id, .. }
            | MappingError::InvalidSize { interface_id, .. } => interface_id,
        }
    }

    /// Field path the failure refers to, e.g. `items[2].sku`.
    pub fn field(&self) -> &str {
        match self {
            MappingError::RequiredFieldMissing { field, .. }
            | MappingError::RequiredTableMissing { field, .. }
            | MappingError::SizeExceeded { field, .. }
            | MappingError::TableShape { field, .. }
            | MappingError::ConfigurationIncomplete { field, .. }
            | MappingError::InvalidSize { field, .. } => field,
        }
    }

    /// True for definition problems rather than bad request data.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            MappingError::ConfigurationIncomplete { .. } | MappingError::InvalidSize { .. }
        )
    }
}
