//! Scalar field definitions for templates.

use super::types::FieldType;
use std::fmt;

/// A scalar field declared on a template.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Column type.
    pub field_type: FieldType,
    /// Whether values must be unique within the tenant's table.
    pub unique: bool,
    /// Whether this field should be indexed.
    pub indexed: bool,
}

impl FieldDef {
    /// Create a new field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            unique: false,
            indexed: false,
        }
    }

    /// Mark as unique.
    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark as indexed.
    pub fn with_index(mut self) -> Self {
        self.indexed = true;
        self
    }
}

impl fmt::Display for FieldDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.field_type)?;
        if self.unique {
            write!(f, " unique")?;
        }
        if self.indexed {
            write!(f, " indexed")?;
        }
        Ok(())
    }
}
