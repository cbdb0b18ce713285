//! Column type definitions for template fields.

use std::fmt;

/// Scalar column types.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// Fixed-precision decimal.
    Decimal {
        /// Total number of digits.
        precision: u8,
        /// Number of digits after decimal point.
        scale: u8,
    },
    /// Bounded UTF-8 string.
    Varchar(u32),
    /// Unbounded UTF-8 string.
    Text,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
}

/// Column type of a template field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// A scalar value.
    Scalar(ScalarType),
    /// A nullable scalar value.
    OptionalScalar(ScalarType),
    /// An enumeration stored as text.
    Enum {
        /// Name of the enum type.
        name: String,
        /// Allowed variant values.
        variants: Vec<String>,
    },
}

impl FieldType {
    /// Create a scalar field type.
    pub fn scalar(scalar: ScalarType) -> Self {
        FieldType::Scalar(scalar)
    }

    /// Create a nullable scalar field type.
    pub fn optional_scalar(scalar: ScalarType) -> Self {
        FieldType::OptionalScalar(scalar)
    }

    /// Create an enum field type.
    pub fn enum_type(name: impl Into<String>, variants: Vec<String>) -> Self {
        FieldType::Enum {
            name: name.into(),
            variants,
        }
    }

    /// Check if this type is nullable.
    pub fn is_nullable(&self) -> bool {
        matches!(self, FieldType::OptionalScalar(_))
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarType::Bool => write!(f, "bool"),
            ScalarType::Int32 => write!(f, "int32"),
            ScalarType::Int64 => write!(f, "int64"),
            ScalarType::Float64 => write!(f, "float64"),
            ScalarType::Decimal { precision, scale } => write!(f, "decimal({precision},{scale})"),
            ScalarType::Varchar(len) => write!(f, "varchar({len})"),
            ScalarType::Text => write!(f, "text"),
            ScalarType::Timestamp => write!(f, "timestamp"),
            ScalarType::Uuid => write!(f, "uuid"),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar(s) => write!(f, "{s}"),
            FieldType::OptionalScalar(s) => write!(f, "{s}?"),
            FieldType::Enum { name, variants } => write!(f, "enum {name}[{}]", variants.join("|")),
        }
    }
}
