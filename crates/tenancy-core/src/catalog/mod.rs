//! Template catalog.
//!
//! Templates, their fields and relations, and the registry that resolves
//! references between them.

mod field;
mod registry;
mod relation;
mod template;
mod types;

pub use field::FieldDef;
pub use registry::TemplateRegistry;
pub use relation::{Cardinality, DeclaredTarget, DeleteBehavior, RelationField};
pub use template::{BaseRef, EntityTemplate, TemplateKind, TemplateMeta};
pub use types::{FieldType, ScalarType};
