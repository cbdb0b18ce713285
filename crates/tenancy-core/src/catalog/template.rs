//! Entity templates.
//!
//! A template describes the shape of an entity once; every tenant gets its
//! own schema-bound copy of it on first access.

use super::field::FieldDef;
use super::relation::RelationField;

/// How a template takes part in materialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Materialized per tenant and reachable through its related name.
    Scoped,
    /// Declared-abstract base: contributes fields to templates deriving from
    /// it but is never materialized on its own.
    Abstract,
}

/// A declared ancestor of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseRef {
    /// Another template, by key.
    Template(String),
    /// A type outside the tenancy machinery, kept unchanged.
    External(String),
}

/// An entity template.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTemplate {
    /// Namespace (app label) the template belongs to.
    pub namespace: String,
    /// Type name, unique within the namespace.
    pub name: String,
    /// Scalar fields.
    pub fields: Vec<FieldDef>,
    /// Relational fields.
    pub relations: Vec<RelationField>,
    /// Declared ancestors, in declaration order.
    pub bases: Vec<BaseRef>,
    /// Explicit related name on the tenant model.
    pub related_name: Option<String>,
    /// Explicit base table name.
    pub db_table: Option<String>,
    /// Template kind.
    pub kind: TemplateKind,
}

/// Metadata recorded for every defined template.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateMeta {
    /// Name under which the tenant model exposes the template, `None` for
    /// declared-abstract templates.
    pub related_name: Option<String>,
    /// Relational fields targeting other templates, in declaration order.
    pub related_fields: Vec<RelationField>,
}

impl EntityTemplate {
    /// Create a new tenant-scoped template.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            fields: Vec::new(),
            relations: Vec::new(),
            bases: Vec::new(),
            related_name: None,
            db_table: None,
            kind: TemplateKind::Scoped,
        }
    }

    /// Add a scalar field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple scalar fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Add a relational field.
    pub fn with_relation(mut self, relation: RelationField) -> Self {
        self.relations.push(relation);
        self
    }

    /// Derive from another template.
    pub fn with_base(mut self, key: impl Into<String>) -> Self {
        self.bases.push(BaseRef::Template(key.into()));
        self
    }

    /// Derive from a type outside the tenancy machinery.
    pub fn with_external_base(mut self, name: impl Into<String>) -> Self {
        self.bases.push(BaseRef::External(name.into()));
        self
    }

    /// Override the related name.
    pub fn with_related_name(mut self, related_name: impl Into<String>) -> Self {
        self.related_name = Some(related_name.into());
        self
    }

    /// Override the base table name.
    pub fn with_db_table(mut self, db_table: impl Into<String>) -> Self {
        self.db_table = Some(db_table.into());
        self
    }

    /// Declare this template abstract.
    pub fn abstract_base(mut self) -> Self {
        self.kind = TemplateKind::Abstract;
        self
    }

    /// Registry key, `namespace.TypeName`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.namespace, self.name)
    }

    /// Lowercased type name.
    pub fn model_name(&self) -> String {
        self.name.to_lowercase()
    }

    /// Base table name: explicit, or `namespace_typename`.
    pub fn db_table(&self) -> String {
        match &self.db_table {
            Some(table) => table.clone(),
            None => format!("{}_{}", self.namespace, self.model_name()),
        }
    }

    /// Related name this template is installed under, if it is scoped.
    pub fn default_related_name(&self) -> Option<String> {
        match self.kind {
            TemplateKind::Abstract => None,
            TemplateKind::Scoped => Some(
                self.related_name
                    .clone()
                    .unwrap_or_else(|| format!("{}s", self.model_name())),
            ),
        }
    }

    /// Template ancestors, by key.
    pub fn template_bases(&self) -> impl Iterator<Item = &str> {
        self.bases.iter().filter_map(|b| match b {
            BaseRef::Template(key) => Some(key.as_str()),
            BaseRef::External(_) => None,
        })
    }

    /// Get a scalar field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a relational field by name.
    pub fn get_relation(&self, name: &str) -> Option<&RelationField> {
        self.relations.iter().find(|r| r.name == name)
    }
}

impl TemplateMeta {
    /// Get a related field by name.
    pub fn get(&self, name: &str) -> Option<&RelationField> {
        self.related_fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldType, ScalarType};

    #[test]
    fn test_template_builder() {
        let order = EntityTemplate::new("shop", "Order")
            .with_field(FieldDef::new("number", FieldType::scalar(ScalarType::Int64)))
            .with_relation(RelationField::foreign_key("customer", "shop.Customer"))
            .with_base("shop.Timestamped")
            .with_external_base("Auditable");

        assert_eq!(order.key(), "shop.Order");
        assert_eq!(order.model_name(), "order");
        assert_eq!(order.db_table(), "shop_order");
        assert_eq!(order.default_related_name().as_deref(), Some("orders"));
        assert_eq!(order.template_bases().collect::<Vec<_>>(), vec!["shop.Timestamped"]);
        assert!(order.get_field("number").is_some());
        assert!(order.get_relation("customer").is_some());
        assert!(order.get_relation("number").is_none());
    }

    #[test]
    fn test_overrides() {
        let person = EntityTemplate::new("crm", "Person")
            .with_related_name("people")
            .with_db_table("persons");

        assert_eq!(person.default_related_name().as_deref(), Some("people"));
        assert_eq!(person.db_table(), "persons");
    }

    #[test]
    fn test_abstract_has_no_related_name() {
        let base = EntityTemplate::new("shop", "Timestamped")
            .with_related_name("ignored")
            .abstract_base();
        assert_eq!(base.kind, TemplateKind::Abstract);
        assert_eq!(base.default_related_name(), None);
    }
}
