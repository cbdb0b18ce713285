//! Concrete, tenant-bound entity types.

use crate::catalog::{Cardinality, DeleteBehavior, EntityTemplate, FieldDef};
use crate::tenant::{TenantModel, SCHEMA_PREFIX};
use std::fmt;
use std::fmt::Write as _;
use std::sync::Arc;

/// Size of a shape fingerprint in bytes.
pub const FINGERPRINT_SIZE: usize = 32;

/// Natural key of a materialized type in the persistent registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NaturalKey {
    /// `tenant_<tenantKey>_<namespace>`.
    pub app_label: String,
    /// Lowercased type name.
    pub model: String,
}

impl NaturalKey {
    /// Create a natural key.
    pub fn new(app_label: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            app_label: app_label.into(),
            model: model.into(),
        }
    }

    /// Natural key of `template` materialized for `tenant`.
    pub fn for_tenant<T: TenantModel + ?Sized>(tenant: &T, template: &EntityTemplate) -> Self {
        Self::new(app_label(tenant, &template.namespace), template.model_name())
    }

    /// Encode as a registry key: `app_label \0 model`.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.app_label.len() + self.model.len() + 1);
        buf.extend_from_slice(self.app_label.as_bytes());
        buf.push(0);
        buf.extend_from_slice(self.model.as_bytes());
        buf
    }

    /// Decode a registry key.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        let split = bytes.iter().position(|&b| b == 0)?;
        let app_label = std::str::from_utf8(&bytes[..split]).ok()?;
        let model = std::str::from_utf8(&bytes[split + 1..]).ok()?;
        Some(Self::new(app_label, model))
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model)
    }
}

/// App label of a tenant's copy of a namespace.
pub fn app_label<T: TenantModel + ?Sized>(tenant: &T, namespace: &str) -> String {
    format!("{SCHEMA_PREFIX}{}_{namespace}", tenant.key())
}

/// Target of a remapped relation.
#[derive(Debug, Clone)]
pub enum RelationTarget {
    /// The type owning the relation.
    Itself,
    /// Another type materialized for the same tenant.
    Entity(Arc<ConcreteEntity>),
    /// A table shared by all tenants.
    Shared {
        /// Unqualified table name.
        table: String,
    },
}

/// A relational field bound to one tenant.
#[derive(Debug, Clone)]
pub struct TenantRelation {
    /// Field name.
    pub name: String,
    /// Bound target.
    pub target: RelationTarget,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Explicit join template, copied from the declaration.
    pub through: Option<String>,
    /// Schema-qualified join table for many-to-many relations without `through`.
    pub join_table: Option<String>,
    /// Delete behavior.
    pub on_delete: DeleteBehavior,
}

impl TenantRelation {
    /// The target type, if it is another materialized type.
    pub fn target_entity(&self) -> Option<&Arc<ConcreteEntity>> {
        match &self.target {
            RelationTarget::Entity(entity) => Some(entity),
            _ => None,
        }
    }
}

/// An ancestor of a concrete type.
#[derive(Debug, Clone)]
pub enum ConcreteBase {
    /// A template inherited structurally.
    Template(String),
    /// The tenant's concrete version of a scoped ancestor.
    Tenant(Arc<ConcreteEntity>),
    /// A type outside the tenancy machinery.
    External(String),
}

/// Everything needed to build a [`ConcreteEntity`].
#[derive(Debug, Clone)]
pub(crate) struct ConcreteParts {
    pub natural_key: NaturalKey,
    pub template: String,
    pub tenant_key: String,
    pub db_table: String,
    pub fields: Vec<FieldDef>,
    pub relations: Vec<TenantRelation>,
    pub bases: Vec<ConcreteBase>,
}

/// A template materialized for one tenant.
#[derive(Debug)]
pub struct ConcreteEntity {
    natural_key: NaturalKey,
    template: String,
    tenant_key: String,
    db_table: String,
    fields: Vec<FieldDef>,
    relations: Vec<TenantRelation>,
    bases: Vec<ConcreteBase>,
    fingerprint: [u8; FINGERPRINT_SIZE],
}

impl ConcreteEntity {
    pub(crate) fn from_parts(parts: ConcreteParts) -> Self {
        let fingerprint = shape_fingerprint(&parts);
        Self {
            natural_key: parts.natural_key,
            template: parts.template,
            tenant_key: parts.tenant_key,
            db_table: parts.db_table,
            fields: parts.fields,
            relations: parts.relations,
            bases: parts.bases,
            fingerprint,
        }
    }

    /// Natural key in the persistent registry.
    pub fn natural_key(&self) -> &NaturalKey {
        &self.natural_key
    }

    /// App label, `tenant_<tenantKey>_<namespace>`.
    pub fn app_label(&self) -> &str {
        &self.natural_key.app_label
    }

    /// Key of the template this type was built from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Key of the owning tenant.
    pub fn tenant_key(&self) -> &str {
        &self.tenant_key
    }

    /// Schema-qualified storage table.
    pub fn db_table(&self) -> &str {
        &self.db_table
    }

    /// Scalar fields, inherited ones first.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Relational fields, inherited ones first.
    pub fn relations(&self) -> &[TenantRelation] {
        &self.relations
    }

    /// Ancestors; the first one is always the template itself.
    pub fn bases(&self) -> &[ConcreteBase] {
        &self.bases
    }

    /// Get a scalar field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get a relational field by name.
    pub fn relation(&self, name: &str) -> Option<&TenantRelation> {
        self.relations.iter().find(|r| r.name == name)
    }

    /// Hash of everything that determines the storage layout.
    pub fn fingerprint(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.fingerprint
    }

    /// Hex-encoded fingerprint.
    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint)
    }
}

fn shape_fingerprint(parts: &ConcreteParts) -> [u8; FINGERPRINT_SIZE] {
    let mut canonical = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(canonical, "{} {} {}", parts.natural_key, parts.template, parts.db_table);
    for base in &parts.bases {
        let _ = match base {
            ConcreteBase::Template(key) => writeln!(canonical, "base template {key}"),
            ConcreteBase::Tenant(entity) => {
                writeln!(canonical, "base tenant {}", entity.natural_key)
            }
            ConcreteBase::External(name) => writeln!(canonical, "base external {name}"),
        };
    }
    for field in &parts.fields {
        let _ = writeln!(canonical, "field {field}");
    }
    for relation in &parts.relations {
        let target = match &relation.target {
            RelationTarget::Itself => "self".to_string(),
            RelationTarget::Entity(entity) => format!("{}@{}", entity.natural_key, entity.db_table),
            RelationTarget::Shared { table } => format!("shared:{table}"),
        };
        let _ = writeln!(
            canonical,
            "relation {} {} {target} {} {} {}",
            relation.name,
            relation.cardinality,
            relation.through.as_deref().unwrap_or("-"),
            relation.join_table.as_deref().unwrap_or("-"),
            relation.on_delete,
        );
    }
    *blake3::hash(canonical.as_bytes()).as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldType, ScalarType};
    use crate::tenant::Tenant;

    fn parts(db_table: &str) -> ConcreteParts {
        ConcreteParts {
            natural_key: NaturalKey::new("tenant_1_shop", "customer"),
            template: "shop.Customer".into(),
            tenant_key: "1".into(),
            db_table: db_table.into(),
            fields: vec![FieldDef::new("name", FieldType::scalar(ScalarType::Text))],
            relations: Vec::new(),
            bases: vec![ConcreteBase::Template("shop.Customer".into())],
        }
    }

    #[test]
    fn test_natural_key_from_tenant_and_template() {
        let acme = Tenant::new(42, "acme").unwrap();
        let template = EntityTemplate::new("shop", "OrderLine");
        let key = NaturalKey::for_tenant(&acme, &template);

        assert_eq!(key.app_label, "tenant_42_shop");
        assert_eq!(key.model, "orderline");
        assert_eq!(key.to_string(), "tenant_42_shop.orderline");
    }

    #[test]
    fn test_natural_key_encoding() {
        let key = NaturalKey::new("tenant_42_shop", "order");
        assert_eq!(NaturalKey::decode(&key.encode()), Some(key));
        assert_eq!(NaturalKey::decode(b"no-separator"), None);
    }

    #[test]
    fn test_fingerprint_tracks_layout() {
        let a = ConcreteEntity::from_parts(parts("tenant_acme\".\"shop_customer"));
        let b = ConcreteEntity::from_parts(parts("tenant_acme\".\"shop_customer"));
        let c = ConcreteEntity::from_parts(parts("tenant_acme_shop_customer"));

        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint_hex().len(), FINGERPRINT_SIZE * 2);
    }

    #[test]
    fn test_accessors() {
        let entity = ConcreteEntity::from_parts(parts("tenant_acme\".\"shop_customer"));
        assert_eq!(entity.app_label(), "tenant_1_shop");
        assert_eq!(entity.template(), "shop.Customer");
        assert_eq!(entity.tenant_key(), "1");
        assert!(entity.field("name").is_some());
        assert!(entity.relation("name").is_none());
        assert!(matches!(entity.bases()[0], ConcreteBase::Template(_)));
    }
}
