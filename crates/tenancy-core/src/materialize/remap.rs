//! Relation remapping.
//!
//! Turns the relational fields declared on templates into fields bound to one
//! tenant: template targets become that tenant's concrete types and implicit
//! many-to-many join tables move into the tenant schema.

use super::concrete::{RelationTarget, TenantRelation};
use super::MaterializePath;
use crate::catalog::{DeclaredTarget, EntityTemplate, RelationField};
use crate::error::Error;
use crate::models::TenantModels;
use crate::schema::{db_schema_table, truncate_name};
use crate::tenant::TenantModel;

/// Remaps relational fields onto the type being built for one tenant.
pub(crate) struct RelationRemapper<'a, T: ?Sized> {
    models: &'a TenantModels,
    tenant: &'a T,
    /// Template whose concrete type receives the fields.
    owner: &'a EntityTemplate,
}

impl<'a, T: TenantModel + ?Sized> RelationRemapper<'a, T> {
    pub(crate) fn new(models: &'a TenantModels, tenant: &'a T, owner: &'a EntityTemplate) -> Self {
        Self {
            models,
            tenant,
            owner,
        }
    }

    /// Remap every field declared by `declaring`.
    pub(crate) fn remap_all(
        &self,
        declaring: &str,
        fields: &[RelationField],
        path: &mut MaterializePath,
    ) -> Result<Vec<TenantRelation>, Error> {
        fields
            .iter()
            .map(|field| self.remap(declaring, field, path))
            .collect()
    }

    /// Remap one field declared by `declaring`.
    ///
    /// The join table name is derived from the owner's base table before the
    /// field is bound, so it depends on the abstract endpoints only.
    pub(crate) fn remap(
        &self,
        declaring: &str,
        field: &RelationField,
        path: &mut MaterializePath,
    ) -> Result<TenantRelation, Error> {
        let vendor = self.models.vendor();
        let join_table = (field.is_many_to_many() && field.through.is_none()).then(|| {
            let table = field.default_m2m_db_table(&self.owner.db_table());
            db_schema_table(self.tenant, &truncate_name(&table, vendor.max_name_length()), vendor)
        });

        let target = match &field.target {
            DeclaredTarget::Shared { table } => RelationTarget::Shared {
                table: table.clone(),
            },
            DeclaredTarget::Template(key) => {
                let templates = self.models.templates();
                let related_name = templates.meta(key)?.related_name.as_deref().ok_or_else(|| {
                    Error::MissingRelatedName {
                        template: declaring.to_string(),
                        field: field.name.clone(),
                        target: key.clone(),
                    }
                })?;

                if *key == self.owner.key() {
                    RelationTarget::Itself
                } else {
                    let entity = self.models.resolve_related(self.tenant, related_name, path)?;
                    RelationTarget::Entity(entity)
                }
            }
        };

        Ok(TenantRelation {
            name: field.name.clone(),
            target,
            cardinality: field.cardinality,
            through: field.through.clone(),
            join_table,
            on_delete: field.on_delete,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TemplateRegistry;
    use crate::registry::MemoryTypeRegistry;
    use crate::schema::Vendor;
    use crate::tenant::Tenant;
    use std::sync::Arc;

    fn setup(vendor: Vendor) -> TenantModels {
        let mut templates = TemplateRegistry::new();
        templates.define(EntityTemplate::new("shop", "Tag")).unwrap();
        templates.define(EntityTemplate::new("shop", "Order")).unwrap();
        templates
            .define(EntityTemplate::new("shop", "Auditable").abstract_base())
            .unwrap();
        TenantModels::new(templates, MemoryTypeRegistry::new(), vendor).unwrap()
    }

    #[test]
    fn test_foreign_key_retargets_to_tenant_type() {
        let models = setup(Vendor::Postgres);
        let acme = Tenant::new(1, "acme").unwrap();
        let owner = models.templates().resolve("shop.Order").unwrap().clone();
        let remapper = RelationRemapper::new(&models, &acme, &owner);

        let field = RelationField::foreign_key("tag", "shop.Tag");
        let mut path = MaterializePath::default();
        let relation = remapper.remap("shop.Order", &field, &mut path).unwrap();

        let tags = models.get(&acme, "tags").unwrap();
        assert!(Arc::ptr_eq(relation.target_entity().unwrap(), &tags));
        assert_eq!(relation.join_table, None);
    }

    #[test]
    fn test_m2m_join_table_in_tenant_schema() {
        let acme = Tenant::new(1, "acme").unwrap();
        let field = RelationField::many_to_many("tags", "shop.Tag");

        let models = setup(Vendor::Postgres);
        let owner = models.templates().resolve("shop.Order").unwrap().clone();
        let relation = RelationRemapper::new(&models, &acme, &owner)
            .remap("shop.Order", &field, &mut MaterializePath::default())
            .unwrap();
        assert_eq!(relation.join_table.as_deref(), Some("tenant_acme\".\"shop_order_tags"));

        let models = setup(Vendor::Sqlite);
        let relation = RelationRemapper::new(&models, &acme, &owner)
            .remap("shop.Order", &field, &mut MaterializePath::default())
            .unwrap();
        assert_eq!(relation.join_table.as_deref(), Some("tenant_acme_shop_order_tags"));
    }

    #[test]
    fn test_long_m2m_join_table_truncated_before_qualifying() {
        let acme = Tenant::new(1, "acme").unwrap();
        let owner = EntityTemplate::new("shop", "Order")
            .with_db_table(format!("shop_order_{}", "x".repeat(40)));
        let field = RelationField::many_to_many("tags_with_a_long_name", "shop.Tag");
        let full = format!("{}_tags_with_a_long_name", owner.db_table());
        assert!(full.len() > 64);

        let join_table = |vendor| {
            let models = setup(vendor);
            RelationRemapper::new(&models, &acme, &owner)
                .remap("shop.Order", &field, &mut MaterializePath::default())
                .unwrap()
                .join_table
                .unwrap()
        };

        let postgres = join_table(Vendor::Postgres);
        let (schema, table) = postgres.split_once("\".\"").unwrap();
        assert_eq!(schema, "tenant_acme");
        assert_eq!(table.len(), 63);
        assert_eq!(table, truncate_name(&full, Some(63)));
        assert_ne!(table, &full[..63]);

        let mysql = join_table(Vendor::MySql);
        assert_eq!(mysql, format!("tenant_acme_{}", truncate_name(&full, Some(64))));
        assert_eq!(mysql.len(), "tenant_acme_".len() + 64);

        assert_eq!(join_table(Vendor::Sqlite), format!("tenant_acme_{full}"));
    }

    #[test]
    fn test_m2m_with_through_keeps_declaration() {
        let models = setup(Vendor::Postgres);
        let acme = Tenant::new(1, "acme").unwrap();
        let owner = models.templates().resolve("shop.Order").unwrap().clone();
        let field = RelationField::many_to_many("tags", "shop.Tag").with_through("shop.Order");

        let relation = RelationRemapper::new(&models, &acme, &owner)
            .remap("shop.Order", &field, &mut MaterializePath::default())
            .unwrap();
        assert_eq!(relation.join_table, None);
        assert_eq!(relation.through.as_deref(), Some("shop.Order"));
    }

    #[test]
    fn test_abstract_target_is_missing_related_name() {
        let models = setup(Vendor::Postgres);
        let acme = Tenant::new(1, "acme").unwrap();
        let owner = models.templates().resolve("shop.Order").unwrap().clone();
        let field = RelationField::foreign_key("audit", "shop.Auditable");

        let err = RelationRemapper::new(&models, &acme, &owner)
            .remap("shop.Order", &field, &mut MaterializePath::default())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MissingRelatedName { ref template, ref field, ref target }
                if template == "shop.Order" && field == "audit" && target == "shop.Auditable"
        ));
    }

    #[test]
    fn test_self_reference_and_shared_targets() {
        let models = setup(Vendor::Postgres);
        let acme = Tenant::new(1, "acme").unwrap();
        let owner = models.templates().resolve("shop.Order").unwrap().clone();
        let remapper = RelationRemapper::new(&models, &acme, &owner);
        let fields = vec![
            RelationField::foreign_key("parent", "shop.Order"),
            RelationField::shared("clerk", "auth_user"),
        ];

        let relations = remapper
            .remap_all("shop.Order", &fields, &mut MaterializePath::default())
            .unwrap();
        assert!(matches!(relations[0].target, RelationTarget::Itself));
        assert!(matches!(
            relations[1].target,
            RelationTarget::Shared { ref table } if table == "auth_user"
        ));
        assert!(!models.is_live(&crate::NaturalKey::new("tenant_1_shop", "order")));
    }
}
