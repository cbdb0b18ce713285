//! Sled-backed type registry.

use super::{RegistryRecord, TypeRegistry};
use crate::config::RegistryConfig;
use crate::error::Error;
use crate::materialize::{ConcreteEntity, NaturalKey};
use sled::{Db, Tree};
use tracing::debug;

/// Tree name for registry records.
const TYPES_TREE: &str = "tenancy:types";

/// Type registry persisted in a sled tree, keyed by encoded natural key.
pub struct SledTypeRegistry {
    /// Owned database, when opened from a configuration.
    _db: Option<Db>,
    /// Records tree.
    tree: Tree,
}

impl SledTypeRegistry {
    /// Open or create a registry database described by `config`.
    pub fn open(config: &RegistryConfig) -> Result<Self, Error> {
        let db = config.to_sled_config().open()?;
        let tree = db.open_tree(TYPES_TREE)?;
        debug!(path = %config.path.display(), records = tree.len(), "Opened type registry");
        Ok(Self { _db: Some(db), tree })
    }

    /// Use the registry tree inside an existing sled database.
    pub fn from_db(db: &Db) -> Result<Self, Error> {
        Ok(Self {
            _db: None,
            tree: db.open_tree(TYPES_TREE)?,
        })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

impl TypeRegistry for SledTypeRegistry {
    fn get_by_natural_key(&self, key: &NaturalKey) -> Result<Option<RegistryRecord>, Error> {
        match self.tree.get(key.encode())? {
            Some(bytes) => Ok(Some(RegistryRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    fn create_for_type(&self, entity: &ConcreteEntity) -> Result<RegistryRecord, Error> {
        let record = RegistryRecord::for_entity(entity);
        self.tree
            .insert(entity.natural_key().encode(), record.to_bytes()?)?;
        Ok(record)
    }

    fn records(&self) -> Result<Vec<RegistryRecord>, Error> {
        self.tree
            .iter()
            .values()
            .map(|value| RegistryRecord::from_bytes(&value?))
            .collect()
    }

    fn flush(&self) -> Result<(), Error> {
        self.tree.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityTemplate, FieldDef, FieldType, ScalarType, TemplateRegistry};
    use crate::models::TenantModels;
    use crate::registry::MemoryTypeRegistry;
    use crate::schema::Vendor;
    use crate::tenant::Tenant;

    fn test_db() -> sled::Db {
        sled::Config::new().temporary(true).open().unwrap()
    }

    fn customers_for(tenant: &Tenant) -> std::sync::Arc<ConcreteEntity> {
        let mut templates = TemplateRegistry::new();
        templates
            .define(
                EntityTemplate::new("shop", "Customer")
                    .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::Text))),
            )
            .unwrap();
        let models =
            TenantModels::new(templates, MemoryTypeRegistry::new(), Vendor::Postgres).unwrap();
        models.get(tenant, "customers").unwrap()
    }

    #[test]
    fn test_registry_open_empty() {
        let registry = SledTypeRegistry::from_db(&test_db()).unwrap();
        assert!(registry.is_empty());
        assert!(registry.records().unwrap().is_empty());
    }

    #[test]
    fn test_create_and_get() {
        let registry = SledTypeRegistry::from_db(&test_db()).unwrap();
        let acme = Tenant::new(1, "acme").unwrap();
        let customers = customers_for(&acme);

        let created = registry.create_for_type(&customers).unwrap();
        let loaded = registry
            .get_by_natural_key(customers.natural_key())
            .unwrap()
            .unwrap();

        assert_eq!(created, loaded);
        assert_eq!(loaded.template, "shop.Customer");
        assert_eq!(loaded.tenant_key, "1");
        assert_eq!(loaded.db_table, "tenant_acme\".\"shop_customer");
        assert!(loaded.matches(&customers));
    }

    #[test]
    fn test_records_ordered_by_natural_key() {
        let registry = SledTypeRegistry::from_db(&test_db()).unwrap();
        let globex = Tenant::new(2, "globex").unwrap();
        let acme = Tenant::new(1, "acme").unwrap();
        registry.create_for_type(&customers_for(&globex)).unwrap();
        registry.create_for_type(&customers_for(&acme)).unwrap();

        let labels: Vec<_> = registry
            .records()
            .unwrap()
            .into_iter()
            .map(|r| r.app_label)
            .collect();
        assert_eq!(labels, vec!["tenant_1_shop", "tenant_2_shop"]);
    }

    #[test]
    fn test_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig::new(dir.path());
        let acme = Tenant::new(1, "acme").unwrap();
        let customers = customers_for(&acme);

        {
            let registry = SledTypeRegistry::open(&config).unwrap();
            registry.create_for_type(&customers).unwrap();
            registry.flush().unwrap();
        }

        let registry = SledTypeRegistry::open(&config).unwrap();
        assert_eq!(registry.len(), 1);
        let record = registry
            .get_by_natural_key(&NaturalKey::new("tenant_1_shop", "customer"))
            .unwrap()
            .unwrap();
        assert_eq!(record.fingerprint, *customers.fingerprint());
    }
}
