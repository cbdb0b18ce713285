//! In-memory type registry.

use super::{RegistryRecord, TypeRegistry};
use crate::error::Error;
use crate::materialize::{ConcreteEntity, NaturalKey};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Type registry kept in process memory. Used in tests and for tenants that
/// never outlive the process.
#[derive(Debug, Default)]
pub struct MemoryTypeRegistry {
    records: RwLock<BTreeMap<NaturalKey, RegistryRecord>>,
}

impl MemoryTypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with records, as if they had been
    /// written by an earlier process.
    pub fn with_records(records: impl IntoIterator<Item = RegistryRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|record| (record.natural_key(), record))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl TypeRegistry for MemoryTypeRegistry {
    fn get_by_natural_key(&self, key: &NaturalKey) -> Result<Option<RegistryRecord>, Error> {
        Ok(self.records.read().get(key).cloned())
    }

    fn create_for_type(&self, entity: &ConcreteEntity) -> Result<RegistryRecord, Error> {
        let record = RegistryRecord::for_entity(entity);
        self.records
            .write()
            .insert(entity.natural_key().clone(), record.clone());
        Ok(record)
    }

    fn records(&self) -> Result<Vec<RegistryRecord>, Error> {
        Ok(self.records.read().values().cloned().collect())
    }
}
