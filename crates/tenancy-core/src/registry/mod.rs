//! Persistent type registry.
//!
//! Records which (template, tenant) pairs have been materialized, keyed by
//! [`NaturalKey`]. Records outlive the process; the live types they describe
//! do not, and are rebuilt on first access after a restart.

mod memory;
mod sled_store;

pub use memory::MemoryTypeRegistry;
pub use sled_store::SledTypeRegistry;

use crate::error::Error;
use crate::materialize::{ConcreteEntity, NaturalKey, FINGERPRINT_SIZE};
use rkyv::{Archive, Deserialize, Serialize};

/// A persisted registry record.
#[derive(Debug, Clone, PartialEq, Eq, Archive, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// App label of the natural key.
    pub app_label: String,
    /// Model name of the natural key.
    pub model: String,
    /// Template the type was built from.
    pub template: String,
    /// Tenant the type was built for.
    pub tenant_key: String,
    /// Schema-qualified storage table.
    pub db_table: String,
    /// Shape fingerprint of the type when the record was written.
    pub fingerprint: [u8; FINGERPRINT_SIZE],
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
}

impl RegistryRecord {
    /// Create a record describing `entity`.
    pub fn for_entity(entity: &ConcreteEntity) -> Self {
        let key = entity.natural_key();
        Self {
            app_label: key.app_label.clone(),
            model: key.model.clone(),
            template: entity.template().to_string(),
            tenant_key: entity.tenant_key().to_string(),
            db_table: entity.db_table().to_string(),
            fingerprint: *entity.fingerprint(),
            created_at: current_timestamp(),
        }
    }

    /// Natural key of the record.
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::new(self.app_label.clone(), self.model.clone())
    }

    /// Whether `entity` has the shape this record was written for.
    pub fn matches(&self, entity: &ConcreteEntity) -> bool {
        self.fingerprint == *entity.fingerprint() && self.db_table == entity.db_table()
    }

    /// Serialize the record to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a record from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

/// Store of registry records.
///
/// Writes are last-write-wins; callers only create a record after a lookup
/// by the same natural key came back empty.
pub trait TypeRegistry: Send + Sync {
    /// Look up a record by natural key.
    fn get_by_natural_key(&self, key: &NaturalKey) -> Result<Option<RegistryRecord>, Error>;

    /// Persist a record for a freshly built type.
    fn create_for_type(&self, entity: &ConcreteEntity) -> Result<RegistryRecord, Error>;

    /// All records, ordered by natural key.
    fn records(&self) -> Result<Vec<RegistryRecord>, Error>;

    /// Flush pending writes.
    fn flush(&self) -> Result<(), Error> {
        Ok(())
    }
}

/// Current time in microseconds since Unix epoch.
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}
