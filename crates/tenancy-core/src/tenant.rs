//! Tenant model.
//!
//! A tenant owns one database schema. Everything tenant-specific (app labels,
//! storage tables, search paths) is derived from [`TenantModel::key`] and
//! [`TenantModel::db_schema`], so the tenant type itself is swappable.

use crate::error::Error;

/// Prefix of every tenant schema name.
pub const SCHEMA_PREFIX: &str = "tenant_";

/// Maximum length of a tenant name.
pub const MAX_TENANT_NAME_LEN: usize = 20;

/// Behavior every tenant model must provide.
pub trait TenantModel {
    /// Stable key of the tenant, used in app labels of materialized types.
    fn key(&self) -> String;

    /// Name of the database schema holding this tenant's tables.
    fn db_schema(&self) -> String;
}

/// Default tenant model: a numeric primary key and a unique short name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tenant {
    /// Primary key.
    pub id: u64,
    /// Unique name; the schema is `tenant_<name>`.
    pub name: String,
}

impl Tenant {
    /// Create a tenant, validating that its name fits in a schema identifier.
    pub fn new(id: u64, name: impl Into<String>) -> Result<Self, Error> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self { id, name })
    }
}

impl TenantModel for Tenant {
    fn key(&self) -> String {
        self.id.to_string()
    }

    fn db_schema(&self) -> String {
        format!("{SCHEMA_PREFIX}{}", self.name)
    }
}

impl<T: TenantModel + ?Sized> TenantModel for &T {
    fn key(&self) -> String {
        (**self).key()
    }

    fn db_schema(&self) -> String {
        (**self).db_schema()
    }
}

fn validate_name(name: &str) -> Result<(), Error> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.chars().count() > MAX_TENANT_NAME_LEN {
        "name is longer than 20 characters"
    } else if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        "only ASCII letters, digits and '_' are allowed"
    } else {
        return Ok(());
    };

    Err(Error::InvalidTenantName {
        name: name.to_string(),
        reason,
    })
}
