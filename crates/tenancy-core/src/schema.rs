//! Schema-qualified table naming.

use crate::tenant::TenantModel;
use serde::Deserialize;

/// Database engine family, as far as table naming is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// PostgreSQL: real schema namespaces.
    #[default]
    Postgres,
    /// MySQL / MariaDB: tenant tables share one namespace.
    #[serde(alias = "mariadb")]
    MySql,
    /// SQLite: tenant tables share one namespace.
    Sqlite,
}

impl Vendor {
    /// Whether tables can live in separate schemas.
    pub fn supports_schemas(self) -> bool {
        matches!(self, Vendor::Postgres)
    }

    /// Maximum identifier length, if the engine enforces one.
    pub fn max_name_length(self) -> Option<usize> {
        match self {
            Vendor::Postgres => Some(63),
            Vendor::MySql => Some(64),
            Vendor::Sqlite => None,
        }
    }
}

/// Name a tenant table.
///
/// For schema-capable engines this returns `schema"."table`, which becomes
/// `"schema"."table"` once the engine quotes it as a single identifier
/// (see [`quote_name`]). Other engines get `schema_table`.
pub fn db_schema_table<T: TenantModel + ?Sized>(
    tenant: &T,
    db_table: &str,
    vendor: Vendor,
) -> String {
    let schema = tenant.db_schema();
    if vendor.supports_schemas() {
        format!("{schema}\".\"{db_table}")
    } else {
        format!("{schema}_{db_table}")
    }
}

/// Quote an identifier the way the engine quotes table names.
pub fn quote_name(name: &str) -> String {
    if name.starts_with('"') && name.ends_with('"') {
        name.to_string()
    } else {
        format!("\"{name}\"")
    }
}

/// Shorten an identifier to `length` characters, keeping it unique by
/// replacing the tail with a short hash of the full name.
pub fn truncate_name(name: &str, length: Option<usize>) -> String {
    const HASH_LEN: usize = 4;

    match length {
        Some(length) if name.len() > length && length > HASH_LEN => {
            let digest = blake3::hash(name.as_bytes());
            let hash = &hex::encode(digest.as_bytes())[..HASH_LEN];
            let mut cut = length - HASH_LEN;
            while !name.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}{hash}", &name[..cut])
        }
        _ => name.to_string(),
    }
}
