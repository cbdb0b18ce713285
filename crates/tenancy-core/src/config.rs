//! Tenancy configuration.

use crate::error::Error;
use crate::schema::Vendor;
use serde::Deserialize;
use std::path::PathBuf;

/// Default schema shared by all tenants.
pub const DEFAULT_SCHEMA: &str = "public";

/// Configuration for the persistent type registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path to the registry database directory.
    pub path: PathBuf,

    /// Page cache capacity in bytes.
    pub cache_capacity: u64,

    /// Flush interval in milliseconds. None means flush on every write.
    pub flush_every_ms: Option<u64>,

    /// Temporary database (deleted on drop).
    pub temporary: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./tenancy_registry"),
            cache_capacity: 64 * 1024 * 1024, // 64MB
            flush_every_ms: Some(500),
            temporary: false,
        }
    }
}

impl RegistryConfig {
    /// Create a new configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Create a temporary configuration for testing.
    pub fn temporary() -> Self {
        Self {
            path: PathBuf::from(""),
            temporary: true,
            ..Default::default()
        }
    }

    /// Convert to sled configuration.
    pub(crate) fn to_sled_config(&self) -> sled::Config {
        let mut config = sled::Config::new().cache_capacity(self.cache_capacity);

        if self.temporary {
            config = config.temporary(true);
        } else {
            config = config.path(&self.path);
        }

        if let Some(ms) = self.flush_every_ms {
            config = config.flush_every_ms(Some(ms));
        }

        config
    }
}

/// Top-level tenancy configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TenancyConfig {
    /// Engine family used to name tenant tables.
    pub vendor: Vendor,

    /// Schema every tenant search path falls back to.
    pub default_schema: String,

    /// Persistent type registry settings.
    pub registry: RegistryConfig,
}

impl Default for TenancyConfig {
    fn default() -> Self {
        Self {
            vendor: Vendor::default(),
            default_schema: DEFAULT_SCHEMA.to_string(),
            registry: RegistryConfig::default(),
        }
    }
}

impl TenancyConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the vendor.
    pub fn with_vendor(mut self, vendor: Vendor) -> Self {
        self.vendor = vendor;
        self
    }

    /// Set the default schema.
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    /// Set the registry configuration.
    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}
