//! Tenancy Core - schema-per-tenant entity types and tenant migrations.
//!
//! One logical data model is multiplexed across many database schemas, one
//! per tenant. Entity templates are defined once; each tenant gets its own
//! concrete, schema-bound version of a template the first time it is
//! accessed, with relations bound to that tenant's versions of their targets.
//! Migrations run once per tenant inside the tenant schema.

pub mod catalog;
pub mod config;
pub mod error;
pub mod materialize;
pub mod migration;
pub mod models;
pub mod registry;
pub mod schema;
pub mod tenant;

pub use catalog::{
    BaseRef, Cardinality, DeclaredTarget, DeleteBehavior, EntityTemplate, FieldDef, FieldType,
    RelationField, ScalarType, TemplateKind, TemplateMeta, TemplateRegistry,
};
pub use config::{RegistryConfig, TenancyConfig, DEFAULT_SCHEMA};
pub use error::Error;
pub use materialize::{ConcreteBase, ConcreteEntity, NaturalKey, RelationTarget, TenantRelation};
pub use migration::{
    MigrationError, MigrationKind, RecordingEditor, SchemaEditor, TenantMigration,
    TenantMigrationRunner, TenantStep,
};
pub use models::{TenantModels, TenantView};
pub use registry::{MemoryTypeRegistry, RegistryRecord, SledTypeRegistry, TypeRegistry};
pub use schema::{db_schema_table, quote_name, truncate_name, Vendor};
pub use tenant::{Tenant, TenantModel};
