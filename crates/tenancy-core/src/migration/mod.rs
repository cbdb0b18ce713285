//! Per-tenant migrations.
//!
//! A tenant migration runs one operation once per tenant with the schema
//! editor pointed at that tenant's schema:
//!
//! 1. The editor's default schema becomes the tenant schema, and the
//!    pre-step statements (`SET search_path TO <tenant>, <default>`) run.
//! 2. The operation runs.
//! 3. The post-step statements (`SET search_path TO <default>`) run.
//! 4. Statements the operation deferred are bracketed by the pre- and
//!    post-step statements, so they run against the tenant schema too when
//!    the editor flushes them at the end of the migration.
//! 5. The default schema is restored, even if the operation failed.
//!
//! # Example
//!
//! ```ignore
//! use tenancy_core::migration::{RecordingEditor, SchemaEditor, TenantMigrationRunner};
//!
//! let mut editor = RecordingEditor::new("public");
//! TenantMigrationRunner::new().run(&mut editor, &tenants, &state, |step| {
//!     step.editor.execute("ALTER TABLE shop_order ADD COLUMN note text")?;
//!     step.editor.deferred_sql().push("ALTER TABLE shop_order ADD CONSTRAINT ...");
//!     Ok::<_, MigrationError>(())
//! })?;
//! editor.execute_deferred()?;
//! ```

pub mod editor;
pub mod error;
pub mod runner;
pub mod scope;
pub mod statement;

pub use editor::{Executed, RecordingEditor, SchemaEditor};
pub use error::MigrationError;
pub use runner::{
    DefaultStepSql, MigrationKind, RunSummary, TenantMigration, TenantMigrationRunner,
    TenantStep, TenantStepSql,
};
pub use scope::SchemaScope;
pub use statement::{DeferredFrame, DeferredLog};
