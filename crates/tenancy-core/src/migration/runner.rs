//! Per-tenant migration runner.

use super::editor::SchemaEditor;
use super::error::MigrationError;
use super::scope::SchemaScope;
use crate::tenant::TenantModel;
use tracing::{debug, info, info_span};

/// Statements bracketing each tenant step.
///
/// The defaults point the search path at the tenant schema first and the
/// default schema second, so unqualified names still resolve against shared
/// tables.
pub trait TenantStepSql {
    /// Statements run before the step.
    fn pre_tenant_step_sql<T: TenantModel + ?Sized>(
        &self,
        tenant: &T,
        default_schema: &str,
    ) -> Vec<String> {
        vec![format!(
            "SET search_path TO {}, {default_schema}",
            tenant.db_schema()
        )]
    }

    /// Statements run after the step.
    fn post_tenant_step_sql<T: TenantModel + ?Sized>(
        &self,
        _tenant: &T,
        default_schema: &str,
    ) -> Vec<String> {
        vec![format!("SET search_path TO {default_schema}")]
    }
}

/// The default search path statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStepSql;

impl TenantStepSql for DefaultStepSql {}

/// What a migration operation gets for one tenant.
pub struct TenantStep<'a, T: ?Sized, S: ?Sized, E: ?Sized> {
    /// The tenant being migrated.
    pub tenant: &'a T,
    /// Model state of the migration.
    pub state: &'a S,
    /// Schema editor, with the tenant schema as its default schema.
    pub editor: &'a mut E,
    /// Default schema before the step.
    pub default_schema: &'a str,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Tenants migrated.
    pub tenants: usize,
    /// Deferred statements emitted by the steps, not counting brackets.
    pub deferred: usize,
    /// Tenant steps whose deferred statements were bracketed.
    pub bracketed: usize,
}

/// Runs a migration operation once per tenant, inside that tenant's schema.
#[derive(Debug, Clone, Default)]
pub struct TenantMigrationRunner<H = DefaultStepSql> {
    hooks: H,
}

impl TenantMigrationRunner {
    /// Create a runner using the default search path statements.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<H: TenantStepSql> TenantMigrationRunner<H> {
    /// Create a runner using custom bracketing statements.
    pub fn with_hooks(hooks: H) -> Self {
        Self { hooks }
    }

    /// Bracketing statements in use.
    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    /// Run `operation` for each tenant, in order.
    ///
    /// The first error stops the run and is returned unchanged; tenants after
    /// it are not processed. The editor's default schema is restored after
    /// every step whatever its outcome.
    pub fn run<T, S, E, F, Err>(
        &self,
        editor: &mut E,
        tenants: &[T],
        state: &S,
        mut operation: F,
    ) -> Result<RunSummary, Err>
    where
        T: TenantModel,
        S: ?Sized,
        E: SchemaEditor + ?Sized,
        F: FnMut(&mut TenantStep<'_, T, S, E>) -> Result<(), Err>,
        Err: From<MigrationError>,
    {
        let mut summary = RunSummary::default();

        for tenant in tenants {
            let schema = tenant.db_schema();
            let span = info_span!("tenant_step", tenant = %tenant.key(), schema = %schema);
            let _enter = span.enter();

            let default_schema = editor.default_schema_name().to_string();
            let pre = self.hooks.pre_tenant_step_sql(tenant, &default_schema);
            let post = self.hooks.post_tenant_step_sql(tenant, &default_schema);

            let mut scope = SchemaScope::enter(&mut *editor, schema);
            for sql in &pre {
                scope.execute(sql)?;
            }
            let frame = scope.deferred_sql().open_frame();

            operation(&mut TenantStep {
                tenant,
                state,
                editor: &mut *scope,
                default_schema: &default_schema,
            })?;

            for sql in &post {
                scope.execute(sql)?;
            }
            let added = scope.deferred_sql().close_frame(frame, &pre, &post);
            if added > 0 {
                debug!(
                    deferred = added,
                    at = frame.start(),
                    "Bracketed deferred statements"
                );
                summary.deferred += added;
                summary.bracketed += 1;
            }
            drop(scope);

            summary.tenants += 1;
        }

        info!(
            tenants = summary.tenants,
            deferred = summary.deferred,
            "Tenant migration step completed"
        );
        Ok(summary)
    }
}

/// Kind of a tenant migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationKind {
    /// Changes table structure.
    Schema,
    /// Changes table contents.
    Data,
}

/// A migration applied per tenant.
///
/// `forwards`/`backwards` run [`tenant_forwards`](Self::tenant_forwards) or
/// [`tenant_backwards`](Self::tenant_backwards) once per tenant through a
/// [`TenantMigrationRunner`] configured with the migration's own bracketing
/// statements.
pub trait TenantMigration<T: TenantModel, S: ?Sized>: TenantStepSql + Sized {
    /// Error returned by the per-tenant steps.
    type Error: From<MigrationError>;

    /// Migration name.
    fn name(&self) -> &str;

    /// Schema or data migration.
    fn kind(&self) -> MigrationKind {
        MigrationKind::Schema
    }

    /// Apply the migration to one tenant.
    fn tenant_forwards(
        &self,
        step: &mut TenantStep<'_, T, S, dyn SchemaEditor + '_>,
    ) -> Result<(), Self::Error>;

    /// Revert the migration for one tenant.
    fn tenant_backwards(
        &self,
        _step: &mut TenantStep<'_, T, S, dyn SchemaEditor + '_>,
    ) -> Result<(), Self::Error> {
        Err(MigrationError::Irreversible {
            migration: self.name().to_string(),
        }
        .into())
    }

    /// Apply the migration to every tenant.
    fn forwards(
        &self,
        editor: &mut dyn SchemaEditor,
        tenants: &[T],
        state: &S,
    ) -> Result<RunSummary, Self::Error> {
        info!(migration = self.name(), kind = ?self.kind(), "Applying tenant migration");
        TenantMigrationRunner::with_hooks(MigrationHooks(self))
            .run(editor, tenants, state, |step| self.tenant_forwards(step))
    }

    /// Revert the migration for every tenant.
    fn backwards(
        &self,
        editor: &mut dyn SchemaEditor,
        tenants: &[T],
        state: &S,
    ) -> Result<RunSummary, Self::Error> {
        info!(migration = self.name(), kind = ?self.kind(), "Reverting tenant migration");
        TenantMigrationRunner::with_hooks(MigrationHooks(self))
            .run(editor, tenants, state, |step| self.tenant_backwards(step))
    }
}

/// Borrows a migration's bracketing statements for a runner.
struct MigrationHooks<'m, M>(&'m M);

impl<M: TenantStepSql> TenantStepSql for MigrationHooks<'_, M> {
    fn pre_tenant_step_sql<T: TenantModel + ?Sized>(
        &self,
        tenant: &T,
        default_schema: &str,
    ) -> Vec<String> {
        self.0.pre_tenant_step_sql(tenant, default_schema)
    }

    fn post_tenant_step_sql<T: TenantModel + ?Sized>(
        &self,
        tenant: &T,
        default_schema: &str,
    ) -> Vec<String> {
        self.0.post_tenant_step_sql(tenant, default_schema)
    }
}
