//! Per-tenant migration runner tests.

use tenancy_core::migration::{
    DefaultStepSql, MigrationError, MigrationKind, RecordingEditor, SchemaEditor, TenantMigration,
    TenantMigrationRunner, TenantStep, TenantStepSql,
};
use tenancy_core::{Tenant, TenantModel};

fn tenants() -> Vec<Tenant> {
    vec![
        Tenant::new(1, "acme").unwrap(),
        Tenant::new(2, "globex").unwrap(),
        Tenant::new(3, "initech").unwrap(),
    ]
}

fn pre(schema: &str) -> String {
    format!("SET search_path TO {schema}, public")
}

const POST: &str = "SET search_path TO public";

#[test]
fn test_deferred_statements_bracketed_at_frame_start() {
    let mut editor = RecordingEditor::new("public");
    editor.deferred_sql().push("earlier_1");
    editor.deferred_sql().push("earlier_2");

    let summary = TenantMigrationRunner::new()
        .run(&mut editor, &tenants()[..2], &(), |step| {
            let schema = step.tenant.db_schema();
            step.editor.execute(&format!("CREATE TABLE {schema}.shop_order"))?;
            step.editor
                .deferred_sql()
                .push(format!("fk_customer@{schema}"));
            step.editor.deferred_sql().push(format!("fk_tag@{schema}"));
            Ok::<_, MigrationError>(())
        })
        .unwrap();

    assert_eq!(summary.tenants, 2);
    assert_eq!(summary.deferred, 4);
    assert_eq!(summary.bracketed, 2);
    assert_eq!(
        editor.deferred_sql().statements(),
        [
            "earlier_1".to_string(),
            "earlier_2".to_string(),
            pre("tenant_acme"),
            "fk_customer@tenant_acme".to_string(),
            "fk_tag@tenant_acme".to_string(),
            POST.to_string(),
            pre("tenant_globex"),
            "fk_customer@tenant_globex".to_string(),
            "fk_tag@tenant_globex".to_string(),
            POST.to_string(),
        ]
    );
}

#[test]
fn test_tenants_without_deferred_statements_add_no_bracket() {
    let mut editor = RecordingEditor::new("public");

    let summary = TenantMigrationRunner::new()
        .run(&mut editor, &tenants(), &(), |step| {
            if step.tenant.name == "globex" {
                step.editor.deferred_sql().push("fk_globex");
            }
            Ok::<_, MigrationError>(())
        })
        .unwrap();

    assert_eq!(summary.tenants, 3);
    assert_eq!(summary.bracketed, 1);
    assert_eq!(
        editor.deferred_sql().statements(),
        [pre("tenant_globex"), "fk_globex".to_string(), POST.to_string()]
    );
}

#[test]
fn test_deferred_statements_run_inside_tenant_schema() {
    let mut editor = RecordingEditor::new("public");
    TenantMigrationRunner::new()
        .run(&mut editor, &tenants()[..1], &(), |step| {
            step.editor.deferred_sql().push("fk_customer");
            Ok::<_, MigrationError>(())
        })
        .unwrap();

    let before = editor.executed().len();
    assert_eq!(editor.execute_deferred().unwrap(), 3);
    assert_eq!(
        editor.executed_sql()[before..],
        [pre("tenant_acme").as_str(), "fk_customer", POST]
    );
}

#[derive(Debug, PartialEq)]
enum StepError {
    Migration(String),
    Rejected(String),
}

impl From<MigrationError> for StepError {
    fn from(err: MigrationError) -> Self {
        StepError::Migration(err.to_string())
    }
}

#[test]
fn test_failure_restores_schema_and_stops() {
    let mut editor = RecordingEditor::new("public");
    let mut visited = Vec::new();

    let result = TenantMigrationRunner::new().run(&mut editor, &tenants(), &(), |step| {
        visited.push(step.tenant.name.clone());
        step.editor.deferred_sql().push("fk_partial");
        if step.tenant.name == "globex" {
            return Err(StepError::Rejected("duplicate column".to_string()));
        }
        Ok(())
    });

    assert_eq!(result, Err(StepError::Rejected("duplicate column".to_string())));
    assert_eq!(visited, vec!["acme", "globex"]);
    assert_eq!(editor.default_schema_name(), "public");
    assert!(!editor
        .executed_sql()
        .iter()
        .any(|sql| sql.contains("tenant_initech")));
}

#[test]
fn test_panicking_step_restores_schema() {
    let mut editor = RecordingEditor::new("public");
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        TenantMigrationRunner::new().run(
            &mut editor,
            &tenants(),
            &(),
            |_| -> Result<(), MigrationError> { panic!("operation panicked") },
        )
    }));

    assert!(result.is_err());
    assert_eq!(editor.default_schema_name(), "public");
}

#[test]
fn test_non_default_schema_is_fallback() {
    let mut editor = RecordingEditor::new("shared");
    TenantMigrationRunner::new()
        .run(&mut editor, &tenants()[..1], &(), |step| {
            assert_eq!(step.default_schema, "shared");
            Ok::<_, MigrationError>(())
        })
        .unwrap();

    assert_eq!(
        editor.executed_sql(),
        vec!["SET search_path TO tenant_acme, shared", "SET search_path TO shared"]
    );
    assert_eq!(editor.default_schema_name(), "shared");
}

struct SearchPathOnly;

impl TenantStepSql for SearchPathOnly {
    fn post_tenant_step_sql<T: TenantModel + ?Sized>(&self, _: &T, _: &str) -> Vec<String> {
        vec!["RESET search_path".to_string()]
    }
}

#[test]
fn test_custom_bracket_statements() {
    let mut editor = RecordingEditor::new("public");
    TenantMigrationRunner::with_hooks(SearchPathOnly)
        .run(&mut editor, &tenants()[..1], &(), |step| {
            step.editor.deferred_sql().push("fk");
            Ok::<_, MigrationError>(())
        })
        .unwrap();

    assert_eq!(
        editor.deferred_sql().statements(),
        [pre("tenant_acme"), "fk".to_string(), "RESET search_path".to_string()]
    );
    assert_eq!(DefaultStepSql.post_tenant_step_sql(&tenants()[0], "public"), vec![POST]);
}

/// Model state handed to each step: columns to add.
struct AddColumns {
    columns: Vec<&'static str>,
}

struct AddDiscount;

impl TenantStepSql for AddDiscount {}

impl TenantMigration<Tenant, AddColumns> for AddDiscount {
    type Error = MigrationError;

    fn name(&self) -> &str {
        "0002_add_discount"
    }

    fn tenant_forwards(
        &self,
        step: &mut TenantStep<'_, Tenant, AddColumns, dyn SchemaEditor + '_>,
    ) -> Result<(), MigrationError> {
        for column in &step.state.columns {
            step.editor
                .execute(&format!("ALTER TABLE shop_order ADD COLUMN {column}"))?;
        }
        Ok(())
    }
}

struct BackfillTotals;

impl TenantStepSql for BackfillTotals {}

impl TenantMigration<Tenant, ()> for BackfillTotals {
    type Error = MigrationError;

    fn name(&self) -> &str {
        "0003_backfill_totals"
    }

    fn kind(&self) -> MigrationKind {
        MigrationKind::Data
    }

    fn tenant_forwards(
        &self,
        step: &mut TenantStep<'_, Tenant, (), dyn SchemaEditor + '_>,
    ) -> Result<(), MigrationError> {
        step.editor.execute("UPDATE shop_order SET total = 0")
    }

    fn tenant_backwards(
        &self,
        _step: &mut TenantStep<'_, Tenant, (), dyn SchemaEditor + '_>,
    ) -> Result<(), MigrationError> {
        Ok(())
    }
}

#[test]
fn test_migration_forwards_per_tenant() {
    let mut editor = RecordingEditor::new("public");
    let state = AddColumns {
        columns: vec!["discount numeric"],
    };

    let summary = AddDiscount
        .forwards(&mut editor, &tenants()[..2], &state)
        .unwrap();

    assert_eq!(summary.tenants, 2);
    assert_eq!(AddDiscount.kind(), MigrationKind::Schema);
    let executed: Vec<_> = editor
        .executed()
        .iter()
        .map(|e| (e.schema.as_str(), e.sql.as_str()))
        .collect();
    assert_eq!(
        executed[1],
        ("tenant_acme", "ALTER TABLE shop_order ADD COLUMN discount numeric")
    );
    assert_eq!(
        executed[4],
        ("tenant_globex", "ALTER TABLE shop_order ADD COLUMN discount numeric")
    );
}

#[test]
fn test_migration_backwards_irreversible_by_default() {
    let mut editor = RecordingEditor::new("public");
    let state = AddColumns { columns: Vec::new() };

    let err = AddDiscount
        .backwards(&mut editor, &tenants(), &state)
        .unwrap_err();
    assert!(matches!(
        err,
        MigrationError::Irreversible { ref migration } if migration == "0002_add_discount"
    ));
    assert_eq!(editor.default_schema_name(), "public");
}

#[test]
fn test_data_migration_backwards() {
    let mut editor = RecordingEditor::new("public");
    assert_eq!(BackfillTotals.kind(), MigrationKind::Data);

    BackfillTotals.forwards(&mut editor, &tenants(), &()).unwrap();
    let summary = BackfillTotals.backwards(&mut editor, &tenants(), &()).unwrap();
    assert_eq!(summary.tenants, 3);
}
