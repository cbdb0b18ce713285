//! Schema editor boundary.

use super::error::MigrationError;
use super::statement::DeferredLog;
use crate::config::{TenancyConfig, DEFAULT_SCHEMA};
use tracing::debug;

/// The migration framework's connection-bound schema editor.
pub trait SchemaEditor {
    /// Schema unqualified names resolve against.
    fn default_schema_name(&self) -> &str;

    /// Replace the default schema.
    fn set_default_schema_name(&mut self, schema: String);

    /// Statements to run at the end of the migration.
    fn deferred_sql(&mut self) -> &mut DeferredLog;

    /// Execute a statement immediately.
    fn execute(&mut self, sql: &str) -> Result<(), MigrationError>;
}

/// An executed statement, with the default schema active when it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    /// Default schema at execution time.
    pub schema: String,
    /// The statement.
    pub sql: String,
}

/// Schema editor that records statements instead of sending them anywhere.
#[derive(Debug, Clone)]
pub struct RecordingEditor {
    default_schema: String,
    deferred: DeferredLog,
    executed: Vec<Executed>,
    /// Statements containing this text fail to execute.
    fail_on: Option<String>,
}

impl Default for RecordingEditor {
    fn default() -> Self {
        Self::new(DEFAULT_SCHEMA)
    }
}

impl RecordingEditor {
    /// Create an editor whose default schema is `default_schema`.
    pub fn new(default_schema: impl Into<String>) -> Self {
        Self {
            default_schema: default_schema.into(),
            deferred: DeferredLog::new(),
            executed: Vec::new(),
            fail_on: None,
        }
    }

    /// Create an editor using the configured default schema.
    pub fn from_config(config: &TenancyConfig) -> Self {
        Self::new(config.default_schema.clone())
    }

    /// Make every statement containing `pattern` fail.
    pub fn with_failure(mut self, pattern: impl Into<String>) -> Self {
        self.fail_on = Some(pattern.into());
        self
    }

    /// Executed statements, oldest first.
    pub fn executed(&self) -> &[Executed] {
        &self.executed
    }

    /// Executed statement texts, oldest first.
    pub fn executed_sql(&self) -> Vec<&str> {
        self.executed.iter().map(|e| e.sql.as_str()).collect()
    }

    /// Execute every deferred statement in order, draining the log.
    ///
    /// Stops at the first failure; statements after it are dropped.
    pub fn execute_deferred(&mut self) -> Result<usize, MigrationError> {
        let statements = self.deferred.drain();
        let count = statements.len();
        for sql in &statements {
            self.execute(sql)?;
        }
        debug!(statements = count, "Executed deferred statements");
        Ok(count)
    }
}

impl SchemaEditor for RecordingEditor {
    fn default_schema_name(&self) -> &str {
        &self.default_schema
    }

    fn set_default_schema_name(&mut self, schema: String) {
        self.default_schema = schema;
    }

    fn deferred_sql(&mut self) -> &mut DeferredLog {
        &mut self.deferred
    }

    fn execute(&mut self, sql: &str) -> Result<(), MigrationError> {
        if let Some(pattern) = &self.fail_on {
            if sql.contains(pattern.as_str()) {
                return Err(MigrationError::Execution {
                    statement: sql.to_string(),
                    reason: format!("statement matches failure pattern {pattern:?}"),
                });
            }
        }
        self.executed.push(Executed {
            schema: self.default_schema.clone(),
            sql: sql.to_string(),
        });
        Ok(())
    }
}
