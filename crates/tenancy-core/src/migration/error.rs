//! Migration-specific error types.

use thiserror::Error;

/// Errors raised by the tenant migration runner and schema editors.
///
/// Errors returned by a migration operation itself never pass through this
/// type; the runner hands them back to the caller unchanged.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The schema editor failed to execute a statement.
    #[error("failed to execute {statement:?}: {reason}")]
    Execution {
        /// The statement that failed.
        statement: String,
        /// Why it failed.
        reason: String,
    },

    /// The migration has no backwards step.
    #[error("migration {migration} is irreversible")]
    Irreversible {
        /// Name of the migration.
        migration: String,
    },

    /// Template or registry error.
    #[error(transparent)]
    Core(#[from] crate::error::Error),
}
