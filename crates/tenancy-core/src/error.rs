//! Core error types.

use thiserror::Error;

/// Errors raised while defining templates and materializing tenant types.
#[derive(Debug, Error)]
pub enum Error {
    /// A relation, ancestor or `through` reference names a template that was
    /// never registered.
    #[error("unknown template: {key}")]
    UnknownTemplate {
        /// The unresolved template key (`namespace.TypeName`).
        key: String,
    },

    /// A relation targets a template that has no relation name (declared abstract).
    #[error("{template}.{field} targets {target}, which has no related name")]
    MissingRelatedName {
        /// Template owning the relation.
        template: String,
        /// Relation field name.
        field: String,
        /// The abstract target template.
        target: String,
    },

    /// A registry record exists but the live type could not be rebuilt from it.
    #[error("registry record {app_label}.{model} is inconsistent: {reason}")]
    RegistryInconsistency {
        /// App label of the natural key.
        app_label: String,
        /// Model name of the natural key.
        model: String,
        /// What went wrong.
        reason: String,
    },

    /// No template is installed under this relation name.
    #[error("no tenant model is installed under relation name {name:?}")]
    UnknownRelation {
        /// The requested relation name.
        name: String,
    },

    /// A template is abstract and has no tenant type of its own.
    #[error("template {key} is abstract and has no tenant type")]
    AbstractTemplate {
        /// The abstract template key.
        key: String,
    },

    /// Registered metadata lists different relations than the template targets.
    #[error("related fields registered for {template} do not match its template relations")]
    RelatedFieldsMismatch {
        /// Template being registered.
        template: String,
    },

    /// Two templates claim the same relation name on the tenant model.
    #[error("related name {name:?} is used by both {existing} and {conflicting}")]
    DuplicateRelatedName {
        /// The contested relation name.
        name: String,
        /// Template that installed it first.
        existing: String,
        /// Template that tried to install it again.
        conflicting: String,
    },

    /// Materializing a template requires materializing itself through other templates.
    #[error("circular relation while materializing: {}", path.join(" -> "))]
    CircularRelation {
        /// Template keys from the outermost request to the repeated one.
        path: Vec<String>,
    },

    /// The tenant name can't be used inside a schema identifier.
    #[error("invalid tenant name {name:?}: {reason}")]
    InvalidTenantName {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for [`Error::UnknownTemplate`].
    pub(crate) fn unknown_template(key: impl Into<String>) -> Self {
        Error::UnknownTemplate { key: key.into() }
    }
}
