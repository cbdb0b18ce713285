//! Relational field definitions.

use std::fmt;

/// Cardinality of a relational field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// Foreign key: many rows of the owner point at one target row.
    ManyToOne,
    /// Unique foreign key.
    OneToOne,
    /// Many-to-many, backed by a join table.
    ManyToMany,
}

/// Behavior when a referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeleteBehavior {
    /// Delete related rows.
    Cascade,
    /// Prevent deletion if related rows exist.
    Restrict,
    /// Set foreign key to null.
    SetNull,
}

/// What a relational field points at, as declared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeclaredTarget {
    /// Another template, by key (`namespace.TypeName`).
    ///
    /// The key may name a template defined later; it is resolved when the
    /// registry is validated.
    Template(String),
    /// A table shared by all tenants. Never remapped.
    Shared {
        /// Unqualified table name, resolved through the search path fallback.
        table: String,
    },
}

/// A relational field declared on a template.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationField {
    /// Field name.
    pub name: String,
    /// Declared target.
    pub target: DeclaredTarget,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Explicit join template for many-to-many relations.
    pub through: Option<String>,
    /// Explicit join table name for many-to-many relations.
    pub db_table: Option<String>,
    /// Delete behavior.
    pub on_delete: DeleteBehavior,
}

impl RelationField {
    fn new(name: impl Into<String>, target: DeclaredTarget, cardinality: Cardinality) -> Self {
        let on_delete = match cardinality {
            Cardinality::ManyToMany => DeleteBehavior::Cascade,
            _ => DeleteBehavior::Restrict,
        };
        Self {
            name: name.into(),
            target,
            cardinality,
            through: None,
            db_table: None,
            on_delete,
        }
    }

    /// Foreign key to another template.
    pub fn foreign_key(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(name, DeclaredTarget::Template(template.into()), Cardinality::ManyToOne)
    }

    /// Unique foreign key to another template.
    pub fn one_to_one(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(name, DeclaredTarget::Template(template.into()), Cardinality::OneToOne)
    }

    /// Many-to-many relation to another template.
    pub fn many_to_many(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::new(name, DeclaredTarget::Template(template.into()), Cardinality::ManyToMany)
    }

    /// Foreign key to a table shared by all tenants.
    pub fn shared(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self::new(
            name,
            DeclaredTarget::Shared {
                table: table.into(),
            },
            Cardinality::ManyToOne,
        )
    }

    /// Use an explicit join template.
    pub fn with_through(mut self, through: impl Into<String>) -> Self {
        self.through = Some(through.into());
        self
    }

    /// Use an explicit join table name.
    pub fn with_db_table(mut self, db_table: impl Into<String>) -> Self {
        self.db_table = Some(db_table.into());
        self
    }

    /// Set delete behavior.
    pub fn with_on_delete(mut self, on_delete: DeleteBehavior) -> Self {
        self.on_delete = on_delete;
        self
    }

    /// Key of the target template, if the target is a template.
    pub fn target_template(&self) -> Option<&str> {
        match &self.target {
            DeclaredTarget::Template(key) => Some(key),
            DeclaredTarget::Shared { .. } => None,
        }
    }

    /// Check if this is a many-to-many relation.
    pub fn is_many_to_many(&self) -> bool {
        self.cardinality == Cardinality::ManyToMany
    }

    /// Join table name the engine derives for this field when declared on a
    /// table named `owner_table`.
    pub fn default_m2m_db_table(&self, owner_table: &str) -> String {
        match &self.db_table {
            Some(table) => table.clone(),
            None => format!("{owner_table}_{}", self.name),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::ManyToOne => write!(f, "many_to_one"),
            Cardinality::OneToOne => write!(f, "one_to_one"),
            Cardinality::ManyToMany => write!(f, "many_to_many"),
        }
    }
}

impl fmt::Display for DeleteBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeleteBehavior::Cascade => write!(f, "cascade"),
            DeleteBehavior::Restrict => write!(f, "restrict"),
            DeleteBehavior::SetNull => write!(f, "set_null"),
        }
    }
}
