//! Tenant type materialization.
//!
//! Builds the concrete, schema-bound version of a template for one tenant.
//! Relations into other templates are bound to that tenant's versions of
//! them, which materializes them in turn.

pub(crate) mod builder;
mod concrete;
pub(crate) mod remap;

pub use concrete::{
    app_label, ConcreteBase, ConcreteEntity, NaturalKey, RelationTarget, TenantRelation,
    FINGERPRINT_SIZE,
};

use crate::error::Error;

/// Templates currently being built for one tenant, outermost first.
#[derive(Debug, Default)]
pub(crate) struct MaterializePath {
    keys: Vec<String>,
}

impl MaterializePath {
    /// Enter `key`, failing if it is already being built.
    pub(crate) fn enter(&mut self, key: &str) -> Result<(), Error> {
        if self.keys.iter().any(|k| k == key) {
            let mut path = self.keys.clone();
            path.push(key.to_string());
            return Err(Error::CircularRelation { path });
        }
        self.keys.push(key.to_string());
        Ok(())
    }

    /// Leave the innermost template.
    pub(crate) fn leave(&mut self) {
        self.keys.pop();
    }
}
