//! Template registry.
//!
//! Templates are defined first (phase 1), in any order, possibly referencing
//! each other by key before the target exists. [`TemplateRegistry::validate`]
//! then resolves every reference (phase 2); a registry is only handed to
//! [`crate::TenantModels`] once it validates.

use super::relation::RelationField;
use super::template::{EntityTemplate, TemplateKind, TemplateMeta};
use crate::error::Error;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone)]
struct Registered {
    template: EntityTemplate,
    meta: TemplateMeta,
}

/// Insertion-ordered registry of entity templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    /// Templates in definition order.
    entries: Vec<Registered>,
    /// Template key -> position in `entries`.
    index: HashMap<String, usize>,
    /// Related name -> template key.
    accessors: HashMap<String, String>,
}

impl TemplateRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a template.
    ///
    /// Records its metadata and, for scoped templates, installs the accessor
    /// under its related name. Defining the same key again replaces the
    /// previous definition in place.
    pub fn define(&mut self, template: EntityTemplate) -> Result<&TemplateMeta, Error> {
        let related_name = template.default_related_name();
        let related_fields = template_relations(&template);
        self.register(template, related_name, related_fields)
    }

    /// Insert a template with precomputed metadata.
    ///
    /// `related_fields` must be exactly the template's relations that target
    /// other templates, in declaration order.
    pub fn register(
        &mut self,
        template: EntityTemplate,
        related_name: Option<String>,
        related_fields: Vec<RelationField>,
    ) -> Result<&TemplateMeta, Error> {
        let key = template.key();

        if related_fields != template_relations(&template) {
            return Err(Error::RelatedFieldsMismatch { template: key });
        }

        if let Some(name) = &related_name {
            if let Some(existing) = self.accessors.get(name) {
                if *existing != key {
                    return Err(Error::DuplicateRelatedName {
                        name: name.clone(),
                        existing: existing.clone(),
                        conflicting: key,
                    });
                }
            }
        }

        let entry = Registered {
            template,
            meta: TemplateMeta {
                related_name: related_name.clone(),
                related_fields,
            },
        };

        let position = match self.index.get(&key) {
            Some(&position) => {
                if let Some(previous) = &self.entries[position].meta.related_name {
                    self.accessors.remove(previous);
                }
                self.entries[position] = entry;
                position
            }
            None => {
                self.entries.push(entry);
                self.index.insert(key.clone(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };

        if let Some(name) = related_name {
            debug!(template = %key, related_name = %name, "Installed tenant accessor");
            self.accessors.insert(name, key);
        }

        Ok(&self.entries[position].meta)
    }

    /// Resolve every template reference (relations, join templates, ancestors).
    pub fn validate(&self) -> Result<(), Error> {
        for entry in &self.entries {
            let template = &entry.template;
            for target in template.relations.iter().filter_map(|r| r.target_template()) {
                self.resolve(target)?;
            }
            for through in template.relations.iter().filter_map(|r| r.through.as_deref()) {
                self.resolve(through)?;
            }
            for base in template.template_bases() {
                self.resolve(base)?;
            }
        }
        Ok(())
    }

    /// Look up a template by key.
    pub fn resolve(&self, key: &str) -> Result<&EntityTemplate, Error> {
        self.entry(key).map(|e| &e.template)
    }

    /// Look up a template's metadata by key.
    pub fn meta(&self, key: &str) -> Result<&TemplateMeta, Error> {
        self.entry(key).map(|e| &e.meta)
    }

    /// Template key installed under a related name.
    pub fn accessor(&self, related_name: &str) -> Option<&str> {
        self.accessors.get(related_name).map(String::as_str)
    }

    /// Check if a template is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Template keys in definition order.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|e| e.template.key())
    }

    /// Templates and their metadata in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityTemplate, &TemplateMeta)> {
        self.entries.iter().map(|e| (&e.template, &e.meta))
    }

    /// Scoped templates in definition order.
    pub fn scoped(&self) -> impl Iterator<Item = &EntityTemplate> {
        self.entries
            .iter()
            .map(|e| &e.template)
            .filter(|t| t.kind == TemplateKind::Scoped)
    }

    /// Number of registered templates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if no templates are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, key: &str) -> Result<&Registered, Error> {
        self.index
            .get(key)
            .map(|&position| &self.entries[position])
            .ok_or_else(|| Error::unknown_template(key))
    }
}

/// Relations of `template` that target other templates.
fn template_relations(template: &EntityTemplate) -> Vec<RelationField> {
    template
        .relations
        .iter()
        .filter(|r| r.target_template().is_some())
        .cloned()
        .collect()
}
