//! Tenant-scoped type cache.
//!
//! [`TenantModels`] is the memoized factory `(template, tenant) -> type`.
//! Concrete types are looked up by natural key in the persistent
//! [`TypeRegistry`], and held live in process once built.

use crate::catalog::{EntityTemplate, TemplateRegistry};
use crate::config::TenancyConfig;
use crate::error::Error;
use crate::materialize::{builder, ConcreteEntity, MaterializePath, NaturalKey};
use crate::registry::{SledTypeRegistry, TypeRegistry};
use crate::schema::{db_schema_table, Vendor};
use crate::tenant::TenantModel;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tenant-scoped type cache.
pub struct TenantModels {
    templates: TemplateRegistry,
    registry: Box<dyn TypeRegistry>,
    /// Live types, keyed by natural key.
    live: DashMap<NaturalKey, Arc<ConcreteEntity>>,
    vendor: Vendor,
}

impl TenantModels {
    /// Create a type cache over validated templates.
    ///
    /// Fails if any template references a template that was never defined.
    pub fn new(
        templates: TemplateRegistry,
        registry: impl TypeRegistry + 'static,
        vendor: Vendor,
    ) -> Result<Self, Error> {
        templates.validate()?;
        Ok(Self {
            templates,
            registry: Box::new(registry),
            live: DashMap::new(),
            vendor,
        })
    }

    /// Create a type cache backed by the sled registry described by `config`.
    pub fn open(templates: TemplateRegistry, config: &TenancyConfig) -> Result<Self, Error> {
        let registry = SledTypeRegistry::open(&config.registry)?;
        info!(
            vendor = ?config.vendor,
            templates = templates.len(),
            records = registry.len(),
            "Opened tenant models"
        );
        Self::new(templates, registry, config.vendor)
    }

    /// Template registry.
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Persistent type registry.
    pub fn registry(&self) -> &dyn TypeRegistry {
        self.registry.as_ref()
    }

    /// Engine family used for table naming.
    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// Natural key of `template_key` materialized for `tenant`.
    pub fn natural_key<T: TenantModel + ?Sized>(
        &self,
        tenant: &T,
        template_key: &str,
    ) -> Result<NaturalKey, Error> {
        let template = self.templates.resolve(template_key)?;
        Ok(NaturalKey::for_tenant(tenant, template))
    }

    /// The tenant's concrete type installed under `related_name`
    /// (`tenant.<related_name>`).
    pub fn get<T: TenantModel + ?Sized>(
        &self,
        tenant: &T,
        related_name: &str,
    ) -> Result<Arc<ConcreteEntity>, Error> {
        self.resolve_related(tenant, related_name, &mut MaterializePath::default())
    }

    /// The tenant's concrete type for the template `template_key`.
    pub fn get_template<T: TenantModel + ?Sized>(
        &self,
        tenant: &T,
        template_key: &str,
    ) -> Result<Arc<ConcreteEntity>, Error> {
        let template = self.templates.resolve(template_key)?;
        if template.default_related_name().is_none() {
            return Err(Error::AbstractTemplate {
                key: template_key.to_string(),
            });
        }
        self.materialize(tenant, template, &mut MaterializePath::default())
    }

    /// Whether a live type is held for `key`.
    pub fn is_live(&self, key: &NaturalKey) -> bool {
        self.live.contains_key(key)
    }

    /// Number of live types.
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Tenant-bound view, so lookups read as `models.tenant(&acme).get("orders")`.
    pub fn tenant<'a, T: TenantModel + ?Sized>(&'a self, tenant: &'a T) -> TenantView<'a, T> {
        TenantView {
            models: self,
            tenant,
        }
    }

    pub(crate) fn resolve_related<T: TenantModel + ?Sized>(
        &self,
        tenant: &T,
        related_name: &str,
        path: &mut MaterializePath,
    ) -> Result<Arc<ConcreteEntity>, Error> {
        let key = self
            .templates
            .accessor(related_name)
            .ok_or_else(|| Error::UnknownRelation {
                name: related_name.to_string(),
            })?;
        let template = self.templates.resolve(key)?;
        self.materialize(tenant, template, path)
    }

    fn materialize<T: TenantModel + ?Sized>(
        &self,
        tenant: &T,
        template: &EntityTemplate,
        path: &mut MaterializePath,
    ) -> Result<Arc<ConcreteEntity>, Error> {
        let key = NaturalKey::for_tenant(tenant, template);
        let record = self.registry.get_by_natural_key(&key)?;

        if record.is_some() {
            if let Some(entity) = self.live.get(&key) {
                debug!(natural_key = %key, "Tenant type cache hit");
                return Ok(Arc::clone(entity.value()));
            }
        }

        let db_table = db_schema_table(tenant, &template.db_table(), self.vendor);
        path.enter(&template.key())?;
        let built = builder::build(self, tenant, template, key.clone(), db_table, path);
        path.leave();

        let entity = match record {
            Some(record) => {
                let entity = built.map_err(|e| inconsistency(&key, e.to_string()))?;
                if !record.matches(&entity) {
                    warn!(
                        natural_key = %key,
                        recorded = %hex::encode(record.fingerprint),
                        rebuilt = %entity.fingerprint_hex(),
                        "Rebuilt tenant type does not match its registry record"
                    );
                    return Err(inconsistency(&key, "rebuilt shape differs from recorded shape"));
                }
                info!(natural_key = %key, db_table = %entity.db_table(), "Rebuilt tenant type");
                entity
            }
            None => {
                let entity = built?;
                self.registry.create_for_type(&entity)?;
                info!(
                    natural_key = %key,
                    db_table = %entity.db_table(),
                    fields = entity.fields().len(),
                    relations = entity.relations().len(),
                    "Materialized tenant type"
                );
                entity
            }
        };

        let entity = Arc::new(entity);
        self.live.insert(key, Arc::clone(&entity));
        Ok(entity)
    }
}

fn inconsistency(key: &NaturalKey, reason: impl Into<String>) -> Error {
    Error::RegistryInconsistency {
        app_label: key.app_label.clone(),
        model: key.model.clone(),
        reason: reason.into(),
    }
}

/// A [`TenantModels`] bound to one tenant.
pub struct TenantView<'a, T: ?Sized> {
    models: &'a TenantModels,
    tenant: &'a T,
}

impl<T: TenantModel + ?Sized> TenantView<'_, T> {
    /// The tenant's concrete type installed under `related_name`.
    pub fn get(&self, related_name: &str) -> Result<Arc<ConcreteEntity>, Error> {
        self.models.get(self.tenant, related_name)
    }

    /// The tenant's schema.
    pub fn db_schema(&self) -> String {
        self.tenant.db_schema()
    }
}
