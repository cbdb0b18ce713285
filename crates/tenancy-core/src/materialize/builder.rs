//! Concrete type construction.

use super::concrete::{ConcreteBase, ConcreteEntity, ConcreteParts, NaturalKey, TenantRelation};
use super::remap::RelationRemapper;
use super::MaterializePath;
use crate::catalog::{BaseRef, EntityTemplate, FieldDef};
use crate::error::Error;
use crate::models::TenantModels;
use crate::tenant::TenantModel;

/// Build `template`'s concrete type for `tenant`, stored in `db_table`.
///
/// Ancestors contribute first, in declaration order, then the template's own
/// fields; a later field replaces an earlier one with the same name.
pub(crate) fn build<T: TenantModel + ?Sized>(
    models: &TenantModels,
    tenant: &T,
    template: &EntityTemplate,
    natural_key: NaturalKey,
    db_table: String,
    path: &mut MaterializePath,
) -> Result<ConcreteEntity, Error> {
    let remapper = RelationRemapper::new(models, tenant, template);
    let mut shape = Shape::default();
    let mut bases = vec![ConcreteBase::Template(template.key())];

    for base in &template.bases {
        match base {
            BaseRef::External(name) => bases.push(ConcreteBase::External(name.clone())),
            BaseRef::Template(key) => {
                let meta = models.templates().meta(key)?;
                match &meta.related_name {
                    Some(related_name) => {
                        shape.relations(remapper.remap_all(key, &meta.related_fields, path)?);
                        let parent = models.resolve_related(tenant, related_name, path)?;
                        bases.push(ConcreteBase::Tenant(parent));
                    }
                    None => {
                        let mut lineage = vec![template.key()];
                        inherit_abstract(models, &remapper, key, &mut shape, &mut lineage, path)?;
                        bases.push(ConcreteBase::Template(key.clone()));
                    }
                }
            }
        }
    }

    shape.fields(template.fields.iter().cloned());
    shape.relations(remapper.remap_all(&template.key(), &template.relations, path)?);

    Ok(ConcreteEntity::from_parts(ConcreteParts {
        natural_key,
        template: template.key(),
        tenant_key: tenant.key(),
        db_table,
        fields: shape.fields,
        relations: shape.relations,
        bases,
    }))
}

/// Structurally inherit the fields of a declared-abstract ancestor and of its
/// own abstract ancestors.
fn inherit_abstract<T: TenantModel + ?Sized>(
    models: &TenantModels,
    remapper: &RelationRemapper<'_, T>,
    key: &str,
    shape: &mut Shape,
    lineage: &mut Vec<String>,
    path: &mut MaterializePath,
) -> Result<(), Error> {
    if lineage.iter().any(|k| k == key) {
        let mut cycle = lineage.clone();
        cycle.push(key.to_string());
        return Err(Error::CircularRelation { path: cycle });
    }
    lineage.push(key.to_string());

    let ancestor = models.templates().resolve(key)?;
    for base in ancestor.template_bases() {
        if models.templates().meta(base)?.related_name.is_none() {
            inherit_abstract(models, remapper, base, shape, lineage, path)?;
        }
    }

    shape.fields(ancestor.fields.iter().cloned());
    shape.relations(remapper.remap_all(key, &ancestor.relations, path)?);

    lineage.pop();
    Ok(())
}

/// Field set under construction.
#[derive(Default)]
struct Shape {
    fields: Vec<FieldDef>,
    relations: Vec<TenantRelation>,
}

impl Shape {
    fn fields(&mut self, fields: impl IntoIterator<Item = FieldDef>) {
        for field in fields {
            self.relations.retain(|r| r.name != field.name);
            match self.fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = field,
                None => self.fields.push(field),
            }
        }
    }

    fn relations(&mut self, relations: impl IntoIterator<Item = TenantRelation>) {
        for relation in relations {
            self.fields.retain(|f| f.name != relation.name);
            match self.relations.iter_mut().find(|r| r.name == relation.name) {
                Some(existing) => *existing = relation,
                None => self.relations.push(relation),
            }
        }
    }
}
