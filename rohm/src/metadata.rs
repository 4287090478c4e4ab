use crate::cache::TypeCache;
use crate::error::AppError;
use crate::model::*;
use crate::nest::SEPARATOR;
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::sync::Arc;

static METADATA: Lazy<TypeCache> = Lazy::new(TypeCache::default);

pub struct ScalarAttr<M> {
    pub name: &'static str,
    pub indexed: bool,
    pub encode: ScalarEncode<M>,
    pub decode: ScalarDecode<M>,
}

pub struct ReferenceAttr<M> {
    pub name: &'static str,
    pub target: &'static str,
    pub indexed: bool,
    pub encode: ReferenceEncode<M>,
    pub load: ReferenceLoad<M>,
    pub save: TargetSave<M>,
    pub delete: TargetDelete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Array(usize),
    List,
    Set,
}

pub struct CollectionAttr<M> {
    pub name: &'static str,
    pub shape: Shape,
    pub target: Option<&'static str>,
    pub encode: ElementsEncode<M>,
    pub load: ElementsLoad<M>,
    pub save: Option<TargetSave<M>>,
    pub delete: Option<TargetDelete>,
}

/// Validated, immutable description of a model type.
pub struct ModelInfo<M> {
    pub name: &'static str,
    pub id_attribute: &'static str,
    pub scalars: Vec<ScalarAttr<M>>,
    pub references: Vec<ReferenceAttr<M>>,
    pub collections: Vec<CollectionAttr<M>>,
    pub transients: Vec<&'static str>,
    pub all_ids: bool,
}

impl<M> ModelInfo<M> {
    pub fn is_indexed(&self, attribute: &str) -> bool {
        self.indexed_attributes().any(|name| name == attribute)
    }

    pub fn indexed_attributes(&self) -> impl Iterator<Item = &'static str> + '_ {
        let scalars = self.scalars.iter().filter(|a| a.indexed).map(|a| a.name);
        let references = self.references.iter().filter(|a| a.indexed).map(|a| a.name);
        scalars.chain(references)
    }

    /// Attributes stored under `{Type}:{id}:{attribute}`.
    pub fn sub_records(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.references.iter().map(|a| a.name).chain(self.collections.iter().map(|a| a.name))
    }
}

/// Registration submitted by `#[derive(Model)]` for eager validation.
pub struct Registration {
    pub name: &'static str,
    pub validate: fn() -> Result<(), AppError>,
}

inventory::collect!(Registration);

/// Validates every model linked into the binary, returns how many were checked.
pub fn validate_registered() -> Result<usize, AppError> {
    let mut count = 0;
    for registration in inventory::iter::<Registration> {
        if let Err(e) = (registration.validate)() {
            crate::error!("Model {} failed validation: {}", registration.name, e);
            return Err(e);
        }
        count += 1;
    }
    Ok(count)
}

/// Registered by `#[derive(Model)]`, surfaces structural errors of `M` without touching a store.
pub fn validate<M: Model>() -> Result<(), AppError> {
    describe::<M>().map(|_| ())
}

/// Metadata of `M`, validated on first use and served from the cache afterwards.
pub fn describe<M: Model>() -> Result<Arc<ModelInfo<M>>, AppError> {
    METADATA.get_or_try_init::<M, ModelInfo<M>, AppError>(|| build(M::declaration()))
}

fn check_name(owner: &str, name: &str) -> Result<(), AppError> {
    if name.is_empty() || name.contains(SEPARATOR) {
        return Err(AppError::structural(format!("{} has an invalid name '{}': it must be non-empty and free of '{}'", owner, name, SEPARATOR)));
    }
    Ok(())
}

fn role_of<M>(model: &str, attribute: &AttributeDecl<M>) -> Result<(Tag, bool), AppError> {
    let roles: Vec<Tag> = attribute.tags.iter().copied().filter(Tag::is_role).collect();
    let indexed_count = attribute.tags.iter().filter(|t| **t == Tag::Indexed).count();
    let role = match roles.as_slice() {
        [role] => *role,
        [] => return Err(AppError::structural(format!("{}.{} declares no role, expected one of id/attribute/reference/array/list/set/transient", model, attribute.name))),
        many => return Err(AppError::structural(format!("{}.{} declares conflicting roles {:?}", model, attribute.name, many))),
    };
    if indexed_count > 1 {
        return Err(AppError::structural(format!("{}.{} is tagged indexed more than once", model, attribute.name)));
    }
    let indexed = indexed_count == 1;
    if indexed && !matches!(role, Tag::Attribute | Tag::Reference) {
        return Err(AppError::structural(format!("{}.{} cannot be indexed as {:?}", model, attribute.name, role)));
    }
    if let Tag::Array(0) = role {
        return Err(AppError::structural(format!("{}.{} declares an array of length 0", model, attribute.name)));
    }
    Ok((role, indexed))
}

fn mismatch<M>(model: &str, name: &str, role: Tag, access: &Access<M>) -> AppError {
    AppError::structural(format!("{}.{} is tagged {:?} but maps a {} value", model, name, role, access.label()))
}

pub fn build<M>(declaration: Declaration<M>) -> Result<ModelInfo<M>, AppError> {
    let model = declaration.name;
    check_name("model", model)?;

    let mut seen = HashSet::new();
    let mut id_attribute = None;
    let mut scalars = Vec::new();
    let mut references = Vec::new();
    let mut collections = Vec::new();
    let mut transients = Vec::new();

    for attribute in declaration.attributes {
        check_name(model, attribute.name)?;
        if !seen.insert(attribute.name) {
            return Err(AppError::structural(format!("{} declares attribute '{}' twice", model, attribute.name)));
        }
        let (role, indexed) = role_of(model, &attribute)?;
        let name = attribute.name;
        match (role, attribute.access) {
            (Tag::Id, Access::Id) => {
                if let Some(previous) = id_attribute.replace(name) {
                    return Err(AppError::structural(format!("{} declares multiple id attributes: '{}' and '{}'", model, previous, name)));
                }
            }
            (Tag::Attribute, Access::Scalar { encode, decode }) => {
                scalars.push(ScalarAttr { name, indexed, encode, decode });
            }
            (Tag::Reference, Access::Reference { target, encode, load, save, delete }) => {
                references.push(ReferenceAttr { name, target, indexed, encode, load, save, delete });
            }
            (Tag::Array(len), Access::Collection { target, encode, load, save, delete }) => {
                collections.push(CollectionAttr { name, shape: Shape::Array(len), target, encode, load, save, delete });
            }
            (Tag::List, Access::Collection { target, encode, load, save, delete }) => {
                collections.push(CollectionAttr { name, shape: Shape::List, target, encode, load, save, delete });
            }
            (Tag::Set, Access::Collection { target, encode, load, save, delete }) => {
                collections.push(CollectionAttr { name, shape: Shape::Set, target, encode, load, save, delete });
            }
            (Tag::Transient, Access::Transient) => transients.push(name),
            (role, access) => return Err(mismatch(model, name, role, &access)),
        }
    }

    let id_attribute = id_attribute.ok_or_else(|| AppError::structural(format!("{} declares no id attribute, exactly one is required", model)))?;

    Ok(ModelInfo {
        name: model,
        id_attribute,
        scalars,
        references,
        collections,
        transients,
        all_ids: declaration.all_ids,
    })
}
