//! What a persistable type declares about itself.
//!
//! `#[derive(Model)]` writes the [`Model`] impl. The declaration it returns is
//! raw: capability tags exactly as written plus the accessor functions that move
//! values in and out of the struct. [`crate::metadata::describe`] validates it
//! once and caches the result.

use crate::error::AppError;
use crate::nest::KeyPath;
use crate::session::Session;

/// Capability tag attached to an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Id,
    Attribute,
    Indexed,
    Reference,
    Array(usize),
    List,
    Set,
    Transient,
}

impl Tag {
    pub fn is_role(&self) -> bool {
        !matches!(self, Tag::Indexed)
    }
}

pub type ScalarEncode<M> = fn(&M) -> Option<String>;
pub type ScalarDecode<M> = fn(&mut M, Option<&str>) -> Result<(), String>;
pub type ReferenceEncode<M> = fn(&M) -> Result<Option<u64>, AppError>;
pub type ReferenceLoad<M> = fn(&mut M, &Session, Option<u64>) -> Result<(), AppError>;
pub type ElementsEncode<M> = fn(&M) -> Result<Vec<Option<String>>, AppError>;
pub type ElementsLoad<M> = fn(&mut M, &Session, &KeyPath, Vec<String>) -> Result<(), AppError>;
pub type TargetDelete = fn(&Session, u64) -> Result<bool, AppError>;
/// Saves the held models in place, assigning identifiers to unsaved ones.
pub type TargetSave<M> = fn(&mut M, &Session) -> Result<(), AppError>;

pub enum Access<M> {
    Id,
    Scalar {
        encode: ScalarEncode<M>,
        decode: ScalarDecode<M>,
    },
    Reference {
        target: &'static str,
        encode: ReferenceEncode<M>,
        load: ReferenceLoad<M>,
        save: TargetSave<M>,
        delete: TargetDelete,
    },
    /// `target` is set when elements are models stored by identifier.
    Collection {
        target: Option<&'static str>,
        encode: ElementsEncode<M>,
        load: ElementsLoad<M>,
        save: Option<TargetSave<M>>,
        delete: Option<TargetDelete>,
    },
    Transient,
}

impl<M> Access<M> {
    pub fn label(&self) -> &'static str {
        match self {
            Access::Id => "id",
            Access::Scalar { .. } => "scalar",
            Access::Reference { .. } => "reference",
            Access::Collection { .. } => "collection",
            Access::Transient => "transient",
        }
    }
}

pub struct AttributeDecl<M> {
    pub name: &'static str,
    pub tags: Vec<Tag>,
    pub access: Access<M>,
}

pub struct Declaration<M> {
    pub name: &'static str,
    /// Maintain the `{Type}:all` registry so `get_all` is available.
    pub all_ids: bool,
    pub attributes: Vec<AttributeDecl<M>>,
}

pub trait Model: Default + Send + Sync + 'static {
    fn declaration() -> Declaration<Self>;
    fn id(&self) -> Option<u64>;
    fn set_id(&mut self, id: u64);
}
